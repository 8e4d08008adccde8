//! Summary reduction
//!
//! All requested summaries are computed by one `$group` on `_id: null`.
//! Each accumulator is named after its type and selector (`_sum_amount`),
//! except count which is shared (`_count`).

use serde_json::{json, Map, Value};

use super::single;
use crate::query::{SummaryInfo, SummaryType};

const COUNT_ACCUMULATOR: &str = "_count";

/// Accumulator field of one summary in the reduction result, `None` for
/// unsupported summary types
pub fn accumulator_name(summary: &SummaryInfo) -> Option<String> {
    let prefix = match summary.summary_type {
        SummaryType::Sum => "_sum_",
        SummaryType::Avg => "_avg_",
        SummaryType::Min => "_min_",
        SummaryType::Max => "_max_",
        SummaryType::Count => return Some(COUNT_ACCUMULATOR.to_string()),
        SummaryType::Other => return None,
    };
    Some(format!("{}{}", prefix, summary.selector))
}

fn accumulator(summary: &SummaryInfo) -> Option<Value> {
    let field_ref = format!("${}", summary.selector);
    let value = match summary.summary_type {
        SummaryType::Sum => json!({ "$sum": field_ref }),
        SummaryType::Avg => json!({ "$avg": field_ref }),
        SummaryType::Min => json!({ "$min": field_ref }),
        SummaryType::Max => json!({ "$max": field_ref }),
        SummaryType::Count => json!({ "$sum": 1 }),
        SummaryType::Other => return None,
    };
    Some(value)
}

/// The reduction stage; empty when no summaries are requested
pub fn summary_stages(summaries: &[SummaryInfo]) -> Vec<Value> {
    if summaries.is_empty() {
        return Vec::new();
    }

    let mut group = Map::new();
    group.insert("_id".to_string(), Value::Null);
    for summary in summaries {
        if let (Some(name), Some(value)) = (accumulator_name(summary), accumulator(summary)) {
            group.insert(name, value);
        }
    }
    vec![single("$group", Value::Object(group))]
}

/// Extracts the requested summaries, in request order, from the reduction
/// result. Missing accumulators (or a missing result) give null; unsupported
/// summary types are skipped.
pub fn summary_values(summaries: &[SummaryInfo], result: Option<&Value>) -> Vec<Value> {
    summaries
        .iter()
        .filter_map(accumulator_name)
        .map(|name| {
            result
                .and_then(|doc| doc.get(&name))
                .cloned()
                .unwrap_or(Value::Null)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(selector: &str, summary_type: SummaryType) -> SummaryInfo {
        SummaryInfo {
            selector: selector.to_string(),
            summary_type,
        }
    }

    #[test]
    fn test_summary_stages() {
        let summaries = vec![
            summary("amount", SummaryType::Sum),
            summary("amount", SummaryType::Avg),
            summary("price", SummaryType::Min),
            summary("price", SummaryType::Max),
            summary("", SummaryType::Count),
        ];
        let stages = summary_stages(&summaries);
        assert_eq!(
            serde_json::to_string(&stages).unwrap(),
            concat!(
                r#"[{"$group":{"_id":null,"_sum_amount":{"$sum":"$amount"},"#,
                r#""_avg_amount":{"$avg":"$amount"},"_min_price":{"$min":"$price"},"#,
                r#""_max_price":{"$max":"$price"},"_count":{"$sum":1}}}]"#
            )
        );
    }

    #[test]
    fn test_no_summaries() {
        assert!(summary_stages(&[]).is_empty());
    }

    #[test]
    fn test_unknown_type_ignored() {
        let summaries = vec![summary("amount", SummaryType::Other)];
        assert_eq!(summary_stages(&summaries), vec![json!({"$group": {"_id": null}})]);
        assert!(summary_values(&summaries, Some(&json!({"_id": null}))).is_empty());
    }

    #[test]
    fn test_summary_values_in_request_order() {
        let summaries = vec![
            summary("amount", SummaryType::Max),
            summary("x", SummaryType::Count),
            summary("amount", SummaryType::Sum),
        ];
        let result = json!({"_id": null, "_sum_amount": 30, "_max_amount": 12, "_count": 4});
        assert_eq!(
            summary_values(&summaries, Some(&result)),
            vec![json!(12), json!(4), json!(30)]
        );
    }

    #[test]
    fn test_summary_values_without_result() {
        let summaries = vec![summary("amount", SummaryType::Sum)];
        assert_eq!(summary_values(&summaries, None), vec![Value::Null]);
    }
}
