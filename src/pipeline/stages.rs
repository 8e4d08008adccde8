//! Stage builders
//!
//! Pure functions, each returning a short sequence of aggregation stages.
//! Callers concatenate sequences; an empty sequence means "nothing to do".

use serde_json::{json, Map, Value};

use super::interval::{date_part_stages, DateInterval, GroupInterval, QUARTER_SCRATCH_FIELD};
use super::single;
use crate::filter::{self, CompiledFilter, DatePartField};
use crate::query::{SearchExpr, SortInfo};

/// Item projection used when no fields are selected
pub const CURRENT_DOCUMENT: &str = "$$CURRENT";

const GROUP_KEY_PREFIX: &str = "___group_key_";

/// Name of the synthetic field holding the group key of `level`
pub fn group_key_field(level: usize) -> String {
    format!("{}{}", GROUP_KEY_PREFIX, level)
}

/// Stages computing the group key of one level
#[derive(Debug, Clone, PartialEq)]
pub struct GroupKeyStages {
    pub stages: Vec<Value>,
    pub level: usize,
}

impl GroupKeyStages {
    pub fn key_field(&self) -> String {
        group_key_field(self.level)
    }
}

/// Computes `___group_key_<level>` from `selector`.
///
/// Numeric intervals round down to a multiple of the width; date intervals
/// extract a calendar part of the timezone-shifted date. Anything else groups
/// by the exact value.
pub fn group_key_stages(
    selector: &str,
    interval: Option<&GroupInterval>,
    level: usize,
    timezone_offset: i64,
) -> GroupKeyStages {
    let key = group_key_field(level);
    let field_ref = format!("${}", selector);

    let stages = match interval {
        Some(interval) => {
            if let Some(width) = interval.width() {
                let bucket = json!({ "$subtract": [field_ref, { "$mod": [field_ref, width] }] });
                vec![single("$addFields", single(&key, bucket))]
            } else if let Some(part) = interval.date_part() {
                date_part_stages(&key, selector, part, timezone_offset, QUARTER_SCRATCH_FIELD)
            } else {
                vec![single("$addFields", single(&key, Value::String(field_ref)))]
            }
        }
        None => vec![single("$addFields", single(&key, Value::String(field_ref)))],
    };

    GroupKeyStages { stages, level }
}

/// Key stages followed by the `$group` stage on the synthetic key
pub fn group_stage(
    include_items: bool,
    count_separately: bool,
    item_projection: Option<Value>,
    key: GroupKeyStages,
) -> Vec<Value> {
    let mut group = Map::new();
    group.insert("_id".to_string(), Value::String(format!("${}", key.key_field())));
    if !count_separately {
        group.insert("count".to_string(), json!({ "$sum": 1 }));
    }
    if include_items {
        let projection = item_projection.unwrap_or_else(|| Value::from(CURRENT_DOCUMENT));
        group.insert("items".to_string(), json!({ "$push": projection }));
    }

    let mut stages = key.stages;
    stages.push(single("$group", Value::Object(group)));
    stages
}

/// The full grouping block of one level: key, `$group`, `$project`, `$sort`
/// and, without items, `{"$addFields": {"items": null}}`.
pub fn grouping_stages(
    desc: bool,
    include_items: bool,
    count_separately: bool,
    key: GroupKeyStages,
    item_projection: Option<Value>,
) -> Vec<Value> {
    let mut stages = group_stage(include_items, count_separately, item_projection, key);

    let mut project = Map::new();
    project.insert("_id".to_string(), json!(0));
    project.insert("key".to_string(), json!("$_id"));
    if !count_separately {
        project.insert("count".to_string(), json!(1));
    }
    if include_items {
        project.insert("items".to_string(), json!(1));
    }
    stages.push(single("$project", Value::Object(project)));
    stages.push(json!({ "$sort": { "key": direction(desc) } }));

    if !include_items {
        // items must be present and null, not missing or empty
        stages.push(json!({ "$addFields": { "items": null } }));
    }
    stages
}

pub fn skip_take_stages(skip: u64, take: u64) -> Vec<Value> {
    let mut stages = Vec::new();
    if skip > 0 {
        stages.push(json!({ "$skip": skip }));
    }
    if take > 0 {
        stages.push(json!({ "$limit": take }));
    }
    stages
}

pub fn count_stages() -> Vec<Value> {
    vec![json!({ "$count": "count" })]
}

pub fn match_stages(selector: &str, value: &Value) -> Vec<Value> {
    vec![single("$match", single(selector, value.clone()))]
}

/// Narrows the documents in scope to one group of one level.
///
/// Exact-value levels match on the selector. Bucketed levels recompute the
/// synthetic key and match on that, since the key is not a stored value.
pub fn group_narrowing_stages(
    selector: &str,
    interval: Option<&GroupInterval>,
    level: usize,
    timezone_offset: i64,
    key: &Value,
) -> Vec<Value> {
    match interval {
        Some(interval) if interval.is_bucketed() => {
            let key_stages = group_key_stages(selector, Some(interval), level, timezone_offset);
            let field = key_stages.key_field();
            let mut stages = key_stages.stages;
            stages.extend(match_stages(&field, key));
            stages
        }
        _ => match_stages(selector, key),
    }
}

/// Compiles `filter` into match stages; a malformed filter yields none
pub fn filter_stages(filter: &Value, timezone_offset: i64) -> Vec<Value> {
    compiled_filter_stages(&filter::compile(filter), timezone_offset)
}

/// Match stages for an already compiled filter. Date-part pseudo fields are
/// computed by `$addFields` stages ahead of the `$match` and projected away
/// right after it.
pub fn compiled_filter_stages(compiled: &CompiledFilter, timezone_offset: i64) -> Vec<Value> {
    let predicate = match &compiled.predicate {
        Some(predicate) => predicate,
        None => return Vec::new(),
    };

    let mut stages = Vec::new();
    let mut computed = Map::new();
    for part in compiled.fields.iter().filter_map(|f| DatePartField::parse(f)) {
        let target = part.synthetic_name();
        let scratch = part.scratch_name();
        stages.extend(date_part_stages(
            &target,
            &part.base,
            part.part,
            timezone_offset,
            &scratch,
        ));
        computed.insert(target, json!(0));
        if part.part == DateInterval::Quarter {
            computed.insert(scratch, json!(0));
        }
    }
    stages.push(single("$match", predicate.clone()));
    if !computed.is_empty() {
        stages.push(single("$project", Value::Object(computed)));
    }
    stages
}

/// Removes the fields written by group key stages from a pushed row
pub fn strip_group_key_fields(mut doc: Value) -> Value {
    if let Value::Object(map) = &mut doc {
        map.retain(|name, _| {
            !name.starts_with(GROUP_KEY_PREFIX) && name != QUARTER_SCRATCH_FIELD
        });
    }
    doc
}

pub fn sort_stages(sort: &[SortInfo]) -> Vec<Value> {
    if sort.is_empty() {
        return Vec::new();
    }
    let mut sorting = Map::new();
    for info in sort {
        sorting.insert(info.selector.clone(), direction(info.desc));
    }
    vec![single("$sort", Value::Object(sorting))]
}

/// Builds the filter expression of a free-text search over one or more
/// fields, `[f1, op, v, "or", f2, op, v, ...]`
pub fn search_expression(expr: &SearchExpr, operation: &str, value: &Value) -> Option<Value> {
    match expr {
        SearchExpr::Single(field) => Some(json!([field, operation, value])),
        SearchExpr::Many(fields) if fields.is_empty() => None,
        SearchExpr::Many(fields) => {
            let mut criteria = Vec::with_capacity(fields.len() * 2);
            for field in fields {
                if !criteria.is_empty() {
                    criteria.push(json!("or"));
                }
                criteria.push(json!([field, operation, value]));
            }
            Some(Value::Array(criteria))
        }
    }
}

/// Match stages for a free-text search. Any missing part, or a falsy search
/// value (null, `""`, `0`, `false`), yields none.
pub fn search_stages(
    expr: Option<&SearchExpr>,
    operation: Option<&str>,
    value: Option<&Value>,
    timezone_offset: i64,
) -> Vec<Value> {
    let (expr, operation, value) = match (expr, operation, value) {
        (Some(e), Some(o), Some(v)) if !o.is_empty() && !is_blank(v) => (e, o, v),
        _ => return Vec::new(),
    };
    match search_expression(expr, operation, value) {
        Some(criteria) => filter_stages(&criteria, timezone_offset),
        None => Vec::new(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Projection document `{f: "$f", ...}` for the selected fields
pub fn select_projection(fields: &[String], explicit_id: bool) -> Option<Value> {
    if fields.is_empty() {
        return None;
    }
    let mut project = Map::new();
    if explicit_id {
        project.insert("_id".to_string(), json!("$_id"));
    }
    for field in fields {
        project.insert(field.clone(), Value::String(format!("${}", field)));
    }
    Some(Value::Object(project))
}

pub fn select_stages(fields: &[String]) -> Vec<Value> {
    match select_projection(fields, false) {
        Some(project) => vec![single("$project", project)],
        None => Vec::new(),
    }
}

fn direction(desc: bool) -> Value {
    if desc {
        json!(-1)
    } else {
        json!(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_stages(level: usize) -> GroupKeyStages {
        GroupKeyStages {
            stages: vec![json!("test")],
            level,
        }
    }

    fn named(name: &str) -> GroupInterval {
        GroupInterval::Named(name.to_string())
    }

    #[test]
    fn test_group_key_no_interval() {
        let result = group_key_stages("sel", None, 0, 0);
        assert_eq!(result.stages, vec![json!({"$addFields": {"___group_key_0": "$sel"}})]);
        assert_eq!(result.level, 0);
    }

    #[test]
    fn test_group_key_numeric_interval() {
        let result = group_key_stages("sel", Some(&GroupInterval::Numeric(15.into())), 0, 0);
        assert_eq!(
            result.stages,
            vec![json!({"$addFields": {"___group_key_0": {"$subtract": ["$sel", {"$mod": ["$sel", 15]}]}}})]
        );
    }

    #[test]
    fn test_group_key_basic_named_intervals() {
        let cases = [
            ("year", 0, "$year"),
            ("year", 60, "$year"),
            ("month", 60, "$month"),
            ("day", 60, "$dayOfMonth"),
            ("hour", 60, "$hour"),
            ("minute", 60, "$minute"),
            ("second", 60, "$second"),
        ];
        for (name, offset, operator) in cases {
            let result = group_key_stages("sel", Some(&named(name)), 0, offset);
            let mut extract = Map::new();
            extract.insert(
                operator.to_string(),
                json!({"$subtract": ["$sel", offset * 60 * 1000]}),
            );
            assert_eq!(
                result.stages,
                vec![json!({"$addFields": {"___group_key_0": Value::Object(extract)}})],
                "interval {}",
                name
            );
        }
    }

    #[test]
    fn test_group_key_quarter() {
        let result = group_key_stages("sel", Some(&named("quarter")), 0, 60);
        assert_eq!(
            result.stages,
            vec![
                json!({"$addFields": {"___mp2": {"$add": [{"$month": {"$subtract": ["$sel", 3600000]}}, 2]}}}),
                json!({"$addFields": {"___group_key_0": {
                    "$divide": [{"$subtract": ["$___mp2", {"$mod": ["$___mp2", 3]}]}, 3]
                }}}),
            ]
        );
    }

    #[test]
    fn test_group_key_day_of_week() {
        let result = group_key_stages("sel", Some(&named("dayOfWeek")), 0, 60);
        assert_eq!(
            result.stages,
            vec![json!({"$addFields": {"___group_key_0": {
                "$subtract": [{"$dayOfWeek": {"$subtract": ["$sel", 3600000]}}, 1]
            }}})]
        );
    }

    #[test]
    fn test_group_key_unknown_interval() {
        let result = group_key_stages("sel", Some(&named("non-existent name")), 0, 0);
        assert_eq!(result.stages, vec![json!({"$addFields": {"___group_key_0": "$sel"}})]);
    }

    #[test]
    fn test_group_stage_variants() {
        assert_eq!(
            group_stage(false, true, None, key_stages(99)),
            vec![json!("test"), json!({"$group": {"_id": "$___group_key_99"}})]
        );
        assert_eq!(
            group_stage(false, false, None, key_stages(99)),
            vec![json!("test"), json!({"$group": {"_id": "$___group_key_99", "count": {"$sum": 1}}})]
        );
        assert_eq!(
            group_stage(true, false, Some(json!("itemProjection")), key_stages(99)),
            vec![
                json!("test"),
                json!({"$group": {
                    "_id": "$___group_key_99",
                    "count": {"$sum": 1},
                    "items": {"$push": "itemProjection"}
                }})
            ]
        );
    }

    #[test]
    fn test_grouping_counting_separately() {
        let result = grouping_stages(true, false, true, key_stages(99), None);
        assert_eq!(
            result,
            vec![
                json!("test"),
                json!({"$group": {"_id": "$___group_key_99"}}),
                json!({"$project": {"_id": 0, "key": "$_id"}}),
                json!({"$sort": {"key": -1}}),
                json!({"$addFields": {"items": null}}),
            ]
        );
    }

    #[test]
    fn test_grouping_counting_inline() {
        let result = grouping_stages(true, false, false, key_stages(99), None);
        assert_eq!(
            result,
            vec![
                json!("test"),
                json!({"$group": {"_id": "$___group_key_99", "count": {"$sum": 1}}}),
                json!({"$project": {"_id": 0, "key": "$_id", "count": 1}}),
                json!({"$sort": {"key": -1}}),
                json!({"$addFields": {"items": null}}),
            ]
        );
    }

    #[test]
    fn test_grouping_with_items() {
        let result = grouping_stages(false, true, false, key_stages(99), None);
        assert_eq!(
            result,
            vec![
                json!("test"),
                json!({"$group": {
                    "_id": "$___group_key_99",
                    "count": {"$sum": 1},
                    "items": {"$push": "$$CURRENT"}
                }}),
                json!({"$project": {"_id": 0, "key": "$_id", "count": 1, "items": 1}}),
                json!({"$sort": {"key": 1}}),
            ]
        );

        let custom = grouping_stages(true, true, false, key_stages(99), Some(json!("$$customProjection$$")));
        assert_eq!(custom[1]["$group"]["items"], json!({"$push": "$$customProjection$$"}));
    }

    #[test]
    fn test_grouping_key_order_is_preserved() {
        let result = grouping_stages(false, true, false, key_stages(0), None);
        let text = serde_json::to_string(&result[2]).unwrap();
        assert_eq!(text, r#"{"$project":{"_id":0,"key":"$_id","count":1,"items":1}}"#);
    }

    #[test]
    fn test_skip_take() {
        assert_eq!(skip_take_stages(0, 0), Vec::<Value>::new());
        assert_eq!(skip_take_stages(5, 0), vec![json!({"$skip": 5})]);
        assert_eq!(skip_take_stages(0, 5), vec![json!({"$limit": 5})]);
        assert_eq!(
            skip_take_stages(5, 5),
            vec![json!({"$skip": 5}), json!({"$limit": 5})]
        );
    }

    #[test]
    fn test_count_and_match() {
        assert_eq!(count_stages(), vec![json!({"$count": "count"})]);
        assert_eq!(
            match_stages("sel", &json!("val")),
            vec![json!({"$match": {"sel": "val"}})]
        );
    }

    #[test]
    fn test_narrowing_exact_value() {
        assert_eq!(
            group_narrowing_stages("category", None, 0, 0, &json!("A")),
            vec![json!({"$match": {"category": "A"}})]
        );
        assert_eq!(
            group_narrowing_stages("category", Some(&named("nope")), 0, 0, &json!("A")),
            vec![json!({"$match": {"category": "A"}})]
        );
    }

    #[test]
    fn test_narrowing_bucketed() {
        let result = group_narrowing_stages(
            "price",
            Some(&GroupInterval::Numeric(10.into())),
            1,
            0,
            &json!(20),
        );
        assert_eq!(
            result,
            vec![
                json!({"$addFields": {"___group_key_1": {"$subtract": ["$price", {"$mod": ["$price", 10]}]}}}),
                json!({"$match": {"___group_key_1": 20}}),
            ]
        );
    }

    #[test]
    fn test_filter_stages() {
        assert_eq!(
            filter_stages(&json!(["amount", ">", 100]), 0),
            vec![json!({"$match": {"amount": {"$gt": 100}}})]
        );
        assert!(filter_stages(&json!(["amount", "~~", 100]), 0).is_empty());
    }

    #[test]
    fn test_filter_stages_date_part() {
        let result = filter_stages(&json!(["created.month", "=", 3]), 0);
        assert_eq!(
            result,
            vec![
                json!({"$addFields": {"___created_month": {"$month": {"$subtract": ["$created", 0]}}}}),
                json!({"$match": {"___created_month": {"$eq": 3}}}),
                json!({"$project": {"___created_month": 0}}),
            ]
        );
    }

    #[test]
    fn test_filter_stages_drop_quarter_scratch() {
        let result = filter_stages(
            &json!([["created.quarter", "=", 1], "and", ["created.year", "=", 2024]]),
            0,
        );
        assert_eq!(
            result.last(),
            Some(&json!({"$project": {
                "___created_quarter": 0,
                "___created_mp2": 0,
                "___created_year": 0
            }}))
        );
    }

    #[test]
    fn test_strip_group_key_fields() {
        let row = json!({"_id": 1, "___group_key_0": "A", "___group_key_1": 20, "___mp2": 5, "___x": 1});
        assert_eq!(strip_group_key_fields(row), json!({"_id": 1, "___x": 1}));
    }

    #[test]
    fn test_sort_stages() {
        assert!(sort_stages(&[]).is_empty());
        let sort = vec![
            SortInfo { selector: "b".into(), desc: true },
            SortInfo { selector: "a".into(), desc: false },
        ];
        let result = sort_stages(&sort);
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"[{"$sort":{"b":-1,"a":1}}]"#
        );
    }

    #[test]
    fn test_search_stages() {
        let single_field = SearchExpr::Single("name".into());
        assert_eq!(
            search_stages(Some(&single_field), Some("contains"), Some(&json!("ab")), 0),
            vec![json!({"$match": {"name": {"$regex": "ab", "$options": ""}}})]
        );

        let fields = SearchExpr::Many(vec!["a".into(), "b".into()]);
        assert_eq!(
            search_stages(Some(&fields), Some("="), Some(&json!(3)), 0),
            vec![json!({"$match": {"$or": [{"a": {"$eq": 3}}, {"b": {"$eq": 3}}]}})]
        );
    }

    #[test]
    fn test_search_stages_incomplete() {
        let fields = SearchExpr::Many(vec!["a".into()]);
        assert!(search_stages(None, Some("="), Some(&json!(3)), 0).is_empty());
        assert!(search_stages(Some(&fields), None, Some(&json!(3)), 0).is_empty());
        assert!(search_stages(Some(&fields), Some("="), Some(&json!("")), 0).is_empty());
        assert!(search_stages(Some(&fields), Some("="), Some(&json!(0)), 0).is_empty());
        assert!(search_stages(Some(&fields), Some("="), Some(&json!(false)), 0).is_empty());
        assert!(search_stages(Some(&SearchExpr::Many(vec![])), Some("="), Some(&json!(3)), 0).is_empty());
    }

    #[test]
    fn test_select() {
        let fields = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            select_projection(&fields, true),
            Some(json!({"_id": "$_id", "a": "$a", "b": "$b"}))
        );
        assert_eq!(
            select_stages(&fields),
            vec![json!({"$project": {"a": "$a", "b": "$b"}})]
        );
        assert!(select_stages(&[]).is_empty());
        assert_eq!(select_projection(&[], true), None);
    }
}
