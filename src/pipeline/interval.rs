//! Group intervals
//!
//! A group level may bucket its selector instead of grouping by exact value:
//! numerically (`groupInterval: 10` groups 0..9, 10..19, ...) or by a calendar
//! part of a date (`groupInterval: "month"`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};

use super::single;

/// Scratch field used by the two-step quarter computation of group keys
pub const QUARTER_SCRATCH_FIELD: &str = "___mp2";

/// Calendar part of a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateInterval {
    Year,
    Quarter,
    Month,
    Day,
    DayOfWeek,
    Hour,
    Minute,
    Second,
}

impl DateInterval {
    /// Parses an interval name as sent by the client
    pub fn parse(name: &str) -> Option<Self> {
        let interval = match name {
            "year" => DateInterval::Year,
            "quarter" => DateInterval::Quarter,
            "month" => DateInterval::Month,
            "day" => DateInterval::Day,
            "dayOfWeek" => DateInterval::DayOfWeek,
            "hour" => DateInterval::Hour,
            "minute" => DateInterval::Minute,
            "second" => DateInterval::Second,
            _ => return None,
        };
        Some(interval)
    }

    /// Date parts addressable from a filter as `field.<part>`
    pub fn from_field_suffix(suffix: &str) -> Option<Self> {
        match Self::parse(suffix)? {
            DateInterval::Hour | DateInterval::Minute | DateInterval::Second => None,
            part => Some(part),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateInterval::Year => "year",
            DateInterval::Quarter => "quarter",
            DateInterval::Month => "month",
            DateInterval::Day => "day",
            DateInterval::DayOfWeek => "dayOfWeek",
            DateInterval::Hour => "hour",
            DateInterval::Minute => "minute",
            DateInterval::Second => "second",
        }
    }

    /// Date operator extracting this part; quarter is derived from `$month`
    fn operator(&self) -> &'static str {
        match self {
            DateInterval::Year => "$year",
            DateInterval::Quarter | DateInterval::Month => "$month",
            DateInterval::Day => "$dayOfMonth",
            DateInterval::DayOfWeek => "$dayOfWeek",
            DateInterval::Hour => "$hour",
            DateInterval::Minute => "$minute",
            DateInterval::Second => "$second",
        }
    }
}

/// `groupInterval` of a group level: a bucket width or an interval name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupInterval {
    Numeric(Number),
    Named(String),
}

impl GroupInterval {
    /// Bucket width, when numeric and usable as a `$mod` divisor
    pub fn width(&self) -> Option<&Number> {
        match self {
            GroupInterval::Numeric(n) if n.as_f64().map_or(false, |w| w > 0.0) => Some(n),
            _ => None,
        }
    }

    /// Calendar part, when the name is a known date interval
    pub fn date_part(&self) -> Option<DateInterval> {
        match self {
            GroupInterval::Named(name) => DateInterval::parse(name),
            GroupInterval::Numeric(_) => None,
        }
    }

    /// True when group keys are computed buckets rather than stored values.
    /// Unknown names and unusable widths fall back to exact values.
    pub fn is_bucketed(&self) -> bool {
        self.width().is_some() || self.date_part().is_some()
    }
}

/// `$addFields` stages writing the `part` of date field `source` into `target`.
///
/// The date is shifted by `timezone_offset` minutes first. Quarter needs two
/// stages and writes an intermediate value into `scratch`.
pub fn date_part_stages(
    target: &str,
    source: &str,
    part: DateInterval,
    timezone_offset: i64,
    scratch: &str,
) -> Vec<Value> {
    let shifted = json!({ "$subtract": [format!("${}", source), timezone_offset * 60 * 1000] });
    let extracted = single(part.operator(), shifted);

    match part {
        DateInterval::Quarter => {
            let scratch_ref = format!("${}", scratch);
            let month_plus_two = json!({ "$add": [extracted, 2] });
            let quarter = json!({
                "$divide": [{ "$subtract": [scratch_ref.clone(), { "$mod": [scratch_ref, 3] }] }, 3]
            });
            vec![
                add_fields(scratch, month_plus_two),
                add_fields(target, quarter),
            ]
        }
        DateInterval::DayOfWeek => {
            // zero-based, Sunday = 0
            add_fields_vec(target, json!({ "$subtract": [extracted, 1] }))
        }
        _ => add_fields_vec(target, extracted),
    }
}

fn add_fields(field: &str, expression: Value) -> Value {
    single("$addFields", single(field, expression))
}

fn add_fields_vec(field: &str, expression: Value) -> Vec<Value> {
    vec![add_fields(field, expression)]
}
