//! Date-part pseudo fields
//!
//! `created.year` in a filter addresses the year of `created`, not a stored
//! sub-document. The compiler points such predicates at a synthetic field
//! (`___created_year`) that the filter stages compute up front.

use crate::pipeline::DateInterval;

/// A filter field of the form `<base>.<part>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePartField {
    /// Field name as written in the filter
    pub field: String,
    /// Stored date field
    pub base: String,
    pub part: DateInterval,
}

impl DatePartField {
    /// Recognizes `.year`, `.quarter`, `.month`, `.day` and `.dayOfWeek`
    pub fn parse(field: &str) -> Option<Self> {
        let (base, suffix) = field.rsplit_once('.')?;
        if base.is_empty() {
            return None;
        }
        let part = DateInterval::from_field_suffix(suffix)?;
        Some(Self {
            field: field.to_string(),
            base: base.to_string(),
            part,
        })
    }

    /// Name of the computed field holding the date part
    pub fn synthetic_name(&self) -> String {
        format!("___{}", self.field.replace('.', "_"))
    }

    /// Scratch field used by two-step computations (quarter)
    pub fn scratch_name(&self) -> String {
        format!("___{}_mp2", self.base.replace('.', "_"))
    }
}

/// Field name a predicate on `field` must use
pub fn predicate_field(field: &str) -> String {
    match DatePartField::parse(field) {
        Some(part) => part.synthetic_name(),
        None => field.to_string(),
    }
}
