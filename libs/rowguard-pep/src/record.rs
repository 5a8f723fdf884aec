//! In-memory view of a record's authorization properties.
//!
//! The write path checks a `Narrow` decision against the record itself:
//! there is no query to attach the condition to.

use rowguard_security::{Condition, PropertyValue};

use crate::error::RestrictionError;

/// Result of looking up one property on a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyLookup {
    /// The record holds this value.
    Value(PropertyValue),
    /// The record holds NULL for this property.
    Null,
    /// The property exists but is not being written (e.g. a column left to
    /// its database default).
    NotSet,
    /// The record has no such property.
    Unknown,
}

/// Exposes named properties of a record to narrowing conditions.
pub trait RecordProperties {
    fn property(&self, name: &str) -> PropertyLookup;
}

/// Checks `record` against every filter of `condition`.
///
/// - a `NotSet` property is skipped;
/// - a `Null` property never matches;
/// - an `Unknown` property is an error, not a mismatch.
pub(crate) fn satisfies<R>(record: &R, condition: &Condition) -> Result<bool, RestrictionError>
where
    R: RecordProperties + ?Sized,
{
    for filter in condition.filters() {
        match record.property(filter.property()) {
            PropertyLookup::Value(value) => {
                if !filter.matches(&value) {
                    return Ok(false);
                }
            }
            PropertyLookup::NotSet => {}
            PropertyLookup::Null => return Ok(false),
            PropertyLookup::Unknown => {
                return Err(RestrictionError::unknown_property(filter.property()));
            }
        }
    }
    Ok(true)
}
