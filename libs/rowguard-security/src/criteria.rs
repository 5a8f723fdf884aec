use std::fmt;

use crate::condition::Condition;

/// Criteria-mutation interface consumed by the access interceptor.
///
/// Implementations accumulate filters for one query. Both operations may
/// only narrow the result set.
pub trait CriteriaBuilder {
    /// Makes the criteria match no rows at all.
    fn add_unsatisfiable_condition(&mut self);

    /// ANDs `condition` into the criteria.
    fn merge_condition(&mut self, condition: Condition);
}

/// Owned filter accumulator for a single query.
///
/// # Policy
///
/// | State | Meaning |
/// |-------|---------|
/// | no conditions, satisfiable | unrestricted |
/// | conditions | AND of all merged conditions |
/// | unsatisfiable | no rows, whatever else was merged |
///
/// ```
/// use rowguard_security::{Condition, Criteria, CriteriaBuilder};
///
/// let mut criteria = Criteria::new();
/// criteria.merge_condition(Condition::eq("owner_id", 5));
/// criteria.merge_condition(Condition::eq("owner_id", 5));
/// assert_eq!(criteria.conditions().len(), 1);
///
/// criteria.add_unsatisfiable_condition();
/// assert!(criteria.is_unsatisfiable());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Criteria {
    conditions: Vec<Condition>,
    unsatisfiable: bool,
}

impl Criteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing condition, e.g. the caller's own `WHERE`.
    #[must_use]
    pub fn with_condition(condition: Condition) -> Self {
        let mut criteria = Self::new();
        criteria.merge_condition(condition);
        criteria
    }

    /// The merged conditions, in merge order.
    #[inline]
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[inline]
    #[must_use]
    pub fn is_unsatisfiable(&self) -> bool {
        self.unsatisfiable
    }

    /// Returns `true` if nothing narrows this criteria.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        !self.unsatisfiable && self.conditions.is_empty()
    }
}

impl CriteriaBuilder for Criteria {
    fn add_unsatisfiable_condition(&mut self) {
        self.unsatisfiable = true;
    }

    fn merge_condition(&mut self, condition: Condition) {
        if condition.is_empty() || self.conditions.contains(&condition) {
            return;
        }
        self.conditions.push(condition);
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unsatisfiable {
            return f.write_str("FALSE");
        }
        if self.conditions.is_empty() {
            return f.write_str("TRUE");
        }
        for (i, cond) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            if self.conditions.len() > 1 && cond.filters().len() > 1 {
                write!(f, "({cond})")?;
            } else {
                write!(f, "{cond}")?;
            }
        }
        Ok(())
    }
}
