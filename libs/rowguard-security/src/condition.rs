use std::fmt;
use uuid::Uuid;

/// A typed scalar a row property can be compared against.
///
/// Property names are authorization concepts (`"owner_id"`, `"tenant_id"`).
/// Mapping them to storage columns is the job of the ORM binding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyValue {
    Uuid(Uuid),
    String(String),
    Int(i64),
    Bool(bool),
}

impl PropertyValue {
    /// Returns the UUID held by this value, parsing string values if needed.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            Self::String(s) => Uuid::parse_str(s).ok(),
            Self::Int(_) | Self::Bool(_) => None,
        }
    }

    /// Loose equality used when checking records: a UUID and its string
    /// rendering are the same value.
    fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Uuid(a), Self::String(_)) => other.as_uuid() == Some(*a),
            (Self::String(_), Self::Uuid(b)) => self.as_uuid() == Some(*b),
            _ => self == other,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::String(s) => write!(f, "'{s}'"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<Uuid> for PropertyValue {
    #[inline]
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<&Uuid> for PropertyValue {
    #[inline]
    fn from(u: &Uuid) -> Self {
        Self::Uuid(*u)
    }
}

impl From<String> for PropertyValue {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for PropertyValue {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<i64> for PropertyValue {
    #[inline]
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for PropertyValue {
    #[inline]
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<bool> for PropertyValue {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A single predicate on a named row property.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    /// `property = value`
    Eq {
        property: String,
        value: PropertyValue,
    },
    /// `property IN (values)`. An empty set matches nothing.
    In {
        property: String,
        values: Vec<PropertyValue>,
    },
}

impl Filter {
    #[must_use]
    pub fn eq(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::Eq {
            property: property.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn is_in<V: Into<PropertyValue>>(
        property: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            property: property.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The property this filter constrains.
    #[must_use]
    pub fn property(&self) -> &str {
        match self {
            Self::Eq { property, .. } | Self::In { property, .. } => property,
        }
    }

    /// Returns `true` if `value` satisfies this filter.
    #[must_use]
    pub fn matches(&self, value: &PropertyValue) -> bool {
        match self {
            Self::Eq { value: expected, .. } => expected.same_as(value),
            Self::In { values, .. } => values.iter().any(|v| v.same_as(value)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { property, value } => write!(f, "{property} = {value}"),
            Self::In { property, values } => {
                write!(f, "{property} IN (")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A conjunction (AND) of filters.
///
/// An empty condition places no restriction on rows.
///
/// ```
/// use rowguard_security::{Condition, Filter};
///
/// let cond = Condition::eq("owner_id", 5).and(Filter::eq("archived", false));
/// assert_eq!(cond.to_string(), "owner_id = 5 AND archived = false");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Condition {
    filters: Vec<Filter>,
}

impl Condition {
    #[must_use]
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Shorthand for a single-filter `property = value` condition.
    #[must_use]
    pub fn eq(property: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::new(vec![Filter::eq(property, value)])
    }

    /// Shorthand for a single-filter `property IN (values)` condition.
    #[must_use]
    pub fn is_in<V: Into<PropertyValue>>(
        property: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(vec![Filter::is_in(property, values)])
    }

    /// Adds another filter to the conjunction.
    #[must_use]
    pub fn and(mut self, filter: Filter) -> Self {
        if !self.filters.contains(&filter) {
            self.filters.push(filter);
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Names of the properties referenced by this condition.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(Filter::property)
    }
}

impl From<Filter> for Condition {
    fn from(filter: Filter) -> Self {
        Self::new(vec![filter])
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filters.is_empty() {
            return f.write_str("TRUE");
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}
