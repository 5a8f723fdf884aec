//! Interceptor configuration.

use serde::Deserialize;

use crate::policy::PolicyResult;

/// Configuration of an [`AccessInterceptor`](crate::AccessInterceptor).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RestrictionConfig {
    /// Whether the pipeline hooks restrict reads and writes automatically.
    ///
    /// When disabled, reads can still be narrowed with `readable()` and
    /// writes checked with `writeable()`.
    pub enable_restriction: bool,

    /// Decision used when neither a policy nor owner hooks are configured.
    pub default_decision: DefaultDecision,
}

impl Default for RestrictionConfig {
    fn default() -> Self {
        Self {
            enable_restriction: true,
            default_decision: DefaultDecision::Allow,
        }
    }
}

impl RestrictionConfig {
    /// Configuration with automatic restriction turned off.
    #[must_use]
    pub fn opt_in() -> Self {
        Self {
            enable_restriction: false,
            ..Self::default()
        }
    }
}

/// What to do when no access policy is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefaultDecision {
    /// Leave reads and writes unrestricted.
    #[default]
    Allow,
    /// Deny every read and veto every write.
    Deny,
}

impl From<DefaultDecision> for PolicyResult {
    fn from(decision: DefaultDecision) -> Self {
        match decision {
            DefaultDecision::Allow => Self::Allow,
            DefaultDecision::Deny => Self::Deny,
        }
    }
}
