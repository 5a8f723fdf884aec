//! Error types for the access interceptor.
//!
//! Denials are not errors: a denied read yields an empty result and a
//! denied write is reported through [`WriteEvent`](crate::WriteEvent).
//! Errors here mean the decision itself could not be made.

use thiserror::Error;

use crate::policy::Action;

/// Failure raised by an access policy or owner hook.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy can not decide with the configuration it was given.
    #[error("policy misconfigured: {0}")]
    Misconfigured(String),

    /// A collaborator the policy depends on is not available.
    #[error("policy unavailable: {0}")]
    Unavailable(String),
}

impl PolicyError {
    #[must_use]
    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::Misconfigured(message.into())
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Errors returned by the interceptor hooks.
#[derive(Debug, Error)]
pub enum RestrictionError {
    /// The configured policy failed while deciding on `action`.
    #[error("access policy failed on {action}: {source}")]
    Policy {
        action: Action,
        #[source]
        source: PolicyError,
    },

    /// A narrowing condition names a property the owner does not expose.
    #[error("condition references unknown property '{property}'")]
    UnknownProperty { property: String },
}

impl RestrictionError {
    #[must_use]
    pub fn unknown_property(property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            property: property.into(),
        }
    }
}
