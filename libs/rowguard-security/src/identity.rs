use std::sync::Arc;

use crate::context::SecurityContext;

/// Source of the current acting principal.
///
/// An interceptor without a provider does not restrict anything; a provider
/// that reports no current actor still restricts, as an anonymous subject.
pub trait IdentityProvider: Send + Sync {
    /// The principal the current operation runs for, if one is known.
    fn current_actor(&self) -> Option<SecurityContext>;
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    fn current_actor(&self) -> Option<SecurityContext> {
        (**self).current_actor()
    }
}

/// Provider that always reports the same principal (or none).
///
/// Useful for batch jobs acting as a service account, and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    actor: Option<SecurityContext>,
}

impl StaticIdentity {
    #[must_use]
    pub fn new(actor: SecurityContext) -> Self {
        Self { actor: Some(actor) }
    }

    /// A provider that is present but has nobody logged in.
    #[must_use]
    pub fn signed_out() -> Self {
        Self { actor: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_actor(&self) -> Option<SecurityContext> {
        self.actor.clone()
    }
}
