//! Policy seam: what an access decision sees and what it may answer.

use std::fmt;
use std::marker::PhantomData;

use rowguard_security::{Condition, SecurityContext};

use crate::error::PolicyError;

/// The data-access operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Find,
    Count,
    Save,
    Delete,
}

impl Action {
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Save | Self::Delete)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Count => "count",
            Self::Save => "save",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an access decision, shared by the read and write paths.
///
/// | Result | Read path | Write path |
/// |--------|-----------|------------|
/// | `Allow` | criteria unchanged | write proceeds |
/// | `Deny` | criteria made unsatisfiable | write vetoed |
/// | `Narrow(c)` | `c` ANDed into criteria | write proceeds only if the record satisfies `c` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyResult {
    Allow,
    Deny,
    Narrow(Condition),
}

impl From<bool> for PolicyResult {
    fn from(allowed: bool) -> Self {
        if allowed { Self::Allow } else { Self::Deny }
    }
}

impl From<Condition> for PolicyResult {
    fn from(condition: Condition) -> Self {
        Self::Narrow(condition)
    }
}

/// `None` means the policy has nothing to add for this call.
impl From<Option<Condition>> for PolicyResult {
    fn from(condition: Option<Condition>) -> Self {
        condition.map_or(Self::Allow, Self::Narrow)
    }
}

/// Input handed to an [`AccessPolicy`].
///
/// Reads are query-level and carry no record; writes carry the record
/// about to be saved or deleted.
#[derive(Debug)]
pub struct AccessRequest<'a, O> {
    actor: &'a SecurityContext,
    action: Action,
    record: Option<&'a O>,
}

impl<'a, O> AccessRequest<'a, O> {
    #[must_use]
    pub fn new(actor: &'a SecurityContext, action: Action, record: Option<&'a O>) -> Self {
        Self {
            actor,
            action,
            record,
        }
    }

    #[must_use]
    pub fn actor(&self) -> &'a SecurityContext {
        self.actor
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn record(&self) -> Option<&'a O> {
        self.record
    }
}

/// Computes the access decision for operations on `O`.
///
/// Policies return a decision; they never touch the query criteria
/// themselves. An `Err` is a misconfiguration and is propagated to the
/// caller instead of being read as "allow".
pub trait AccessPolicy<O>: Send + Sync {
    /// Decide on a single operation.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the decision can not be computed.
    fn evaluate(&self, request: &AccessRequest<'_, O>) -> Result<PolicyResult, PolicyError>;
}

/// Adapter turning a closure into an [`AccessPolicy`].
pub(crate) struct FnPolicy<F>(pub(crate) F);

impl<O, F> AccessPolicy<O> for FnPolicy<F>
where
    F: Fn(&AccessRequest<'_, O>) -> Result<PolicyResult, PolicyError> + Send + Sync,
{
    fn evaluate(&self, request: &AccessRequest<'_, O>) -> Result<PolicyResult, PolicyError> {
        (self.0)(request)
    }
}

/// Access hooks an owner type defines for itself.
///
/// Used when no external policy is configured. Opting in is explicit, see
/// [`AccessInterceptor::with_owner_hooks`](crate::AccessInterceptor::with_owner_hooks).
pub trait Authorizable {
    /// Decision for queries over this type.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the decision can not be computed.
    fn before_read(actor: &SecurityContext) -> Result<PolicyResult, PolicyError>;

    /// Decision for saving or deleting this record.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the decision can not be computed.
    fn before_write(
        &self,
        actor: &SecurityContext,
        action: Action,
    ) -> Result<PolicyResult, PolicyError>;
}

/// Routes policy evaluation to the owner's [`Authorizable`] hooks.
pub(crate) struct OwnerHooks<O>(PhantomData<fn() -> O>);

impl<O> OwnerHooks<O> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<O: Authorizable> AccessPolicy<O> for OwnerHooks<O> {
    fn evaluate(&self, request: &AccessRequest<'_, O>) -> Result<PolicyResult, PolicyError> {
        match request.record() {
            Some(record) if request.action().is_write() => {
                record.before_write(request.actor(), request.action())
            }
            Some(_) | None => O::before_read(request.actor()),
        }
    }
}
