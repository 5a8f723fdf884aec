//! The access interceptor and its per-call handle.
//!
//! [`AccessInterceptor`] is built once per owner type and is immutable
//! afterwards. Everything that varies per operation (bypass, write opt-in)
//! lives in an [`AccessCall`], which is consumed by the hook it guards, so a
//! bypass can never outlive the operation it was requested for.

use std::fmt;
use std::sync::Arc;

use rowguard_security::{CriteriaBuilder, IdentityProvider, SecurityContext};

use crate::config::RestrictionConfig;
use crate::error::{PolicyError, RestrictionError};
use crate::event::WriteEvent;
use crate::policy::{
    AccessPolicy, AccessRequest, Action, Authorizable, FnPolicy, OwnerHooks, PolicyResult,
};
use crate::record::{RecordProperties, satisfies};

/// How a read hook ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The caller asked for an unrestricted call; the policy was not consulted.
    Bypassed,
    /// Restriction is disabled or no identity provider is configured.
    NotApplied,
    /// The policy allowed the read without narrowing it.
    Allowed,
    /// A condition was merged into the criteria.
    Restricted,
    /// The criteria was made unsatisfiable.
    Denied,
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallMode {
    bypass: bool,
    write_requested: bool,
}

impl CallMode {
    /// Skip restriction for this call.
    #[must_use]
    pub fn bypass(self) -> bool {
        self.bypass
    }

    /// Check writes even when automatic restriction is disabled.
    #[must_use]
    pub fn write_requested(self) -> bool {
        self.write_requested
    }
}

/// Row-level access interceptor attached to owner type `O`.
///
/// # Decision source
///
/// 1. the policy set with [`with_policy`](Self::with_policy) /
///    [`with_policy_fn`](Self::with_policy_fn);
/// 2. otherwise the owner's [`Authorizable`] hooks, if opted into with
///    [`with_owner_hooks`](Self::with_owner_hooks);
/// 3. otherwise [`RestrictionConfig::default_decision`].
///
/// Without an identity provider nothing is restricted at all.
pub struct AccessInterceptor<O> {
    config: RestrictionConfig,
    policy: Option<Arc<dyn AccessPolicy<O>>>,
    owner_hooks: Option<Arc<dyn AccessPolicy<O>>>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl<O> AccessInterceptor<O> {
    #[must_use]
    pub fn new(config: RestrictionConfig) -> Self {
        Self {
            config,
            policy: None,
            owner_hooks: None,
            identity: None,
        }
    }

    /// Set the access policy.
    #[must_use]
    pub fn with_policy<P>(mut self, policy: P) -> Self
    where
        P: AccessPolicy<O> + 'static,
    {
        self.policy = Some(Arc::new(policy));
        self
    }

    /// Set the access policy from a closure.
    #[must_use]
    pub fn with_policy_fn<F>(mut self, policy: F) -> Self
    where
        F: Fn(&AccessRequest<'_, O>) -> Result<PolicyResult, PolicyError> + Send + Sync + 'static,
    {
        self.policy = Some(Arc::new(FnPolicy(policy)));
        self
    }

    /// Set the provider of the acting principal.
    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    #[must_use]
    pub fn config(&self) -> &RestrictionConfig {
        &self.config
    }

    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Start a call with default options.
    pub fn call(&self) -> AccessCall<'_, O> {
        AccessCall {
            interceptor: self,
            mode: CallMode::default(),
        }
    }

    /// Start a call that skips restriction (reads).
    pub fn unrestricted(&self) -> AccessCall<'_, O> {
        self.call().unrestricted()
    }

    /// Start a call that skips restriction (writes).
    pub fn force(&self) -> AccessCall<'_, O> {
        self.call().force()
    }

    /// Start a call whose writes are checked even with restriction disabled.
    pub fn writeable(&self) -> AccessCall<'_, O> {
        self.call().writeable()
    }

    /// Apply the read policy to `criteria` now, whatever
    /// `enable_restriction` says.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::Policy`] if the policy fails.
    pub fn readable<C>(&self, criteria: &mut C) -> Result<ReadOutcome, RestrictionError>
    where
        C: CriteriaBuilder + ?Sized,
    {
        self.restrict(Action::Find, criteria)
    }

    /// Alias of [`readable`](Self::readable).
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::Policy`] if the policy fails.
    pub fn restricted<C>(&self, criteria: &mut C) -> Result<ReadOutcome, RestrictionError>
    where
        C: CriteriaBuilder + ?Sized,
    {
        self.readable(criteria)
    }

    fn actor(&self) -> Option<SecurityContext> {
        let provider = self.identity.as_ref()?;
        Some(
            provider
                .current_actor()
                .unwrap_or_else(SecurityContext::anonymous),
        )
    }

    fn decide(
        &self,
        actor: &SecurityContext,
        action: Action,
        record: Option<&O>,
    ) -> Result<PolicyResult, RestrictionError> {
        let Some(policy) = self.policy.as_ref().or(self.owner_hooks.as_ref()) else {
            return Ok(self.config.default_decision.into());
        };
        let request = AccessRequest::new(actor, action, record);
        policy.evaluate(&request).map_err(|source| {
            tracing::error!(%action, error = %source, "access policy failed");
            RestrictionError::Policy { action, source }
        })
    }

    fn restrict<C>(
        &self,
        action: Action,
        criteria: &mut C,
    ) -> Result<ReadOutcome, RestrictionError>
    where
        C: CriteriaBuilder + ?Sized,
    {
        let Some(actor) = self.actor() else {
            tracing::debug!(%action, "no identity provider, read left unrestricted");
            return Ok(ReadOutcome::NotApplied);
        };

        let outcome = match self.decide(&actor, action, None)? {
            PolicyResult::Allow => ReadOutcome::Allowed,
            PolicyResult::Narrow(condition) if condition.is_empty() => ReadOutcome::Allowed,
            PolicyResult::Narrow(condition) => {
                tracing::debug!(%action, %condition, "read narrowed");
                criteria.merge_condition(condition);
                ReadOutcome::Restricted
            }
            PolicyResult::Deny => {
                tracing::warn!(
                    %action,
                    subject_id = %actor.subject_id(),
                    "read denied, criteria made unsatisfiable"
                );
                criteria.add_unsatisfiable_condition();
                ReadOutcome::Denied
            }
        };
        Ok(outcome)
    }

    fn check_write(
        &self,
        action: Action,
        record: &O,
        stored: Option<&O>,
        event: &mut WriteEvent,
    ) -> Result<(), RestrictionError>
    where
        O: RecordProperties,
    {
        let Some(actor) = self.actor() else {
            tracing::debug!(%action, "no identity provider, write not checked");
            return Ok(());
        };

        let allowed = match self.decide(&actor, action, Some(record))? {
            PolicyResult::Allow => true,
            PolicyResult::Deny => false,
            PolicyResult::Narrow(condition) => {
                satisfies(record, &condition)?
                    && stored.map_or(Ok(true), |stored| satisfies(stored, &condition))?
            }
        };
        if !allowed {
            tracing::warn!(
                %action,
                subject_id = %actor.subject_id(),
                "write vetoed by access policy"
            );
            event.veto();
        }
        Ok(())
    }
}

impl<O: Authorizable + 'static> AccessInterceptor<O> {
    /// Use the owner's own [`Authorizable`] hooks when no policy is set.
    #[must_use]
    pub fn with_owner_hooks(mut self) -> Self {
        self.owner_hooks = Some(Arc::new(OwnerHooks::<O>::new()));
        self
    }
}

impl<O> Clone for AccessInterceptor<O> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            policy: self.policy.clone(),
            owner_hooks: self.owner_hooks.clone(),
            identity: self.identity.clone(),
        }
    }
}

impl<O> fmt::Debug for AccessInterceptor<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessInterceptor")
            .field("config", &self.config)
            .field("has_policy", &self.policy.is_some())
            .field("has_owner_hooks", &self.owner_hooks.is_some())
            .field("has_identity", &self.identity.is_some())
            .finish()
    }
}

/// One guarded operation on the owner.
///
/// Obtained from [`AccessInterceptor::call`] (or `unrestricted`, `force`,
/// `writeable`) and consumed by exactly one hook.
#[must_use = "an access call does nothing until one of its hooks runs"]
pub struct AccessCall<'i, O> {
    interceptor: &'i AccessInterceptor<O>,
    mode: CallMode,
}

impl<'i, O> AccessCall<'i, O> {
    pub fn unrestricted(mut self) -> Self {
        self.mode.bypass = true;
        self
    }

    pub fn force(self) -> Self {
        self.unrestricted()
    }

    pub fn writeable(mut self) -> Self {
        self.mode.write_requested = true;
        self
    }

    #[must_use]
    pub fn mode(&self) -> CallMode {
        self.mode
    }

    #[must_use]
    pub fn interceptor(&self) -> &'i AccessInterceptor<O> {
        self.interceptor
    }

    /// Returns `true` if a write hook run through this call would consult
    /// the policy.
    #[must_use]
    pub fn checks_writes(&self) -> bool {
        self.interceptor.has_identity() && self.applies_to_writes()
    }

    /// Hook run before a find query executes.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::Policy`] if the policy fails.
    pub fn before_find<C>(self, criteria: &mut C) -> Result<ReadOutcome, RestrictionError>
    where
        C: CriteriaBuilder + ?Sized,
    {
        self.before_read(Action::Find, criteria)
    }

    /// Hook run before a count query executes.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::Policy`] if the policy fails.
    pub fn before_count<C>(self, criteria: &mut C) -> Result<ReadOutcome, RestrictionError>
    where
        C: CriteriaBuilder + ?Sized,
    {
        self.before_read(Action::Count, criteria)
    }

    /// Hook run before `record` is saved. Vetoes through `event`.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError`] if the policy fails or its condition
    /// names a property the record does not have.
    pub fn before_save(self, record: &O, event: &mut WriteEvent) -> Result<(), RestrictionError>
    where
        O: RecordProperties,
    {
        self.before_write(Action::Save, record, None, event)
    }

    /// Hook run before an existing record is overwritten.
    ///
    /// `stored` is the record as currently persisted, `updated` the record
    /// as it will be persisted. The policy sees `updated`; a `Narrow`
    /// condition must hold for both, so a write can neither reach a record
    /// outside the condition nor move one out of it.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError`] if the policy fails or its condition
    /// names a property the record does not have.
    pub fn before_update(
        self,
        stored: &O,
        updated: &O,
        event: &mut WriteEvent,
    ) -> Result<(), RestrictionError>
    where
        O: RecordProperties,
    {
        self.before_write(Action::Save, updated, Some(stored), event)
    }

    /// Hook run before `record` is deleted. Vetoes through `event`.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError`] if the policy fails or its condition
    /// names a property the record does not have.
    pub fn before_delete(self, record: &O, event: &mut WriteEvent) -> Result<(), RestrictionError>
    where
        O: RecordProperties,
    {
        self.before_write(Action::Delete, record, None, event)
    }

    fn before_read<C>(
        self,
        action: Action,
        criteria: &mut C,
    ) -> Result<ReadOutcome, RestrictionError>
    where
        C: CriteriaBuilder + ?Sized,
    {
        if self.mode.bypass {
            tracing::info!(%action, "access restriction bypassed");
            return Ok(ReadOutcome::Bypassed);
        }
        if !self.interceptor.config.enable_restriction {
            return Ok(ReadOutcome::NotApplied);
        }
        self.interceptor.restrict(action, criteria)
    }

    fn applies_to_writes(&self) -> bool {
        let restricting = self.interceptor.config().enable_restriction && !self.mode.bypass;
        self.mode.write_requested || restricting
    }

    fn before_write(
        self,
        action: Action,
        record: &O,
        stored: Option<&O>,
        event: &mut WriteEvent,
    ) -> Result<(), RestrictionError>
    where
        O: RecordProperties,
    {
        if !self.applies_to_writes() {
            if self.mode.bypass {
                tracing::info!(%action, "access restriction bypassed");
            }
            return Ok(());
        }
        self.interceptor.check_write(action, record, stored, event)
    }
}

impl<O> fmt::Debug for AccessCall<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCall")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
