#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Pipeline hook behavior of the access interceptor against an in-memory
//! owner type.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rowguard_pep::{
    AccessInterceptor, AccessPolicy, AccessRequest, Action, Authorizable, DefaultDecision,
    PolicyError, PolicyResult, PropertyLookup, ReadOutcome, RecordProperties, RestrictionConfig,
    RestrictionError, WriteEvent,
};
use rowguard_security::{
    Condition, Criteria, CriteriaBuilder, SecurityContext, StaticIdentity,
};
use uuid::Uuid;

#[derive(Debug)]
struct Document {
    owner_id: i64,
    title: &'static str,
}

impl RecordProperties for Document {
    fn property(&self, name: &str) -> PropertyLookup {
        match name {
            "owner_id" => PropertyLookup::Value(self.owner_id.into()),
            "title" => PropertyLookup::Value(self.title.into()),
            _ => PropertyLookup::Unknown,
        }
    }
}

/// Policy returning a fixed result and counting its invocations.
struct Fixed {
    result: PolicyResult,
    calls: Arc<AtomicUsize>,
}

impl Fixed {
    fn new(result: PolicyResult) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                result,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl AccessPolicy<Document> for Fixed {
    fn evaluate(&self, _request: &AccessRequest<'_, Document>) -> Result<PolicyResult, PolicyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

fn actor() -> SecurityContext {
    SecurityContext::builder()
        .subject_id(Uuid::new_v4())
        .subject_tenant_id(Uuid::new_v4())
        .build()
}

fn with_identity(config: RestrictionConfig) -> AccessInterceptor<Document> {
    AccessInterceptor::new(config).with_identity(Arc::new(StaticIdentity::new(actor())))
}

fn doc(owner_id: i64) -> Document {
    Document {
        owner_id,
        title: "quarterly report",
    }
}

// ── read path ───────────────────────────────────────────────────────────

#[test]
fn denied_read_makes_criteria_unsatisfiable() {
    let (policy, _) = Fixed::new(PolicyResult::Deny);
    let interceptor = with_identity(RestrictionConfig::default()).with_policy(policy);

    let mut criteria = Criteria::with_condition(Condition::eq("published", true));
    let outcome = interceptor.call().before_find(&mut criteria).unwrap();

    assert_eq!(outcome, ReadOutcome::Denied);
    assert!(criteria.is_unsatisfiable());
}

#[test]
fn bypassed_read_never_invokes_policy() {
    let (policy, calls) = Fixed::new(PolicyResult::Deny);
    let interceptor = with_identity(RestrictionConfig::default()).with_policy(policy);

    let mut criteria = Criteria::with_condition(Condition::eq("published", true));
    let before = criteria.clone();
    let outcome = interceptor.unrestricted().before_count(&mut criteria).unwrap();

    assert_eq!(outcome, ReadOutcome::Bypassed);
    assert_eq!(criteria, before);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn bypass_does_not_leak_into_next_call() {
    let (policy, calls) = Fixed::new(PolicyResult::Deny);
    let interceptor = with_identity(RestrictionConfig::default()).with_policy(policy);

    let mut first = Criteria::new();
    interceptor.unrestricted().before_find(&mut first).unwrap();

    let mut second = Criteria::new();
    let outcome = interceptor.call().before_find(&mut second).unwrap();

    assert_eq!(outcome, ReadOutcome::Denied);
    assert!(first.is_unrestricted());
    assert!(second.is_unsatisfiable());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn narrowing_is_anded_with_prior_criteria() {
    let interceptor = with_identity(RestrictionConfig::default())
        .with_policy_fn(|_req| Ok(PolicyResult::Narrow(Condition::eq("owner_id", 5))));

    let mut criteria = Criteria::with_condition(Condition::eq("published", true));
    let outcome = interceptor.call().before_find(&mut criteria).unwrap();

    assert_eq!(outcome, ReadOutcome::Restricted);
    assert_eq!(criteria.to_string(), "published = true AND owner_id = 5");
}

#[test]
fn readable_twice_equals_once() {
    let interceptor = with_identity(RestrictionConfig::default())
        .with_policy_fn(|_req| Ok(PolicyResult::Narrow(Condition::eq("owner_id", 5))));

    let mut once = Criteria::new();
    interceptor.readable(&mut once).unwrap();

    let mut twice = Criteria::new();
    interceptor.readable(&mut twice).unwrap();
    interceptor.restricted(&mut twice).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn readable_applies_even_with_restriction_disabled() {
    let (policy, calls) = Fixed::new(PolicyResult::Narrow(Condition::eq("owner_id", 7)));
    let interceptor = with_identity(RestrictionConfig::opt_in()).with_policy(policy);

    let mut automatic = Criteria::new();
    let outcome = interceptor.call().before_find(&mut automatic).unwrap();
    assert_eq!(outcome, ReadOutcome::NotApplied);
    assert!(automatic.is_unrestricted());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let mut explicit = Criteria::new();
    let outcome = interceptor.readable(&mut explicit).unwrap();
    assert_eq!(outcome, ReadOutcome::Restricted);
    assert_eq!(explicit.to_string(), "owner_id = 7");
}

#[test]
fn without_identity_provider_nothing_is_restricted() {
    let (policy, calls) = Fixed::new(PolicyResult::Deny);
    let interceptor = AccessInterceptor::<Document>::new(RestrictionConfig::default())
        .with_policy(policy);

    let mut criteria = Criteria::new();
    assert_eq!(
        interceptor.call().before_find(&mut criteria).unwrap(),
        ReadOutcome::NotApplied
    );
    assert_eq!(
        interceptor.readable(&mut criteria).unwrap(),
        ReadOutcome::NotApplied
    );
    assert!(criteria.is_unrestricted());

    let mut event = WriteEvent::delete();
    interceptor
        .writeable()
        .before_delete(&doc(1), &mut event)
        .unwrap();
    assert!(event.is_valid());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn signed_out_actor_is_restricted_as_anonymous() {
    let interceptor = AccessInterceptor::<Document>::new(RestrictionConfig::default())
        .with_identity(Arc::new(StaticIdentity::signed_out()))
        .with_policy_fn(|req| Ok((!req.actor().is_anonymous()).into()));

    let mut criteria = Criteria::new();
    let outcome = interceptor.call().before_find(&mut criteria).unwrap();

    assert_eq!(outcome, ReadOutcome::Denied);
}

#[test]
fn policy_failure_propagates() {
    let interceptor = with_identity(RestrictionConfig::default())
        .with_policy_fn(|_req| Err(PolicyError::misconfigured("no owner column")));

    let mut criteria = Criteria::new();
    let err = interceptor.call().before_find(&mut criteria).unwrap_err();

    assert!(matches!(
        err,
        RestrictionError::Policy {
            action: Action::Find,
            source: PolicyError::Misconfigured(_),
        }
    ));
    assert!(criteria.is_unrestricted());
}

#[test]
fn default_decision_applies_without_policy() {
    let allow = with_identity(RestrictionConfig::default());
    let mut criteria = Criteria::new();
    assert_eq!(
        allow.call().before_find(&mut criteria).unwrap(),
        ReadOutcome::Allowed
    );

    let deny = with_identity(RestrictionConfig {
        default_decision: DefaultDecision::Deny,
        ..RestrictionConfig::default()
    });
    let mut criteria = Criteria::new();
    assert_eq!(
        deny.call().before_find(&mut criteria).unwrap(),
        ReadOutcome::Denied
    );

    let mut event = WriteEvent::save();
    deny.call().before_save(&doc(1), &mut event).unwrap();
    assert!(!event.is_valid());
}

// ── write path ──────────────────────────────────────────────────────────

#[test]
fn denied_write_vetoes_the_event() {
    let (policy, _) = Fixed::new(PolicyResult::Deny);
    let interceptor = with_identity(RestrictionConfig::default()).with_policy(policy);

    let mut event = WriteEvent::save();
    interceptor.call().before_save(&doc(1), &mut event).unwrap();

    assert!(!event.is_valid());
}

#[test]
fn unavailable_policy_fails_the_write() {
    let interceptor = with_identity(RestrictionConfig::default())
        .with_policy_fn(|_req| Err(PolicyError::unavailable("role service down")));

    let mut event = WriteEvent::save();
    let err = interceptor.call().before_save(&doc(1), &mut event).unwrap_err();

    assert!(matches!(
        err,
        RestrictionError::Policy {
            action: Action::Save,
            source: PolicyError::Unavailable(_),
        }
    ));
    assert!(event.is_valid());
}

#[test]
fn narrowed_update_must_hold_before_and_after() {
    let interceptor = with_identity(RestrictionConfig::default())
        .with_policy_fn(|_req| Ok(Condition::eq("owner_id", 5).into()));

    let mut own = WriteEvent::save();
    interceptor.call().before_update(&doc(5), &doc(5), &mut own).unwrap();
    assert!(own.is_valid());

    let mut take_over = WriteEvent::save();
    interceptor
        .call()
        .before_update(&doc(6), &doc(5), &mut take_over)
        .unwrap();
    assert!(!take_over.is_valid());

    let mut give_away = WriteEvent::save();
    interceptor
        .call()
        .before_update(&doc(5), &doc(6), &mut give_away)
        .unwrap();
    assert!(!give_away.is_valid());
}

#[test]
fn forced_save_skips_the_write_policy() {
    let (policy, calls) = Fixed::new(PolicyResult::Deny);
    let interceptor = with_identity(RestrictionConfig::default()).with_policy(policy);

    let mut event = WriteEvent::save();
    interceptor.force().before_save(&doc(1), &mut event).unwrap();

    assert!(event.is_valid());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn writeable_checks_with_restriction_disabled() {
    let (policy, calls) = Fixed::new(PolicyResult::Deny);
    let interceptor = with_identity(RestrictionConfig::opt_in()).with_policy(policy);

    let mut unchecked = WriteEvent::delete();
    interceptor.call().before_delete(&doc(1), &mut unchecked).unwrap();
    assert!(unchecked.is_valid());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let mut checked = WriteEvent::delete();
    interceptor
        .writeable()
        .before_delete(&doc(1), &mut checked)
        .unwrap();
    assert!(!checked.is_valid());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn writeable_wins_over_force() {
    let (policy, calls) = Fixed::new(PolicyResult::Deny);
    let interceptor = with_identity(RestrictionConfig::default()).with_policy(policy);

    let mut event = WriteEvent::save();
    interceptor
        .force()
        .writeable()
        .before_save(&doc(1), &mut event)
        .unwrap();

    assert!(!event.is_valid());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn narrowed_write_checks_the_record() {
    let interceptor = with_identity(RestrictionConfig::default())
        .with_policy_fn(|_req| Ok(Condition::eq("owner_id", 5).into()));

    let mut own = WriteEvent::save();
    interceptor.call().before_save(&doc(5), &mut own).unwrap();
    assert!(own.is_valid());

    let mut foreign = WriteEvent::save();
    interceptor.call().before_save(&doc(6), &mut foreign).unwrap();
    assert!(!foreign.is_valid());
}

#[test]
fn narrowed_write_on_unknown_property_is_an_error() {
    let interceptor = with_identity(RestrictionConfig::default())
        .with_policy_fn(|_req| Ok(Condition::eq("team_id", 5).into()));

    let mut event = WriteEvent::delete();
    let err = interceptor
        .call()
        .before_delete(&doc(5), &mut event)
        .unwrap_err();

    assert!(matches!(err, RestrictionError::UnknownProperty { .. }));
}

#[test]
fn policy_sees_the_record_and_action() {
    let interceptor = with_identity(RestrictionConfig::default()).with_policy_fn(|req| {
        let allowed = match (req.action(), req.record()) {
            (Action::Save, Some(d)) => d.title != "locked",
            (Action::Delete, Some(_)) => false,
            (_, None) => true,
            _ => return Err(PolicyError::misconfigured("unexpected request")),
        };
        Ok(allowed.into())
    });

    let mut save = WriteEvent::save();
    interceptor.call().before_save(&doc(1), &mut save).unwrap();
    assert!(save.is_valid());

    let locked = Document {
        owner_id: 1,
        title: "locked",
    };
    let mut save_locked = WriteEvent::save();
    interceptor.call().before_save(&locked, &mut save_locked).unwrap();
    assert!(!save_locked.is_valid());

    let mut delete = WriteEvent::delete();
    interceptor.call().before_delete(&doc(1), &mut delete).unwrap();
    assert!(!delete.is_valid());
}

// ── owner hooks ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct Invoice {
    approved: bool,
}

impl RecordProperties for Invoice {
    fn property(&self, name: &str) -> PropertyLookup {
        match name {
            "approved" => PropertyLookup::Value(self.approved.into()),
            _ => PropertyLookup::Unknown,
        }
    }
}

impl Authorizable for Invoice {
    fn before_read(actor: &SecurityContext) -> Result<PolicyResult, PolicyError> {
        if actor.has_role("accountant") {
            Ok(PolicyResult::Allow)
        } else {
            Ok(Condition::eq("approved", true).into())
        }
    }

    fn before_write(
        &self,
        actor: &SecurityContext,
        _action: Action,
    ) -> Result<PolicyResult, PolicyError> {
        Ok((actor.has_role("accountant") && !self.approved).into())
    }
}

#[test]
fn owner_hooks_are_used_when_no_policy_is_set() {
    let clerk = SecurityContext::builder().subject_id(Uuid::new_v4()).build();
    let interceptor = AccessInterceptor::<Invoice>::new(RestrictionConfig::default())
        .with_identity(Arc::new(StaticIdentity::new(clerk)))
        .with_owner_hooks();

    let mut criteria = Criteria::new();
    interceptor.call().before_find(&mut criteria).unwrap();
    assert_eq!(criteria.to_string(), "approved = true");

    let mut event = WriteEvent::save();
    interceptor
        .call()
        .before_save(&Invoice { approved: false }, &mut event)
        .unwrap();
    assert!(!event.is_valid());
}

#[test]
fn configured_policy_takes_precedence_over_owner_hooks() {
    let accountant = SecurityContext::builder().role("accountant").build();
    let interceptor = AccessInterceptor::<Invoice>::new(RestrictionConfig::default())
        .with_identity(Arc::new(StaticIdentity::new(accountant)))
        .with_owner_hooks()
        .with_policy_fn(|_req| Ok(PolicyResult::Deny));

    let mut criteria = Criteria::new();
    let outcome = interceptor.call().before_find(&mut criteria).unwrap();

    assert_eq!(outcome, ReadOutcome::Denied);
}

#[test]
fn custom_criteria_builders_are_supported() {
    #[derive(Default)]
    struct SqlWhere(Vec<String>);

    impl CriteriaBuilder for SqlWhere {
        fn add_unsatisfiable_condition(&mut self) {
            self.0.push("0".to_owned());
        }

        fn merge_condition(&mut self, condition: Condition) {
            self.0.push(condition.to_string());
        }
    }

    let interceptor = with_identity(RestrictionConfig::default())
        .with_policy_fn(|_req| Ok(Condition::eq("owner_id", 5).into()));

    let mut sql = SqlWhere::default();
    interceptor.call().before_find(&mut sql).unwrap();

    assert_eq!(sql.0, ["owner_id = 5"]);
}
