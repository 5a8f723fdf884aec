#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Row-level access interceptor.
//!
//! An [`AccessInterceptor`] is attached to an owner type and consulted by
//! the owner's data-access pipeline:
//!
//! - before a find or count, it narrows the query [`Criteria`] or makes it
//!   unsatisfiable;
//! - before a save or delete, it may veto the write through [`WriteEvent`].
//!
//! Decisions come from one [`AccessPolicy`] (or the owner's own
//! [`Authorizable`] hooks) returning a [`PolicyResult`].
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use rowguard_pep::{AccessInterceptor, PolicyResult, RestrictionConfig};
//! use rowguard_security::{Condition, Criteria, SecurityContext, StaticIdentity};
//!
//! struct Post;
//!
//! let interceptor = AccessInterceptor::<Post>::new(RestrictionConfig::default())
//!     .with_identity(Arc::new(StaticIdentity::new(SecurityContext::anonymous())))
//!     .with_policy_fn(|_req| Ok(PolicyResult::Narrow(Condition::eq("published", true))));
//!
//! let mut criteria = Criteria::new();
//! interceptor.call().before_find(&mut criteria).unwrap();
//! assert_eq!(criteria.to_string(), "published = true");
//!
//! // A bypass covers exactly one operation.
//! let mut criteria = Criteria::new();
//! interceptor.unrestricted().before_find(&mut criteria).unwrap();
//! assert!(criteria.is_unrestricted());
//! ```
//!
//! [`Criteria`]: rowguard_security::Criteria

pub mod config;
pub mod error;
pub mod event;
pub mod interceptor;
pub mod policy;
pub mod record;

pub use config::{DefaultDecision, RestrictionConfig};
pub use error::{PolicyError, RestrictionError};
pub use event::WriteEvent;
pub use interceptor::{AccessCall, AccessInterceptor, CallMode, ReadOutcome};
pub use policy::{AccessPolicy, AccessRequest, Action, Authorizable, PolicyResult};
pub use record::{PropertyLookup, RecordProperties};
