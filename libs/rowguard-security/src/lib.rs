#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Data model shared by the rowguard interceptor and its ORM bindings.
//!
//! - [`Condition`] / [`Filter`] / [`PropertyValue`]: typed row predicates
//! - [`Criteria`] / [`CriteriaBuilder`]: the per-query filter accumulator
//! - [`SecurityContext`] / [`IdentityProvider`]: the acting principal

pub mod condition;
pub mod context;
pub mod criteria;
pub mod identity;

pub use condition::{Condition, Filter, PropertyValue};
pub use context::{SecurityContext, SecurityContextBuilder};
pub use criteria::{Criteria, CriteriaBuilder};
pub use identity::{IdentityProvider, StaticIdentity};
