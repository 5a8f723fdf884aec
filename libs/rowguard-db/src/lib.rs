#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `SeaORM` binding for the rowguard access interceptor.
//!
//! - [`RestrictableEntity`] maps access-condition properties to columns.
//! - [`RestrictedSelect`] fires the read hooks and compiles the resulting
//!   criteria into the query's `WHERE` clause.
//! - [`RestrictedWrite`] fires the write hooks and never issues a vetoed
//!   statement.
//!
//! The interceptor is attached to the entity's `ActiveModel`: read policies
//! see no record, write policies see the `ActiveModel` being written.

pub mod cond;
pub mod db_ops;
pub mod entity_traits;
pub mod error;
pub mod select;

pub use cond::build_criteria_condition;
pub use db_ops::{RestrictedWrite, RestrictedWriteExt, WriteOutcome};
pub use entity_traits::{RestrictableEntity, active_model_property};
pub use error::DbAccessError;
pub use select::{RestrictedEntityExt, RestrictedSelect};
