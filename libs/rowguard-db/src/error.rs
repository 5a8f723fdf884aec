use rowguard_pep::RestrictionError;
use thiserror::Error;

/// Errors from restricted database operations.
///
/// A denied read is an empty result and a vetoed write is
/// [`WriteOutcome::Vetoed`](crate::WriteOutcome::Vetoed); neither is an
/// error.
#[derive(Debug, Error)]
pub enum DbAccessError {
    #[error(transparent)]
    Restriction(#[from] RestrictionError),

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}
