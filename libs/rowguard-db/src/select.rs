use rowguard_pep::{AccessCall, AccessInterceptor, RestrictionError};
use rowguard_security::{Condition as AccessCondition, Criteria, CriteriaBuilder};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::cond::build_criteria_condition;
use crate::entity_traits::RestrictableEntity;
use crate::error::DbAccessError;

/// A `SeaORM` select guarded by an [`AccessInterceptor`].
///
/// The query carries its own access [`Criteria`] and exactly one
/// [`AccessCall`]. Executing it fires the interceptor's read hook, compiles
/// the resulting criteria into SQL and runs the query.
///
/// # Example
/// ```rust,ignore
/// use rowguard_db::RestrictedEntityExt;
///
/// let posts = post::Entity::find()
///     .restricted(&interceptor)
///     .order_by(post::Column::Id, Order::Asc)
///     .all(&db)
///     .await?;
///
/// // Administrative listing, this query only.
/// let all = post::Entity::find()
///     .restricted(&interceptor)
///     .unrestricted()
///     .count(&db)
///     .await?;
/// ```
#[must_use = "a restricted select does nothing until executed"]
#[derive(Debug)]
pub struct RestrictedSelect<'i, E: EntityTrait> {
    inner: sea_orm::Select<E>,
    criteria: Criteria,
    call: AccessCall<'i, E::ActiveModel>,
}

/// Extension trait turning a `SeaORM` `Select` into a [`RestrictedSelect`].
pub trait RestrictedEntityExt<E: EntityTrait>: Sized {
    /// Guard this select with `interceptor`.
    fn restricted(self, interceptor: &AccessInterceptor<E::ActiveModel>) -> RestrictedSelect<'_, E>;
}

impl<E> RestrictedEntityExt<E> for sea_orm::Select<E>
where
    E: EntityTrait,
{
    fn restricted(
        self,
        interceptor: &AccessInterceptor<E::ActiveModel>,
    ) -> RestrictedSelect<'_, E> {
        RestrictedSelect {
            inner: self,
            criteria: Criteria::new(),
            call: interceptor.call(),
        }
    }
}

impl<E> RestrictedSelect<'_, E>
where
    E: RestrictableEntity,
    E::Column: ColumnTrait + Copy,
{
    /// Skip access restriction for this query.
    pub fn unrestricted(mut self) -> Self {
        self.call = self.call.unrestricted();
        self
    }

    /// Alias of [`unrestricted`](Self::unrestricted).
    pub fn force(self) -> Self {
        self.unrestricted()
    }

    /// Apply the read policy now, even with automatic restriction disabled.
    /// Unrestricted entities are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::Policy`] if the policy fails.
    pub fn readable(mut self) -> Result<Self, RestrictionError> {
        if !E::IS_UNRESTRICTED {
            self.call.interceptor().readable(&mut self.criteria)?;
        }
        Ok(self)
    }

    /// AND an access condition into this query's criteria.
    ///
    /// Unlike [`filter`](Self::filter), the condition is visible to the
    /// interceptor and is resolved through [`RestrictableEntity`].
    pub fn where_condition(mut self, condition: AccessCondition) -> Self {
        self.criteria.merge_condition(condition);
        self
    }

    /// Add a plain `SeaORM` filter.
    pub fn filter(mut self, filter: sea_orm::Condition) -> Self {
        self.inner = QueryFilter::filter(self.inner, filter);
        self
    }

    pub fn order_by<C>(mut self, col: C, order: sea_orm::Order) -> Self
    where
        C: sea_orm::IntoSimpleExpr,
    {
        self.inner = QueryOrder::order_by(self.inner, col, order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.inner = QuerySelect::limit(self.inner, limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.inner = QuerySelect::offset(self.inner, offset);
        self
    }

    /// The access criteria accumulated so far.
    #[must_use]
    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Execute the query and return all matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbAccessError::Restriction`] if the policy fails or names
    /// an unknown property, [`DbAccessError::Db`] if the query fails.
    pub async fn all<C>(self, db: &C) -> Result<Vec<E::Model>, DbAccessError>
    where
        C: ConnectionTrait,
    {
        let query = self.into_query(Hook::Find)?;
        Ok(query.all(db).await?)
    }

    /// Execute the query and return at most one row.
    ///
    /// # Errors
    ///
    /// Returns [`DbAccessError::Restriction`] if the policy fails or names
    /// an unknown property, [`DbAccessError::Db`] if the query fails.
    pub async fn one<C>(self, db: &C) -> Result<Option<E::Model>, DbAccessError>
    where
        C: ConnectionTrait,
    {
        let query = self.into_query(Hook::Find)?;
        Ok(query.one(db).await?)
    }

    /// Execute the query and return the number of matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbAccessError::Restriction`] if the policy fails or names
    /// an unknown property, [`DbAccessError::Db`] if the query fails.
    pub async fn count<C>(self, db: &C) -> Result<u64, DbAccessError>
    where
        C: ConnectionTrait,
        E::Model: Send + Sync,
    {
        let query = self.into_query(Hook::Count)?;
        Ok(query.count(db).await?)
    }

    fn into_query(self, hook: Hook) -> Result<sea_orm::Select<E>, RestrictionError> {
        let Self {
            inner,
            mut criteria,
            call,
        } = self;

        if E::IS_UNRESTRICTED {
            tracing::debug!(
                entity = std::any::type_name::<E>(),
                "unrestricted entity, read hooks skipped"
            );
        } else {
            let outcome = match hook {
                Hook::Find => call.before_find(&mut criteria)?,
                Hook::Count => call.before_count(&mut criteria)?,
            };
            tracing::debug!(?outcome, %criteria, "read criteria resolved");
        }

        let cond = build_criteria_condition::<E>(&criteria)?;
        Ok(QueryFilter::filter(inner, cond))
    }
}

#[derive(Clone, Copy)]
enum Hook {
    Find,
    Count,
}
