use rowguard_pep::{
    AccessCall, AccessInterceptor, Action, RecordProperties, RestrictionError, WriteEvent,
};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait,
    DeleteResult, EntityTrait, IntoActiveModel, Iterable, PrimaryKeyToColumn, QueryFilter,
};

use crate::entity_traits::RestrictableEntity;
use crate::error::DbAccessError;

/// Result of a restricted write.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T> {
    /// The write reached the database.
    Committed(T),
    /// The access check rejected the write; nothing was sent to the database.
    Vetoed,
}

impl<T> WriteOutcome<T> {
    #[must_use]
    pub fn is_vetoed(&self) -> bool {
        matches!(self, Self::Vetoed)
    }

    /// The committed value, `None` if vetoed.
    #[must_use]
    pub fn committed(self) -> Option<T> {
        match self {
            Self::Committed(value) => Some(value),
            Self::Vetoed => None,
        }
    }
}

type EntityOf<A> = <A as ActiveModelTrait>::Entity;
type ModelOf<A> = <EntityOf<A> as EntityTrait>::Model;

/// Vetoable insert/update/delete of `ActiveModel`s of type `A`.
///
/// Each write creates a [`WriteEvent`], runs the interceptor's save or
/// delete hook and only issues the statement if the event is still valid.
///
/// Updates and deletes are checked against the stored row, loaded by the
/// primary key of `am`. An update is additionally checked against the row
/// as it will be stored, so a narrowed policy can neither reach a row
/// outside its condition nor move a row out of it. A missing row is vetoed.
///
/// ```rust,ignore
/// use rowguard_db::RestrictedWriteExt;
///
/// match interceptor.write().update(am, &db).await? {
///     WriteOutcome::Committed(post) => Ok(post),
///     WriteOutcome::Vetoed => Err(DomainError::Forbidden),
/// }
///
/// // Maintenance job: skip the write policy for this one call.
/// interceptor.write().force().delete(am, &db).await?;
/// ```
#[must_use = "a restricted write does nothing until executed"]
#[derive(Debug)]
pub struct RestrictedWrite<'i, A> {
    call: AccessCall<'i, A>,
}

impl<'i, A> From<AccessCall<'i, A>> for RestrictedWrite<'i, A> {
    fn from(call: AccessCall<'i, A>) -> Self {
        Self { call }
    }
}

/// Extension trait starting a [`RestrictedWrite`] from an interceptor.
pub trait RestrictedWriteExt<A> {
    fn write(&self) -> RestrictedWrite<'_, A>;
}

impl<A> RestrictedWriteExt<A> for AccessInterceptor<A> {
    fn write(&self) -> RestrictedWrite<'_, A> {
        self.call().into()
    }
}

impl<A> RestrictedWrite<'_, A>
where
    A: ActiveModelTrait + ActiveModelBehavior + RecordProperties + Send,
    EntityOf<A>: RestrictableEntity,
    ModelOf<A>: IntoActiveModel<A>,
{
    /// Skip the write policy for this write.
    pub fn force(mut self) -> Self {
        self.call = self.call.force();
        self
    }

    /// Check this write even with automatic restriction disabled.
    pub fn writeable(mut self) -> Self {
        self.call = self.call.writeable();
        self
    }

    /// Insert `am` unless the save hook vetoes it.
    ///
    /// # Errors
    ///
    /// Returns [`DbAccessError::Restriction`] if the policy fails,
    /// [`DbAccessError::Db`] if the insert fails.
    pub async fn insert<C>(self, am: A, db: &C) -> Result<WriteOutcome<ModelOf<A>>, DbAccessError>
    where
        C: ConnectionTrait,
    {
        if self.vetoed(&am, WriteEvent::save())? {
            return Ok(WriteOutcome::Vetoed);
        }
        Ok(WriteOutcome::Committed(am.insert(db).await?))
    }

    /// Update `am` unless the save hook vetoes it.
    ///
    /// # Errors
    ///
    /// Returns [`DbAccessError::Restriction`] if the policy fails,
    /// [`DbAccessError::Db`] if loading the stored row or the update fails.
    pub async fn update<C>(self, am: A, db: &C) -> Result<WriteOutcome<ModelOf<A>>, DbAccessError>
    where
        C: ConnectionTrait,
    {
        if !self.checks_stored_row() {
            if self.vetoed(&am, WriteEvent::save())? {
                return Ok(WriteOutcome::Vetoed);
            }
            return Ok(WriteOutcome::Committed(am.update(db).await?));
        }

        let Some(stored) = load_stored(&am, db).await? else {
            tracing::debug!(action = %Action::Save, "target row not found, write not committed");
            return Ok(WriteOutcome::Vetoed);
        };
        let updated = apply_changes(&stored, &am);
        let mut event = WriteEvent::save();
        self.call.before_update(&stored, &updated, &mut event)?;
        if rejected(&event) {
            return Ok(WriteOutcome::Vetoed);
        }
        Ok(WriteOutcome::Committed(am.update(db).await?))
    }

    /// Delete `am` unless the delete hook vetoes it.
    ///
    /// # Errors
    ///
    /// Returns [`DbAccessError::Restriction`] if the policy fails,
    /// [`DbAccessError::Db`] if loading the stored row or the delete fails.
    pub async fn delete<C>(self, am: A, db: &C) -> Result<WriteOutcome<DeleteResult>, DbAccessError>
    where
        C: ConnectionTrait,
    {
        if !self.checks_stored_row() {
            if self.vetoed(&am, WriteEvent::delete())? {
                return Ok(WriteOutcome::Vetoed);
            }
            return Ok(WriteOutcome::Committed(am.delete(db).await?));
        }

        let Some(stored) = load_stored(&am, db).await? else {
            tracing::debug!(action = %Action::Delete, "target row not found, write not committed");
            return Ok(WriteOutcome::Vetoed);
        };
        let mut event = WriteEvent::delete();
        self.call.before_delete(&stored, &mut event)?;
        if rejected(&event) {
            return Ok(WriteOutcome::Vetoed);
        }
        Ok(WriteOutcome::Committed(am.delete(db).await?))
    }

    fn checks_stored_row(&self) -> bool {
        !<EntityOf<A> as RestrictableEntity>::IS_UNRESTRICTED && self.call.checks_writes()
    }

    fn vetoed(self, am: &A, mut event: WriteEvent) -> Result<bool, RestrictionError> {
        if <EntityOf<A> as RestrictableEntity>::IS_UNRESTRICTED {
            return Ok(false);
        }
        if event.action() == Action::Delete {
            self.call.before_delete(am, &mut event)?;
        } else {
            self.call.before_save(am, &mut event)?;
        }
        Ok(rejected(&event))
    }
}

fn rejected(event: &WriteEvent) -> bool {
    if !event.is_valid() {
        tracing::debug!(action = %event.action(), "write not committed");
    }
    !event.is_valid()
}

/// Filter on the primary key held by `am`, `None` if any key column is
/// `NotSet`.
fn primary_key_condition<A>(am: &A) -> Option<Condition>
where
    A: ActiveModelTrait,
{
    let mut cond = Condition::all();
    for key in <EntityOf<A> as EntityTrait>::PrimaryKey::iter() {
        let col = key.into_column();
        match am.get(col) {
            ActiveValue::Set(v) | ActiveValue::Unchanged(v) => cond = cond.add(col.eq(v)),
            ActiveValue::NotSet => return None,
        }
    }
    Some(cond)
}

async fn load_stored<A, C>(am: &A, db: &C) -> Result<Option<A>, DbAccessError>
where
    A: ActiveModelTrait,
    ModelOf<A>: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    let Some(key) = primary_key_condition(am) else {
        return Ok(None);
    };
    let model = <EntityOf<A> as EntityTrait>::find().filter(key).one(db).await?;
    Ok(model.map(IntoActiveModel::into_active_model))
}

/// `stored` with every column `Set` in `changes` overwritten.
fn apply_changes<A>(stored: &A, changes: &A) -> A
where
    A: ActiveModelTrait,
{
    let mut updated = stored.clone();
    for col in <EntityOf<A> as EntityTrait>::Column::iter() {
        if let ActiveValue::Set(v) = changes.get(col) {
            updated.set(col, v);
        }
    }
    updated
}
