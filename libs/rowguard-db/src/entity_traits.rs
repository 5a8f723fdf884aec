use rowguard_pep::PropertyLookup;
use rowguard_security::PropertyValue;
use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait, Value};

/// An entity whose rows can be restricted by an access interceptor.
///
/// Maps the property names used in access conditions to the entity's
/// columns. A condition naming a property this mapping does not know is an
/// error, never silently ignored.
///
/// # Example
/// ```rust,ignore
/// impl RestrictableEntity for post::Entity {
///     fn resolve_property(property: &str) -> Option<post::Column> {
///         match property {
///             "owner_id" => Some(post::Column::OwnerId),
///             "published" => Some(post::Column::Published),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait RestrictableEntity: EntityTrait {
    /// Global tables (lookups, reference data) set this to skip the
    /// interceptor entirely.
    const IS_UNRESTRICTED: bool = false;

    fn resolve_property(property: &str) -> Option<Self::Column>;
}

/// Looks up an authorization property on an `ActiveModel`.
///
/// Lets an entity's `ActiveModel` implement
/// [`RecordProperties`](rowguard_pep::RecordProperties) in one line:
///
/// ```rust,ignore
/// impl RecordProperties for post::ActiveModel {
///     fn property(&self, name: &str) -> PropertyLookup {
///         active_model_property(self, name)
///     }
/// }
/// ```
///
/// Columns left `NotSet` report [`PropertyLookup::NotSet`]. Columns holding
/// a type that can not be compared with a condition value report
/// [`PropertyLookup::Unknown`].
#[must_use]
pub fn active_model_property<A>(am: &A, name: &str) -> PropertyLookup
where
    A: ActiveModelTrait,
    A::Entity: RestrictableEntity,
{
    let Some(col) = <A::Entity as RestrictableEntity>::resolve_property(name) else {
        return PropertyLookup::Unknown;
    };
    match am.get(col) {
        ActiveValue::NotSet => PropertyLookup::NotSet,
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => sea_value_to_property(&v),
    }
}

fn sea_value_to_property(v: &Value) -> PropertyLookup {
    let value = match v {
        Value::Uuid(Some(u)) => PropertyValue::Uuid(**u),
        Value::String(Some(s)) => PropertyValue::String(s.as_str().to_owned()),
        Value::BigInt(Some(n)) => PropertyValue::Int(*n),
        Value::Int(Some(n)) => PropertyValue::Int(i64::from(*n)),
        Value::SmallInt(Some(n)) => PropertyValue::Int(i64::from(*n)),
        Value::TinyInt(Some(n)) => PropertyValue::Int(i64::from(*n)),
        Value::Unsigned(Some(n)) => PropertyValue::Int(i64::from(*n)),
        Value::SmallUnsigned(Some(n)) => PropertyValue::Int(i64::from(*n)),
        Value::TinyUnsigned(Some(n)) => PropertyValue::Int(i64::from(*n)),
        Value::BigUnsigned(Some(n)) => match i64::try_from(*n) {
            Ok(n) => PropertyValue::Int(n),
            Err(_) => return PropertyLookup::Unknown,
        },
        Value::Bool(Some(b)) => PropertyValue::Bool(*b),
        Value::Uuid(None)
        | Value::String(None)
        | Value::BigInt(None)
        | Value::Int(None)
        | Value::SmallInt(None)
        | Value::TinyInt(None)
        | Value::Unsigned(None)
        | Value::SmallUnsigned(None)
        | Value::TinyUnsigned(None)
        | Value::BigUnsigned(None)
        | Value::Bool(None) => return PropertyLookup::Null,
        _ => return PropertyLookup::Unknown,
    };
    PropertyLookup::Value(value)
}
