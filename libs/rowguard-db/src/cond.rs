use rowguard_pep::RestrictionError;
use rowguard_security::{Criteria, Filter, PropertyValue};
use sea_orm::{ColumnTrait, Condition, EntityTrait, sea_query::Expr};

use crate::entity_traits::RestrictableEntity;

fn property_value_to_sea_value(v: &PropertyValue) -> sea_orm::Value {
    match v {
        PropertyValue::Uuid(u) => sea_orm::Value::from(*u),
        PropertyValue::String(s) => sea_orm::Value::from(s.clone()),
        PropertyValue::Int(n) => sea_orm::Value::from(*n),
        PropertyValue::Bool(b) => sea_orm::Value::from(*b),
    }
}

/// `WHERE false`
fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

/// Compiles query [`Criteria`] into a `SeaORM` condition on entity `E`.
///
/// | Criteria | SQL |
/// |----------|-----|
/// | unsatisfiable | `WHERE false` |
/// | unrestricted | no filtering |
/// | conditions | AND of every filter of every condition |
///
/// # Errors
///
/// Returns [`RestrictionError::UnknownProperty`] if a filter names a
/// property `E` does not resolve.
pub fn build_criteria_condition<E>(criteria: &Criteria) -> Result<Condition, RestrictionError>
where
    E: RestrictableEntity,
    E::Column: ColumnTrait + Copy,
{
    if criteria.is_unsatisfiable() {
        return Ok(deny_all());
    }

    let mut and_cond = Condition::all();
    for condition in criteria.conditions() {
        for filter in condition.filters() {
            let col = E::resolve_property(filter.property())
                .ok_or_else(|| RestrictionError::unknown_property(filter.property()))?;
            and_cond = match filter {
                Filter::Eq { value, .. } => {
                    and_cond.add(Expr::col(col).eq(property_value_to_sea_value(value)))
                }
                Filter::In { values, .. } if values.is_empty() => return Ok(deny_all()),
                Filter::In { values, .. } => and_cond.add(
                    Expr::col(col).is_in(values.iter().map(property_value_to_sea_value)),
                ),
            };
        }
    }
    Ok(and_cond)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use rowguard_security::{Condition as Access, CriteriaBuilder};
    use sea_orm::{DbBackend, QueryFilter, QueryTrait};

    mod post {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "post")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub owner_id: i64,
            pub status: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    impl RestrictableEntity for post::Entity {
        fn resolve_property(property: &str) -> Option<post::Column> {
            match property {
                "owner_id" => Some(post::Column::OwnerId),
                "status" => Some(post::Column::Status),
                _ => None,
            }
        }
    }

    fn sql(criteria: &Criteria) -> String {
        let cond = build_criteria_condition::<post::Entity>(criteria).unwrap();
        post::Entity::find()
            .filter(cond)
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn unrestricted_criteria_adds_no_where_clause() {
        assert!(!sql(&Criteria::new()).contains("WHERE"));
    }

    #[test]
    fn unsatisfiable_criteria_is_deny_all() {
        let mut criteria = Criteria::with_condition(Access::eq("owner_id", 5));
        criteria.add_unsatisfiable_condition();

        let cond = build_criteria_condition::<post::Entity>(&criteria).unwrap();
        let cond_str = format!("{cond:?}");
        assert!(
            cond_str.contains("Value(Bool(Some(false)))"),
            "Expected deny-all, got: {cond_str}"
        );
    }

    #[test]
    fn conditions_are_anded() {
        let mut criteria = Criteria::with_condition(Access::eq("owner_id", 5));
        criteria.merge_condition(Access::is_in("status", ["draft", "live"]));

        let sql = sql(&criteria);
        assert!(sql.contains(r#""owner_id" = 5"#), "{sql}");
        assert!(sql.contains(r#""status" IN ('draft', 'live')"#), "{sql}");
        assert!(sql.contains(" AND "), "{sql}");
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let criteria = Criteria::with_condition(Access::is_in("owner_id", Vec::<i64>::new()));
        let cond = build_criteria_condition::<post::Entity>(&criteria).unwrap();
        assert!(format!("{cond:?}").contains("Value(Bool(Some(false)))"));
    }

    #[test]
    fn unknown_property_is_an_error() {
        let criteria = Criteria::with_condition(Access::eq("department_id", 1));
        let err = build_criteria_condition::<post::Entity>(&criteria).unwrap_err();
        assert!(
            matches!(err, RestrictionError::UnknownProperty { property } if property == "department_id")
        );
    }
}
