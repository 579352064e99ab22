use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DiscountType {
    #[sea_orm(string_value = "PERCENTAGE")]
    #[serde(rename = "PERCENTAGE")]
    Percentage,
    #[sea_orm(string_value = "FIX_VALUE")]
    #[serde(rename = "FIX_VALUE")]
    FixValue,
}

/// Promotion record attachable to units and packages.
///
/// `start_date`/`end_date` are calendar days; a missing bound leaves the
/// window open on that side.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::unit_discount::Entity")]
    UnitDiscount,
    #[sea_orm(has_many = "super::package_discount::Entity")]
    PackageDiscount,
}

impl Related<super::unit_discount::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UnitDiscount.def()
    }
}

impl Related<super::package_discount::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackageDiscount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Validity window of this discount.
    pub fn validity(&self) -> Validity {
        Validity {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Inclusive `[start_date, end_date]` window; either bound may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Validity {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Validity {
    /// Whether `day` falls inside the window. Both bounds are inclusive.
    pub fn contains(&self, day: NaiveDate) -> bool {
        let after_start = self.start_date.map_or(true, |start| start <= day);
        let before_end = self.end_date.map_or(true, |end| day <= end);
        after_start && before_end
    }

    /// A window whose start lies after its end can never be active.
    pub fn is_ordered(&self) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn unbounded_window_contains_everything() {
        let validity = Validity::default();
        assert!(validity.contains(day("1970-01-01")));
        assert!(validity.contains(day("2999-12-31")));
    }

    #[test]
    fn bounds_are_inclusive() {
        let validity = Validity {
            start_date: Some(day("2026-01-01")),
            end_date: Some(day("2026-01-31")),
        };
        assert!(validity.contains(day("2026-01-01")));
        assert!(validity.contains(day("2026-01-31")));
        assert!(!validity.contains(day("2025-12-31")));
        assert!(!validity.contains(day("2026-02-01")));
    }

    #[test]
    fn reversed_window_is_not_ordered() {
        let validity = Validity {
            start_date: Some(day("2026-02-01")),
            end_date: Some(day("2026-01-01")),
        };
        assert!(!validity.is_ordered());
        assert!(Validity {
            start_date: Some(day("2026-02-01")),
            end_date: None
        }
        .is_ordered());
    }
}
