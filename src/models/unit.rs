use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One line of "what's included" shown on a unit or package card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Inclusion {
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// JSON-backed list of inclusions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
#[serde(transparent)]
pub struct Inclusions(pub Vec<Inclusion>);

/// Rentable vehicle.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "units")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub capacity: i32,
    /// Daily rate in the smallest currency unit.
    pub base_rate: i64,
    pub description: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub inclusions: Inclusions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::unit_discount::Entity")]
    UnitDiscount,
}

impl Related<super::unit_discount::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UnitDiscount.def()
    }
}

impl Related<super::discount::Entity> for Entity {
    fn to() -> RelationDef {
        super::unit_discount::Relation::Discount.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::unit_discount::Relation::Unit.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
