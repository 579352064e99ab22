use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::unit::Inclusions;

/// Bundled tour offering.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub inclusions: Inclusions,
    pub base_rate: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::package_discount::Entity")]
    PackageDiscount,
}

impl Related<super::package_discount::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackageDiscount.def()
    }
}

impl Related<super::discount::Entity> for Entity {
    fn to() -> RelationDef {
        super::package_discount::Relation::Discount.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::package_discount::Relation::Package.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
