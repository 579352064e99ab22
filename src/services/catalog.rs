//! Units and packages, served with their discounts and a read-time price quote.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    errors::ServiceError,
    models::{discount, package, package_discount, unit, unit_discount, Inclusion, Inclusions},
    services::pricing::{self, AppliedDiscount, PriceQuote},
};

fn validate_model_year(year: i32) -> Result<(), ValidationError> {
    let latest = Utc::now().year() + 1;
    if (1900..=latest).contains(&year) {
        Ok(())
    } else {
        Err(ValidationError::new("year_out_of_range"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnitView {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub capacity: i32,
    pub base_rate: i64,
    pub description: Option<String>,
    pub inclusions: Vec<Inclusion>,
    /// Every discount attached to the unit, active or not
    pub discounts: Vec<AppliedDiscount>,
    pub pricing: PriceQuote,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnitView {
    fn new(model: unit::Model, discounts: &[discount::Model], today: NaiveDate) -> Self {
        Self {
            pricing: pricing::quote(model.base_rate, discounts, today),
            discounts: discounts.iter().map(AppliedDiscount::from).collect(),
            id: model.id,
            name: model.name,
            year: model.year,
            capacity: model.capacity,
            base_rate: model.base_rate,
            description: model.description,
            inclusions: model.inclusions.0,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PackageView {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub inclusions: Vec<Inclusion>,
    pub base_rate: i64,
    pub discounts: Vec<AppliedDiscount>,
    pub pricing: PriceQuote,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackageView {
    fn new(model: package::Model, discounts: &[discount::Model], today: NaiveDate) -> Self {
        Self {
            pricing: pricing::quote(model.base_rate, discounts, today),
            discounts: discounts.iter().map(AppliedDiscount::from).collect(),
            id: model.id,
            name: model.name,
            description: model.description,
            inclusions: model.inclusions.0,
            base_rate: model.base_rate,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Toyota Hiace Commuter",
    "year": 2023,
    "capacity": 14,
    "base_rate": 1200000,
    "description": "High-roof van with reclining seats",
    "inclusions": [{"item": "Driver"}, {"item": "Fuel", "description": "Within city limits"}]
}))]
pub struct CreateUnitRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(custom = "validate_model_year")]
    pub year: i32,
    #[validate(range(min = 1))]
    pub capacity: i32,
    #[validate(range(min = 0))]
    pub base_rate: i64,
    pub description: Option<String>,
    #[serde(default)]
    pub inclusions: Vec<Inclusion>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUnitRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(custom = "validate_model_year")]
    pub year: Option<i32>,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0))]
    pub base_rate: Option<i64>,
    pub description: Option<String>,
    pub inclusions: Option<Vec<Inclusion>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Kintamani Sunrise Tour",
    "description": "Full day tour with lunch",
    "base_rate": 750000,
    "inclusions": [{"item": "Lunch"}, {"item": "Entrance tickets"}]
}))]
pub struct CreatePackageRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub base_rate: i64,
    #[serde(default)]
    pub inclusions: Vec<Inclusion>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePackageRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub base_rate: Option<i64>,
    pub inclusions: Option<Vec<Inclusion>>,
}

/// Every discount linked to each of `unit_ids`, keyed by unit id.
async fn unit_discounts(
    db: &DatabaseConnection,
    unit_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<discount::Model>>, ServiceError> {
    let mut by_unit: HashMap<i32, Vec<discount::Model>> = HashMap::new();
    if unit_ids.is_empty() {
        return Ok(by_unit);
    }
    let rows = unit_discount::Entity::find()
        .filter(unit_discount::Column::UnitId.is_in(unit_ids))
        .order_by_asc(unit_discount::Column::DiscountId)
        .find_also_related(discount::Entity)
        .all(db)
        .await?;
    for (link, found) in rows {
        if let Some(d) = found {
            by_unit.entry(link.unit_id).or_default().push(d);
        }
    }
    Ok(by_unit)
}

async fn package_discounts(
    db: &DatabaseConnection,
    package_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<discount::Model>>, ServiceError> {
    let mut by_package: HashMap<i32, Vec<discount::Model>> = HashMap::new();
    if package_ids.is_empty() {
        return Ok(by_package);
    }
    let rows = package_discount::Entity::find()
        .filter(package_discount::Column::PackageId.is_in(package_ids))
        .order_by_asc(package_discount::Column::DiscountId)
        .find_also_related(discount::Entity)
        .all(db)
        .await?;
    for (link, found) in rows {
        if let Some(d) = found {
            by_package.entry(link.package_id).or_default().push(d);
        }
    }
    Ok(by_package)
}

fn unit_not_found(id: i32) -> ServiceError {
    ServiceError::NotFound(format!("Unit {} not found", id))
}

fn package_not_found(id: i32) -> ServiceError {
    ServiceError::NotFound(format!("Package {} not found", id))
}

/// Catalog service for rentable units and tour packages
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[instrument(skip(self))]
    pub async fn list_units(&self) -> Result<Vec<UnitView>, ServiceError> {
        let units = unit::Entity::find()
            .order_by_asc(unit::Column::Id)
            .all(&*self.db)
            .await?;
        let mut discounts =
            unit_discounts(&self.db, units.iter().map(|u| u.id).collect()).await?;
        let today = Self::today();

        Ok(units
            .into_iter()
            .map(|u| {
                let attached = discounts.remove(&u.id).unwrap_or_default();
                UnitView::new(u, &attached, today)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_unit(&self, id: i32) -> Result<UnitView, ServiceError> {
        let model = unit::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| unit_not_found(id))?;
        let attached = unit_discounts(&self.db, vec![id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(UnitView::new(model, &attached, Self::today()))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_unit(&self, request: CreateUnitRequest) -> Result<UnitView, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = unit::ActiveModel {
            name: Set(request.name.trim().to_string()),
            year: Set(request.year),
            capacity: Set(request.capacity),
            base_rate: Set(request.base_rate),
            description: Set(request.description),
            inclusions: Set(Inclusions(request.inclusions)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        counter!("catalog.units.created", 1);
        info!(unit_id = model.id, "unit created");
        Ok(UnitView::new(model, &[], Self::today()))
    }

    #[instrument(skip(self, request))]
    pub async fn update_unit(
        &self,
        id: i32,
        request: UpdateUnitRequest,
    ) -> Result<UnitView, ServiceError> {
        request.validate()?;

        let existing = unit::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| unit_not_found(id))?;

        let mut active: unit::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(year) = request.year {
            active.year = Set(year);
        }
        if let Some(capacity) = request.capacity {
            active.capacity = Set(capacity);
        }
        if let Some(base_rate) = request.base_rate {
            active.base_rate = Set(base_rate);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(inclusions) = request.inclusions {
            active.inclusions = Set(Inclusions(inclusions));
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        info!(unit_id = id, "unit updated");
        self.get_unit(id).await
    }

    /// Deletes a unit; its association rows cascade, discounts stay
    #[instrument(skip(self))]
    pub async fn delete_unit(&self, id: i32) -> Result<(), ServiceError> {
        let result = unit::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(unit_not_found(id));
        }
        info!(unit_id = id, "unit deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_packages(&self) -> Result<Vec<PackageView>, ServiceError> {
        let packages = package::Entity::find()
            .order_by_asc(package::Column::Id)
            .all(&*self.db)
            .await?;
        let mut discounts =
            package_discounts(&self.db, packages.iter().map(|p| p.id).collect()).await?;
        let today = Self::today();

        Ok(packages
            .into_iter()
            .map(|p| {
                let attached = discounts.remove(&p.id).unwrap_or_default();
                PackageView::new(p, &attached, today)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_package(&self, id: i32) -> Result<PackageView, ServiceError> {
        let model = package::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| package_not_found(id))?;
        let attached = package_discounts(&self.db, vec![id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(PackageView::new(model, &attached, Self::today()))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_package(
        &self,
        request: CreatePackageRequest,
    ) -> Result<PackageView, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let model = package::ActiveModel {
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            inclusions: Set(Inclusions(request.inclusions)),
            base_rate: Set(request.base_rate),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        counter!("catalog.packages.created", 1);
        info!(package_id = model.id, "package created");
        Ok(PackageView::new(model, &[], Self::today()))
    }

    #[instrument(skip(self, request))]
    pub async fn update_package(
        &self,
        id: i32,
        request: UpdatePackageRequest,
    ) -> Result<PackageView, ServiceError> {
        request.validate()?;

        let existing = package::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| package_not_found(id))?;

        let mut active: package::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(base_rate) = request.base_rate {
            active.base_rate = Set(base_rate);
        }
        if let Some(inclusions) = request.inclusions {
            active.inclusions = Set(Inclusions(inclusions));
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        info!(package_id = id, "package updated");
        self.get_package(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_package(&self, id: i32) -> Result<(), ServiceError> {
        let result = package::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(package_not_found(id));
        }
        info!(package_id = id, "package deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn unit_model() -> unit::Model {
        unit::Model {
            id: 3,
            name: "Avanza".into(),
            year: 2022,
            capacity: 6,
            base_rate: 100_000,
            description: None,
            inclusions: Inclusions(vec![Inclusion {
                item: "Driver".into(),
                description: None,
            }]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn discount_model(id: i32, end: Option<NaiveDate>) -> discount::Model {
        discount::Model {
            id,
            name: format!("d{}", id),
            description: None,
            discount_type: discount::DiscountType::Percentage,
            discount_value: dec!(20),
            start_date: None,
            end_date: end,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unit_view_lists_all_discounts_but_prices_with_the_active_one() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let expired = discount_model(1, NaiveDate::from_ymd_opt(2026, 4, 1));
        let open = discount_model(2, None);

        let view = UnitView::new(unit_model(), &[expired, open], today);
        assert_eq!(view.discounts.len(), 2);
        assert_eq!(view.pricing.active_discount.as_ref().map(|d| d.id), Some(2));
        assert_eq!(view.pricing.discounted_price, dec!(80000));
        assert!(view.pricing.has_discount);
        assert_eq!(view.inclusions.len(), 1);
    }

    #[test]
    fn unit_request_validation() {
        let mut request = CreateUnitRequest {
            name: "Innova Reborn".into(),
            year: 2020,
            capacity: 7,
            base_rate: 650_000,
            description: None,
            inclusions: vec![],
        };
        assert!(request.validate().is_ok());

        request.year = 1899;
        assert!(request.validate().is_err());

        request.year = Utc::now().year() + 2;
        assert!(request.validate().is_err());

        request.year = 2020;
        request.capacity = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn package_request_rejects_negative_rate() {
        let request = CreatePackageRequest {
            name: "Ubud".into(),
            description: None,
            base_rate: -1,
            inclusions: vec![],
        };
        assert!(request.validate().is_err());
    }
}
