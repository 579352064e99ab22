use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db,
    errors::ServiceError,
    models::{
        discount::{self, DiscountType, Validity},
        package, package_discount, unit, unit_discount,
    },
};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A discount together with the entities it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiscountDetail {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub discount_value: Decimal,
    pub validity: Validity,
    pub unit_ids: Vec<i32>,
    pub package_ids: Vec<i32>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl DiscountDetail {
    fn new(model: discount::Model, unit_ids: Vec<i32>, package_ids: Vec<i32>) -> Self {
        let validity = model.validity();
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            discount_type: model.discount_type,
            discount_value: model.discount_value,
            validity,
            unit_ids,
            package_ids,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Dry season promo",
    "description": "20% off every unit in July",
    "discount_type": "PERCENTAGE",
    "discount_value": "20",
    "validity": {"start_date": "2026-07-01", "end_date": "2026-07-31"},
    "unit_ids": [1, 2],
    "package_ids": []
}))]
pub struct CreateDiscountRequest {
    #[validate(length(min = 1, max = 70))]
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub discount_value: Decimal,
    #[serde(default)]
    pub validity: Validity,
    #[serde(default)]
    pub unit_ids: Vec<i32>,
    #[serde(default)]
    pub package_ids: Vec<i32>,
}

/// Partial update. `unit_ids` / `package_ids` replace the association set
/// whenever present, `null` and `[]` both clearing it.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDiscountRequest {
    #[validate(length(min = 1, max = 70))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub discount_type: Option<DiscountType>,
    #[schema(value_type = Option<String>)]
    pub discount_value: Option<Decimal>,
    pub validity: Option<Validity>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Vec<i32>>)]
    pub unit_ids: Option<Option<Vec<i32>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Vec<i32>>)]
    pub package_ids: Option<Option<Vec<i32>>>,
}

/// Rejects negative values, percentages above 100 and reversed windows.
pub fn validate_discount_terms(
    discount_type: DiscountType,
    value: Decimal,
    validity: &Validity,
) -> Result<(), ServiceError> {
    if value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "discount_value must not be negative".to_string(),
        ));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(ServiceError::ValidationError(
            "percentage discount_value must be at most 100".to_string(),
        ));
    }
    if !validity.is_ordered() {
        return Err(ServiceError::ValidationError(
            "validity.start_date must not be after validity.end_date".to_string(),
        ));
    }
    Ok(())
}

fn dedup(ids: &[i32]) -> Vec<i32> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

async fn ensure_units_exist<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> Result<(), ServiceError> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: BTreeSet<i32> = unit::Entity::find()
        .filter(unit::Column::Id.is_in(ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();
    let missing: Vec<i32> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(format!("Unknown unit ids: {:?}", missing)))
    }
}

async fn ensure_packages_exist<C: ConnectionTrait>(
    conn: &C,
    ids: &[i32],
) -> Result<(), ServiceError> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: BTreeSet<i32> = package::Entity::find()
        .filter(package::Column::Id.is_in(ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    let missing: Vec<i32> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(format!(
            "Unknown package ids: {:?}",
            missing
        )))
    }
}

async fn replace_unit_links<C: ConnectionTrait>(
    conn: &C,
    discount_id: i32,
    unit_ids: &[i32],
) -> Result<(), ServiceError> {
    unit_discount::Entity::delete_many()
        .filter(unit_discount::Column::DiscountId.eq(discount_id))
        .exec(conn)
        .await?;
    if unit_ids.is_empty() {
        return Ok(());
    }
    let rows = unit_ids.iter().map(|&unit_id| unit_discount::ActiveModel {
        unit_id: Set(unit_id),
        discount_id: Set(discount_id),
        ..Default::default()
    });
    unit_discount::Entity::insert_many(rows).exec(conn).await?;
    Ok(())
}

async fn replace_package_links<C: ConnectionTrait>(
    conn: &C,
    discount_id: i32,
    package_ids: &[i32],
) -> Result<(), ServiceError> {
    package_discount::Entity::delete_many()
        .filter(package_discount::Column::DiscountId.eq(discount_id))
        .exec(conn)
        .await?;
    if package_ids.is_empty() {
        return Ok(());
    }
    let rows = package_ids.iter().map(|&package_id| package_discount::ActiveModel {
        package_id: Set(package_id),
        discount_id: Set(discount_id),
        ..Default::default()
    });
    package_discount::Entity::insert_many(rows).exec(conn).await?;
    Ok(())
}

/// Unit and package ids linked to each of `discount_ids`, sorted ascending.
async fn load_links<C: ConnectionTrait>(
    conn: &C,
    discount_ids: &[i32],
) -> Result<(HashMap<i32, Vec<i32>>, HashMap<i32, Vec<i32>>), ServiceError> {
    let mut units: HashMap<i32, Vec<i32>> = HashMap::new();
    let mut packages: HashMap<i32, Vec<i32>> = HashMap::new();
    if discount_ids.is_empty() {
        return Ok((units, packages));
    }

    for link in unit_discount::Entity::find()
        .filter(unit_discount::Column::DiscountId.is_in(discount_ids.to_vec()))
        .order_by_asc(unit_discount::Column::UnitId)
        .all(conn)
        .await?
    {
        units.entry(link.discount_id).or_default().push(link.unit_id);
    }
    for link in package_discount::Entity::find()
        .filter(package_discount::Column::DiscountId.is_in(discount_ids.to_vec()))
        .order_by_asc(package_discount::Column::PackageId)
        .all(conn)
        .await?
    {
        packages
            .entry(link.discount_id)
            .or_default()
            .push(link.package_id);
    }
    Ok((units, packages))
}

async fn detail<C: ConnectionTrait>(conn: &C, model: discount::Model) -> Result<DiscountDetail, ServiceError> {
    let (mut units, mut packages) = load_links(conn, &[model.id]).await?;
    let unit_ids = units.remove(&model.id).unwrap_or_default();
    let package_ids = packages.remove(&model.id).unwrap_or_default();
    Ok(DiscountDetail::new(model, unit_ids, package_ids))
}

/// Service for managing discounts and their unit/package associations
#[derive(Clone)]
pub struct PromotionService {
    db: Arc<DatabaseConnection>,
}

impl PromotionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All discounts, oldest first, each with its associations
    #[instrument(skip(self))]
    pub async fn list_discounts(&self) -> Result<Vec<DiscountDetail>, ServiceError> {
        let discounts = discount::Entity::find()
            .order_by_asc(discount::Column::CreatedAt)
            .order_by_asc(discount::Column::Id)
            .all(&*self.db)
            .await?;

        let ids: Vec<i32> = discounts.iter().map(|d| d.id).collect();
        let (mut units, mut packages) = load_links(&*self.db, &ids).await?;

        Ok(discounts
            .into_iter()
            .map(|d| {
                let unit_ids = units.remove(&d.id).unwrap_or_default();
                let package_ids = packages.remove(&d.id).unwrap_or_default();
                DiscountDetail::new(d, unit_ids, package_ids)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_discount(&self, id: i32) -> Result<DiscountDetail, ServiceError> {
        let model = discount::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Discount {} not found", id)))?;
        detail(&*self.db, model).await
    }

    /// Creates a discount and its association rows in one transaction
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_discount(
        &self,
        request: CreateDiscountRequest,
    ) -> Result<DiscountDetail, ServiceError> {
        request.validate()?;
        validate_discount_terms(request.discount_type, request.discount_value, &request.validity)?;

        let unit_ids = dedup(&request.unit_ids);
        let package_ids = dedup(&request.package_ids);

        let created = db::transaction(&self.db, "promotions.create", move |txn| {
            Box::pin(async move {
                ensure_units_exist(txn, &unit_ids).await?;
                ensure_packages_exist(txn, &package_ids).await?;

                let now = Utc::now();
                let model = discount::ActiveModel {
                    name: Set(request.name.trim().to_string()),
                    description: Set(request.description),
                    discount_type: Set(request.discount_type),
                    discount_value: Set(request.discount_value),
                    start_date: Set(request.validity.start_date),
                    end_date: Set(request.validity.end_date),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                replace_unit_links(txn, model.id, &unit_ids).await?;
                replace_package_links(txn, model.id, &package_ids).await?;

                Ok(DiscountDetail::new(model, unit_ids, package_ids))
            })
        })
        .await?;

        counter!("promotions.created", 1);
        info!(discount_id = created.id, "discount created");
        Ok(created)
    }

    /// Applies a partial update; association lists, when present, are replaced
    #[instrument(skip(self, request))]
    pub async fn update_discount(
        &self,
        id: i32,
        request: UpdateDiscountRequest,
    ) -> Result<DiscountDetail, ServiceError> {
        request.validate()?;

        let updated = db::transaction(&self.db, "promotions.update", move |txn| {
            Box::pin(async move {
                let existing = discount::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Discount {} not found", id)))?;

                let discount_type = request.discount_type.unwrap_or(existing.discount_type);
                let discount_value = request.discount_value.unwrap_or(existing.discount_value);
                let validity = request.validity.unwrap_or_else(|| existing.validity());
                validate_discount_terms(discount_type, discount_value, &validity)?;

                let unit_ids = request.unit_ids.map(|ids| dedup(&ids.unwrap_or_default()));
                let package_ids = request
                    .package_ids
                    .map(|ids| dedup(&ids.unwrap_or_default()));

                if let Some(ids) = &unit_ids {
                    ensure_units_exist(txn, ids).await?;
                }
                if let Some(ids) = &package_ids {
                    ensure_packages_exist(txn, ids).await?;
                }

                let mut active: discount::ActiveModel = existing.into();
                if let Some(name) = request.name {
                    active.name = Set(name.trim().to_string());
                }
                if let Some(description) = request.description {
                    active.description = Set(description);
                }
                active.discount_type = Set(discount_type);
                active.discount_value = Set(discount_value);
                active.start_date = Set(validity.start_date);
                active.end_date = Set(validity.end_date);
                active.updated_at = Set(Utc::now());
                let model = active.update(txn).await?;

                if let Some(ids) = &unit_ids {
                    replace_unit_links(txn, model.id, ids).await?;
                }
                if let Some(ids) = &package_ids {
                    replace_package_links(txn, model.id, ids).await?;
                }

                detail(txn, model).await
            })
        })
        .await?;

        info!(discount_id = id, "discount updated");
        Ok(updated)
    }

    /// Deletes a discount and its association rows; units and packages stay
    #[instrument(skip(self))]
    pub async fn delete_discount(&self, id: i32) -> Result<(), ServiceError> {
        db::transaction(&self.db, "promotions.delete", move |txn| {
            Box::pin(async move {
                let existing = discount::Entity::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Discount {} not found", id)))?;

                replace_unit_links(txn, id, &[]).await?;
                replace_package_links(txn, id, &[]).await?;
                discount::Entity::delete_by_id(existing.id).exec(txn).await?;
                Ok(())
            })
        })
        .await?;

        counter!("promotions.deleted", 1);
        info!(discount_id = id, "discount deleted");
        Ok(())
    }
}
