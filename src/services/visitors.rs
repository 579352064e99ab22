use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    tracing::with_metrics,
    errors::ServiceError,
    models::visitor::{self, DeviceClass},
    services::{
        geolocation::{locate_or_unknown, GeoLocator, UNKNOWN},
        visitor_analytics::{aggregate, RangeToken, VisitorReport},
    },
};

/// Body of a tracking beacon.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitorRequest {
    /// Stable client-side visitor identifier
    #[validate(length(min = 1, max = 64))]
    pub uuid: String,
    pub user_agent: Option<String>,
}

/// Everything known about one visit before it is stored.
#[derive(Debug, Clone)]
pub struct VisitContext {
    pub uuid: String,
    pub user_agent: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordedVisit {
    pub id: i32,
    pub uuid: String,
    pub device: DeviceClass,
    pub city: String,
    pub region: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

impl From<visitor::Model> for RecordedVisit {
    fn from(model: visitor::Model) -> Self {
        Self {
            id: model.id,
            uuid: model.uuid,
            device: model.device,
            city: model.city,
            region: model.region,
            country: model.country,
            created_at: model.created_at,
        }
    }
}

/// Records visits and builds the visitor report
#[derive(Clone)]
pub struct VisitorService {
    db: Arc<DatabaseConnection>,
    geolocator: Arc<dyn GeoLocator>,
}

impl VisitorService {
    pub fn new(db: Arc<DatabaseConnection>, geolocator: Arc<dyn GeoLocator>) -> Self {
        Self { db, geolocator }
    }

    /// Stores one visit. A failed location lookup never fails the write.
    #[instrument(skip(self, visit), fields(uuid = %visit.uuid))]
    pub async fn record_visit(&self, visit: VisitContext) -> Result<RecordedVisit, ServiceError> {
        let device = DeviceClass::from_user_agent(&visit.user_agent);
        let ip_address = if visit.ip_address.trim().is_empty() {
            UNKNOWN.to_string()
        } else {
            visit.ip_address
        };
        let location = locate_or_unknown(self.geolocator.as_ref(), &ip_address).await;

        let model = visitor::ActiveModel {
            uuid: Set(visit.uuid),
            user_agent: Set(visit.user_agent),
            device: Set(device),
            ip_address: Set(ip_address),
            city: Set(location.city),
            region: Set(location.region),
            country: Set(location.country),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        counter!("visitors.recorded", 1, "device" => device.to_string());
        debug!(visitor_id = model.id, %device, "visit recorded");
        Ok(model.into())
    }

    /// Aggregates the visits inside `range`'s window ending at `now`
    #[instrument(skip(self))]
    pub async fn report(
        &self,
        range: RangeToken,
        now: DateTime<Utc>,
    ) -> Result<VisitorReport, ServiceError> {
        let from = range.window_start(now);
        let records = with_metrics("visitors.report.fetch", || {
            visitor::Entity::find()
                .filter(visitor::Column::CreatedAt.gte(from))
                .order_by_asc(visitor::Column::CreatedAt)
                .all(&*self.db)
        })
        .await?;

        histogram!("visitors.report.rows", records.len() as f64, "range" => range.as_ref().to_string());
        Ok(aggregate(&records, range, now))
    }
}
