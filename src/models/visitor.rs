use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    AsRefStr,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceClass {
    #[sea_orm(string_value = "mobile")]
    Mobile,
    #[sea_orm(string_value = "tablet")]
    Tablet,
    #[sea_orm(string_value = "desktop")]
    Desktop,
}

impl DeviceClass {
    /// Classifies a user agent string. Mobile wins over tablet, anything
    /// else is a desktop.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ua.contains("mobile") {
            DeviceClass::Mobile
        } else if ua.contains("tablet") {
            DeviceClass::Tablet
        } else {
            DeviceClass::Desktop
        }
    }
}

/// One recorded page visit. Rows are written once and never updated.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "visitors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub uuid: String,
    #[sea_orm(column_type = "Text")]
    pub user_agent: String,
    pub device: DeviceClass,
    pub ip_address: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148", DeviceClass::Mobile)]
    #[case("Mozilla/5.0 (Linux; Android 13; SM-X200) Tablet", DeviceClass::Tablet)]
    #[case("Mozilla/5.0 (Android; Tablet; Mobile)", DeviceClass::Mobile)]
    #[case("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0", DeviceClass::Desktop)]
    #[case("", DeviceClass::Desktop)]
    fn classifies_user_agents(#[case] ua: &str, #[case] expected: DeviceClass) {
        assert_eq!(DeviceClass::from_user_agent(ua), expected);
    }

    #[test]
    fn device_class_renders_lowercase() {
        assert_eq!(DeviceClass::Tablet.to_string(), "tablet");
        assert_eq!(
            serde_json::to_string(&DeviceClass::Mobile).unwrap(),
            "\"mobile\""
        );
    }
}
