//! Discount resolution and price computation for priceable catalog entries.
//!
//! Everything here is a pure function of an entity's base rate and the
//! discounts attached to it. Persistence hands over every association and
//! the validity filtering happens here, in one place.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::discount::{self, DiscountType, Validity};

/// The discount that currently applies to an entity, as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedDiscount {
    pub id: i32,
    pub name: String,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub discount_value: Decimal,
    pub validity: Validity,
}

impl From<&discount::Model> for AppliedDiscount {
    fn from(model: &discount::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            discount_type: model.discount_type,
            discount_value: model.discount_value,
            validity: model.validity(),
        }
    }
}

/// Read-time pricing block attached to units and packages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceQuote {
    pub base_rate: i64,
    pub active_discount: Option<AppliedDiscount>,
    #[schema(value_type = String)]
    pub discounted_price: Decimal,
    pub has_discount: bool,
}

/// Picks the discount active on `today` among `discounts`.
///
/// Only discounts whose validity window contains `today` qualify. When more
/// than one qualifies the lowest id wins, so the answer does not depend on
/// the order rows came back from the database.
pub fn active_discount(discounts: &[discount::Model], today: NaiveDate) -> Option<&discount::Model> {
    discounts
        .iter()
        .filter(|d| d.validity().contains(today))
        .min_by_key(|d| d.id)
}

/// Applies `discount` to `base_rate`.
///
/// The result is not clamped: a fixed discount larger than the base rate
/// yields a negative price.
pub fn discounted_price(base_rate: i64, discount: Option<&discount::Model>) -> Decimal {
    let base = Decimal::from(base_rate);
    let price = match discount {
        None => base,
        Some(d) => match d.discount_type {
            DiscountType::Percentage => {
                base * (Decimal::ONE - d.discount_value / Decimal::ONE_HUNDRED)
            }
            DiscountType::FixValue => base - d.discount_value,
        },
    };
    price.normalize()
}

/// Resolves the active discount and the resulting price in one go.
pub fn quote(base_rate: i64, discounts: &[discount::Model], today: NaiveDate) -> PriceQuote {
    let active = active_discount(discounts, today);
    let discounted = discounted_price(base_rate, active);

    PriceQuote {
        base_rate,
        active_discount: active.map(AppliedDiscount::from),
        discounted_price: discounted,
        has_discount: discounted < Decimal::from(base_rate),
    }
}
