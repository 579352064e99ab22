// Catalog
pub mod package;
pub mod unit;

// Promotions and their join tables
pub mod discount;
pub mod package_discount;
pub mod unit_discount;

// Analytics
pub mod visitor;

pub use discount::{DiscountType, Validity};
pub use unit::{Inclusion, Inclusions};
pub use visitor::DeviceClass;
