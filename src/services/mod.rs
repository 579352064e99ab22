// Pricing
pub mod pricing;
pub mod promotions;

// Catalog
pub mod catalog;

// Visitor analytics
pub mod visitor_analytics;
pub mod visitors;

// External services
pub mod geolocation;
