pub mod common;
pub mod packages;
pub mod promotions;
pub mod units;
pub mod users;
pub mod visitors;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
