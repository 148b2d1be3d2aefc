//! HTTP API handlers for smeta-brain

pub mod analyze;
pub mod brain;
pub mod catalog;
pub mod health;
pub mod raw_data;

pub use analyze::analyze_routes;
pub use brain::brain_routes;
pub use catalog::catalog_routes;
pub use health::health_routes;
pub use raw_data::raw_data_routes;
