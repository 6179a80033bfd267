//! HTTP API handlers for wqi-server

pub mod health;
pub mod live;
pub mod predict;

pub use health::health_routes;
pub use live::live_routes;
pub use predict::predict_routes;
