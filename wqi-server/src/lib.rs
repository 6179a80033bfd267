//! wqi-server library interface
//!
//! Live water quality service: the acquisition cascade, the persistence log
//! and a thin HTTP surface over the trained estimator.

pub mod acquisition;
pub mod api;
pub mod config;
pub mod error;
pub mod log;

pub use crate::error::{ApiError, ApiResult};

use crate::acquisition::AcquisitionService;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Cascade, estimator and calibration
    pub acquisition: Arc<AcquisitionService>,
    /// Whether a trained model artifact backs the estimator
    pub model_loaded: bool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(acquisition: Arc<AcquisitionService>, model_loaded: bool) -> Self {
        Self {
            acquisition,
            model_loaded,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::predict_routes())
        .merge(api::live_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
