//! GET /api/live-data

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use wqi_common::ParameterSet;

use crate::acquisition::{LiveResult, Provenance};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LiveMetadata {
    pub source: Provenance,
    /// RFC 3339; the original log time for cached readings
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct LiveDataResponse {
    pub wqi: u8,
    pub assessment: String,
    pub features: ParameterSet,
    pub metadata: LiveMetadata,
}

impl From<LiveResult> for LiveDataResponse {
    fn from(result: LiveResult) -> Self {
        Self {
            wqi: result.prediction.wqi,
            assessment: result.prediction.assessment,
            features: result.reading.params,
            metadata: LiveMetadata {
                source: result.reading.provenance,
                timestamp: wqi_common::time::format_timestamp(&result.reading.timestamp),
            },
        }
    }
}

/// Run the acquisition cascade once; always answers
pub async fn live_data(State(state): State<AppState>) -> Json<LiveDataResponse> {
    Json(state.acquisition.acquire().await.into())
}

pub fn live_routes() -> Router<AppState> {
    Router::new().route("/api/live-data", get(live_data))
}
