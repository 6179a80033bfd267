//! POST /api/predict

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::debug;
use wqi_common::estimator::predict;
use wqi_common::{ParameterSet, Prediction};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Score an eight-field reading
///
/// The body must be a JSON object with every canonical field name; values
/// may be numbers or numeric strings. Inference failures are not errors: they
/// come back as score 0 with the "Prediction Error" label.
pub async fn predict_reading(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Prediction>> {
    let Json(value) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("request body must be a JSON object".to_string()))?;
    let params = ParameterSet::from_json_object(object)?;
    debug!("Predict request: {:?}", params);

    let acquisition = &state.acquisition;
    Ok(Json(predict(
        acquisition.estimator().as_ref(),
        &params,
        acquisition.calibration(),
    )))
}

pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/api/predict", post(predict_reading))
}
