use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{path::PathBuf, sync::Arc};

use crate::error::DelayError;
use crate::model::DelayPredictor;
use crate::types::{parse_flights, HealthResponse, PredictRequest, PredictResponse};

pub type ApiError = (StatusCode, Json<Value>);

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<DelayPredictor>,
    /// Artifact to load on first use when startup loading failed.
    pub model_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(predictor: Arc<DelayPredictor>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            predictor,
            model_path: Arc::new(model_path.into()),
        }
    }

    fn ensure_loaded(&self) -> Result<(), DelayError> {
        if self.predictor.is_loaded() {
            return Ok(());
        }
        tracing::info!(path = %self.model_path.display(), "model not loaded yet, loading on demand");
        self.predictor.load_path(self.model_path.as_path())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .with_state(state)
}

// ---------- Error mapping ----------

pub fn error_response(err: DelayError) -> ApiError {
    let status = match &err {
        DelayError::Validation { .. } => StatusCode::BAD_REQUEST,
        DelayError::ModelNotLoaded | DelayError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
        DelayError::ShapeMismatch { .. } | DelayError::InvalidColumn(_) | DelayError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    match &err {
        DelayError::Validation { index, field, .. } => {
            tracing::debug!(index, %field, error = %err, "rejected request");
            (
                status,
                Json(json!({ "detail": err.to_string(), "index": index, "field": field })),
            )
        }
        DelayError::ShapeMismatch { .. } => {
            // artifact and encoder disagree: a deployment defect, not a bad request
            tracing::error!(error = %err, "feature width does not match model");
            (status, Json(json!({ "detail": err.to_string() })))
        }
        _ => {
            tracing::warn!(error = %err, "prediction unavailable");
            (status, Json(json!({ "detail": err.to_string() })))
        }
    }
}

// ---------- Handlers ----------

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}

pub async fn predict(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<PredictResponse>, ApiError> {
    let request: PredictRequest = serde_json::from_value(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": format!("invalid request body: {}", e) })),
        )
    })?;

    // validate before touching the model so bad input is always a 400
    let flights = parse_flights(&request.flights).map_err(error_response)?;

    let unknown = flights.iter().filter(|f| !f.is_known_airline()).count();
    if unknown > 0 {
        tracing::debug!(unknown, "request contains operators outside the airline catalogue");
    }

    state.ensure_loaded().map_err(error_response)?;
    let predict = state
        .predictor
        .predict_records(&flights)
        .map_err(error_response)?;

    tracing::info!(flights = flights.len(), "served prediction");
    Ok(Json(PredictResponse { predict }))
}
