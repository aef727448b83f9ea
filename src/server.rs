//! HTTP surface: prediction, feedback and liveness.

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::PipelineError;
use crate::models::{FeedbackRequest, FeedbackResponse, PredictRequest, PredictionResult, RawMessage};
use crate::service::InferenceOrchestrator;

/// Pipeline error rendered as `{"detail": ...}`: 400 for client errors,
/// 500 otherwise.
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "detail": self.0.public_message() }))).into_response()
    }
}

/// POST /predict
async fn predict(
    State(orchestrator): State<InferenceOrchestrator>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictionResult>, ApiError> {
    let raw = RawMessage::from(request.text);
    Ok(Json(orchestrator.predict(&raw).await?))
}

/// POST /feedback
async fn feedback(
    State(orchestrator): State<InferenceOrchestrator>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let action = orchestrator.record_feedback(request).await?;
    Ok(Json(FeedbackResponse::from(action)))
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Build the router
pub fn router(orchestrator: InferenceOrchestrator) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/feedback", post(feedback))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// Serve until Ctrl-C
pub async fn serve(orchestrator: InferenceOrchestrator, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    info!(address = bind_address, "HTTP server listening");

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")
}
