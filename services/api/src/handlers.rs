//! Axum Handlers for the REST API
//!
//! The game itself is played over the WebSocket endpoint; these handlers
//! expose round generation directly (useful for previewing content) and a
//! liveness probe. Doc comments feed the OpenAPI document.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use thereis_core::GenerationError;
use tracing::error;

use crate::{
    models::{ErrorResponse, Round},
    state::AppState,
};

pub enum ApiError {
    /// The upstream generative service failed to produce a round.
    BadGateway(GenerationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadGateway(err) => {
                error!(error = %err, "Round generation failed");
                let message = err.display_message().to_string();
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        Self::BadGateway(err)
    }
}

impl From<tokio::time::error::Elapsed> for ApiError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::BadGateway(GenerationError::service(err))
    }
}

/// Generate a fresh round of game content.
#[utoipa::path(
    post,
    path = "/rounds",
    responses(
        (status = 200, description = "Round generated", body = Round),
        (status = 502, description = "The AI service failed to generate a round", body = ErrorResponse)
    )
)]
pub async fn generate_round(State(state): State<Arc<AppState>>) -> Result<Json<Round>, ApiError> {
    let round = tokio::time::timeout(
        state.round_timeout,
        state.content_provider.request_round(),
    )
    .await??;
    if round.is_empty() {
        return Err(GenerationError::EmptyRound.into());
    }
    Ok(Json(round.into()))
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
