//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer in [`crate::db::services`].

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::dto::{HealthResponse, RegisterVenueResponse};
use super::error::AppError;
use super::state::AppState;
use crate::db::repository::UpsertOutcome;
use crate::db::services as db_services;
use crate::services::{AnnotatedVenue, RawFilterParams};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Liveness probe; reports repository health without failing the request.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Venues
// =============================================================================

/// GET /v1/venues
///
/// Accepts `type`, `category`, `openAt`, `openNow` and
/// `excludeBusinessStatus`; repeated keys and `key[]` forms are lists.
pub async fn list_venues(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> HandlerResult<Vec<AnnotatedVenue>> {
    let raw = RawFilterParams::from_query_pairs(&pairs);
    let venues = db_services::list_venues(state.repository.as_ref(), raw, state.now()).await?;
    Ok(Json(venues))
}

/// GET /v1/venues/types
pub async fn list_types(State(state): State<AppState>) -> HandlerResult<Vec<String>> {
    let types = db_services::list_primary_types(state.repository.as_ref()).await?;
    Ok(Json(types))
}

/// GET /v1/venues/{id}
pub async fn get_venue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<AnnotatedVenue> {
    let venue = db_services::get_venue(state.repository.as_ref(), &id, state.now()).await?;
    Ok(Json(venue))
}

/// POST /v1/venues
///
/// Registers a raw venue document. Answers 201 for a new venue, 200 when an
/// existing one was replaced.
pub async fn register_venue(
    State(state): State<AppState>,
    Json(document): Json<Value>,
) -> Result<(StatusCode, Json<RegisterVenueResponse>), AppError> {
    if !document.is_object() {
        return Err(AppError::BadRequest(
            "Venue document must be a JSON object".to_string(),
        ));
    }

    let (venue, outcome) = db_services::register_venue(state.repository.as_ref(), document).await?;
    let status = match outcome {
        UpsertOutcome::Inserted => StatusCode::CREATED,
        UpsertOutcome::Updated => StatusCode::OK,
    };

    Ok((status, Json(RegisterVenueResponse { outcome, venue })))
}
