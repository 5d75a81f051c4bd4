//! Data Transfer Objects for the HTTP API.
//!
//! Venue listings are serialized straight from
//! [`AnnotatedVenue`](crate::services::AnnotatedVenue); only the envelopes
//! that have no domain counterpart live here.

use serde::{Deserialize, Serialize};

use crate::db::repository::UpsertOutcome;
use crate::models::Venue;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Repository connection status
    pub database: String,
}

/// Response for venue registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterVenueResponse {
    pub outcome: UpsertOutcome,
    /// The venue as stored, after normalization
    pub venue: Venue,
}
