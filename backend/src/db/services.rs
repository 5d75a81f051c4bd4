//! High-level venue service layer.
//!
//! Repository-agnostic operations that combine the filter compiler, the
//! schedule evaluator and a [`VenueRepository`]. The HTTP handlers call these
//! functions; they never talk to a repository directly.
//!
//! ```text
//! request ─▶ build_filter ─▶ repo.find(VenueQuery) ─▶ apply_filter ─▶ annotated venues
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use venue_map::db::{services, repositories::LocalRepository};
//! use venue_map::services::RawFilterParams;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let now = chrono::Local::now().naive_local();
//!     let venues = services::list_venues(&repo, RawFilterParams::default(), now).await?;
//!     println!("Found {} venues", venues.len());
//!     Ok(())
//! }
//! ```

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::BTreeSet;

use super::normalize::normalize_venue_document;
use super::repository::{
    ErrorContext, RepositoryError, RepositoryResult, UpsertOutcome, VenueRepository,
};
use crate::models::{Venue, VenueCategory, CLOSED_PERMANENTLY};
use crate::services::filter::{apply_filter, build_filter, AnnotatedVenue, RawFilterParams};

// ==================== Health & Connection ====================

/// Check if the repository is healthy.
pub async fn health_check<R: VenueRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Venue Queries ====================

/// List venues matching the raw filter parameters.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `raw` - Filter parameters as received from the client
/// * `now` - Request clock reading, used for `openNow` and the annotation
///
/// # Returns
/// * `Ok(Vec<AnnotatedVenue>)` - Matching venues in repository order
/// * `Err(RepositoryError)` - If the repository query fails
pub async fn list_venues<R: VenueRepository + ?Sized>(
    repo: &R,
    raw: RawFilterParams,
    now: NaiveDateTime,
) -> RepositoryResult<Vec<AnnotatedVenue>> {
    let spec = build_filter(raw);
    debug!("Compiled venue filter: {:?}", spec);

    let candidates = repo.find(&spec.to_query()).await?;
    let candidate_count = candidates.len();
    let venues = apply_filter(candidates, &spec, now);

    info!(
        "Listed {} venues ({} candidates, target instant: {:?})",
        venues.len(),
        candidate_count,
        spec.target_instant
    );
    Ok(venues)
}

/// Distinct primary types of venues that are not permanently closed.
pub async fn list_primary_types<R: VenueRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<Vec<String>> {
    let excluded = BTreeSet::from([CLOSED_PERMANENTLY.to_string()]);
    repo.distinct_primary_types(&excluded).await
}

/// Fetch a single venue annotated with its open state at `now`.
pub async fn get_venue<R: VenueRepository + ?Sized>(
    repo: &R,
    id: &str,
    now: NaiveDateTime,
) -> RepositoryResult<AnnotatedVenue> {
    let venue = repo.get_venue(id).await?;
    Ok(AnnotatedVenue::evaluate(venue, now))
}

// ==================== Registration ====================

/// Normalize, validate and store a venue document.
///
/// The document may use any of the legacy shapes accepted by
/// [`normalize_venue_document`].
///
/// # Returns
/// * `Err(RepositoryError::ValidationError)` - If the document has no id, the
///   venue is permanently closed, or its category is missing or unknown
pub async fn register_venue<R: VenueRepository + ?Sized>(
    repo: &R,
    document: Value,
) -> RepositoryResult<(Venue, UpsertOutcome)> {
    let venue = normalize_venue_document(document).map_err(|e| {
        RepositoryError::validation_with_context(
            e.to_string(),
            ErrorContext::new("register_venue").with_entity("venue"),
        )
    })?;

    validate_registration(&venue)?;

    let outcome = repo.upsert_venue(&venue).await?;
    info!(
        "Registered venue {} ({}): {:?}",
        venue.id,
        venue.display_name(),
        outcome
    );
    Ok((venue, outcome))
}

fn validate_registration(venue: &Venue) -> RepositoryResult<()> {
    let context = || {
        ErrorContext::new("register_venue")
            .with_entity("venue")
            .with_entity_id(&venue.id)
    };

    if venue.is_permanently_closed() {
        warn!("Refusing to register permanently closed venue {}", venue.id);
        return Err(RepositoryError::validation_with_context(
            "Permanently closed venues cannot be registered",
            context(),
        ));
    }

    let code = venue.category.ok_or_else(|| {
        RepositoryError::validation_with_context("Venue category is required", context())
    })?;
    VenueCategory::try_from(code)
        .map_err(|e| RepositoryError::validation_with_context(e, context()))?;

    Ok(())
}
