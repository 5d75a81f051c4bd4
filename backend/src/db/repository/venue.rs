//! Venue repository trait and its query constraints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::error::RepositoryResult;
use crate::models::Venue;

/// Constraints a repository applies natively when listing venues.
///
/// `None` on a dimension means "unconstrained". A constrained dimension never
/// matches a venue whose corresponding field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VenueQuery {
    /// Venues with one of these business statuses are excluded.
    pub business_status_not_in: BTreeSet<String>,
    /// Only venues whose `primaryType.text` is in the set.
    pub primary_type_in: Option<BTreeSet<String>>,
    /// Only venues whose category is in the set.
    pub category_in: Option<BTreeSet<i32>>,
}

impl VenueQuery {
    /// Evaluate the constraints against a single venue in memory.
    pub fn matches(&self, venue: &Venue) -> bool {
        if let Some(status) = venue.business_status.as_deref() {
            if self.business_status_not_in.contains(status) {
                return false;
            }
        }

        if let Some(types) = &self.primary_type_in {
            match venue.primary_type_text() {
                Some(text) if types.contains(text) => {}
                _ => return false,
            }
        }

        if let Some(categories) = &self.category_in {
            match venue.category {
                Some(category) if categories.contains(&category) => {}
                _ => return false,
            }
        }

        true
    }
}

/// Whether an upsert created a new venue or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Storage access for venues.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to be shared across request handlers.
#[async_trait]
pub trait VenueRepository: Send + Sync {
    /// Check if the storage backend is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if healthy
    /// - `Ok(false)` if unhealthy but no error occurred
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// List venues matching `query`, in stable storage order.
    async fn find(&self, query: &VenueQuery) -> RepositoryResult<Vec<Venue>>;

    /// Sorted, de-duplicated `primaryType.text` values of venues whose
    /// business status is not in `business_status_not_in`.
    async fn distinct_primary_types(
        &self,
        business_status_not_in: &BTreeSet<String>,
    ) -> RepositoryResult<Vec<String>>;

    /// Fetch one venue by its place id.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no venue has this id
    async fn get_venue(&self, id: &str) -> RepositoryResult<Venue>;

    /// Insert a venue, or replace the stored venue with the same id.
    async fn upsert_venue(&self, venue: &Venue) -> RepositoryResult<UpsertOutcome>;
}
