//! In-memory local repository implementation.
//!
//! Venues live in a `Vec` (so listing order is insertion order) with an id
//! index beside it. Suitable for unit tests and local development; optionally
//! seeded from a JSON file of raw venue documents.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::db::normalize::{load_venue_documents, NormalizeError};
use crate::db::repository::{
    ErrorContext, RepositoryError, RepositoryResult, UpsertOutcome, VenueQuery, VenueRepository,
};
use crate::models::Venue;

/// In-memory local repository.
///
/// # Example
/// ```
/// use venue_map::db::repositories::LocalRepository;
/// use venue_map::models::Venue;
///
/// let repo = LocalRepository::new();
/// repo.insert_venue(Venue::new("ChIJ123"));
/// assert_eq!(repo.venue_count(), 1);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    venues: Vec<Venue>,
    index: HashMap<String, usize>,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            venues: Vec::new(),
            index: HashMap::new(),
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn upsert(&mut self, venue: Venue) -> UpsertOutcome {
        match self.index.get(&venue.id) {
            Some(&position) => {
                self.venues[position] = venue;
                UpsertOutcome::Updated
            }
            None => {
                self.index.insert(venue.id.clone(), self.venues.len());
                self.venues.push(venue);
                UpsertOutcome::Inserted
            }
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Create a repository holding `venues`, in order.
    ///
    /// A later venue with an id already seen replaces the earlier one in place.
    pub fn with_venues(venues: impl IntoIterator<Item = Venue>) -> Self {
        let repo = Self::new();
        {
            let mut data = repo.data.write();
            for venue in venues {
                data.upsert(venue);
            }
        }
        repo
    }

    /// Create a repository seeded from a JSON array of raw venue documents.
    ///
    /// # Arguments
    /// * `path` - File holding the documents; legacy shapes are normalized
    ///
    /// # Returns
    /// * `Err(NormalizeError)` - If the file cannot be read or is not an array
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, NormalizeError> {
        let venues = load_venue_documents(path.as_ref())?;
        log::info!(
            "Seeded local repository with {} venues from {}",
            venues.len(),
            path.as_ref().display()
        );
        Ok(Self::with_venues(venues))
    }

    /// Add or replace a venue without health checks or validation.
    pub fn insert_venue(&self, venue: Venue) -> UpsertOutcome {
        self.data.write().upsert(venue)
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of venues stored.
    pub fn venue_count(&self) -> usize {
        self.data.read().venues.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self, operation: &str) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Local repository is marked unhealthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VenueRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn find(&self, query: &VenueQuery) -> RepositoryResult<Vec<Venue>> {
        self.check_health("find_venues")?;
        let data = self.data.read();
        Ok(data
            .venues
            .iter()
            .filter(|venue| query.matches(venue))
            .cloned()
            .collect())
    }

    async fn distinct_primary_types(
        &self,
        business_status_not_in: &BTreeSet<String>,
    ) -> RepositoryResult<Vec<String>> {
        self.check_health("distinct_primary_types")?;
        let query = VenueQuery {
            business_status_not_in: business_status_not_in.clone(),
            ..Default::default()
        };
        let data = self.data.read();
        let types: BTreeSet<String> = data
            .venues
            .iter()
            .filter(|venue| query.matches(venue))
            .filter_map(|venue| venue.primary_type_text().map(str::to_owned))
            .collect();
        Ok(types.into_iter().collect())
    }

    async fn get_venue(&self, id: &str) -> RepositoryResult<Venue> {
        self.check_health("get_venue")?;
        let data = self.data.read();
        data.index
            .get(id)
            .map(|&position| data.venues[position].clone())
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("Venue {} not found", id),
                    ErrorContext::new("get_venue")
                        .with_entity("venue")
                        .with_entity_id(id),
                )
            })
    }

    async fn upsert_venue(&self, venue: &Venue) -> RepositoryResult<UpsertOutcome> {
        self.check_health("upsert_venue")?;
        Ok(self.data.write().upsert(venue.clone()))
    }
}
