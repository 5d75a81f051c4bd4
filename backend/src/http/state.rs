//! Application state for the HTTP server.

use chrono::{FixedOffset, Local, NaiveDateTime, Utc};
use std::sync::Arc;

use crate::auth::Authorizer;
use crate::db::repository::VenueRepository;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Venue storage backend
    pub repository: Arc<dyn VenueRepository>,
    /// Gate for every `/v1` route
    pub authorizer: Authorizer,
    utc_offset: Option<FixedOffset>,
}

impl AppState {
    /// Create a new application state with the given repository and authorizer.
    pub fn new(repository: Arc<dyn VenueRepository>, authorizer: Authorizer) -> Self {
        Self {
            repository,
            authorizer,
            utc_offset: None,
        }
    }

    /// Read the request clock at a fixed UTC offset instead of server local time.
    pub fn with_utc_offset(mut self, offset: Option<FixedOffset>) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Current wall-clock time in the venues' local zone.
    pub fn now(&self) -> NaiveDateTime {
        match self.utc_offset {
            Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
            None => Local::now().naive_local(),
        }
    }
}
