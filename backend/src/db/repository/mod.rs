//! Repository trait definitions for venue storage.
//!
//! - [`error`]: Error types for repository operations
//! - [`venue`]: The [`VenueRepository`] trait and its [`VenueQuery`] constraints
//!
//! Each backend translates a [`VenueQuery`] into its native query form; the
//! services never see query-language details.

pub mod error;
pub mod venue;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use venue::{UpsertOutcome, VenueQuery, VenueRepository};
