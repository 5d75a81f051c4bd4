//! Venue business logic.
//!
//! - [`schedule`]: decides whether opening hours cover an instant
//! - [`filter`]: turns raw filter inputs into repository constraints and
//!   post-filters repository results by open state
//!
//! Both modules are pure; orchestration against a repository lives in
//! [`crate::db::services`].

pub mod filter;
pub mod schedule;

pub use filter::{apply_filter, build_filter, AnnotatedVenue, FilterSpec, RawFilterParams, TargetInstant};
pub use schedule::is_open_at;
