//! # Venue Map Backend
//!
//! Serves a curated list of venues (cafes, bars, shops) to a map front end,
//! filtered by type, category and whether each venue is open at a given
//! moment.
//!
//! ## Architecture
//!
//! - [`models`]: Canonical venue and opening-hours types
//! - [`services`]: Schedule evaluation and the filter compiler (pure, no I/O)
//! - [`db`]: Repository trait, local and Postgres backends, legacy-document
//!   normalization and the service layer used by handlers
//! - [`auth`]: Bearer-token verification and the email allow-list
//! - [`config`]: `venue-map.toml` plus environment overrides
//! - [`http`]: Axum-based REST API (feature `http-server`)

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
