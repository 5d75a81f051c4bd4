//! Postgres repository implementation using Diesel.
//!
//! Venues are stored one row per place in the `venues` table, with opening
//! hours kept as JSONB in their canonical shape.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    ErrorContext, RepositoryError, RepositoryResult, UpsertOutcome, VenueQuery, VenueRepository,
};
use crate::models::Venue;

mod models;
mod schema;

use models::{NewVenueRow, VenueRow};
use schema::venues;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
    /// - `PG_POOL_MAX`, `PG_POOL_MIN`, `PG_CONN_TIMEOUT_SEC`,
    ///   `PG_IDLE_TIMEOUT_SEC`, `PG_MAX_RETRIES`, `PG_RETRY_DELAY_MS`
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        Ok(Self {
            database_url,
            ..Self::default()
        }
        .with_env_overrides())
    }

    /// Apply `PG_*` tuning variables on top of the current values.
    pub fn with_env_overrides(self) -> Self {
        Self {
            max_pool_size: env_or("PG_POOL_MAX", self.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", self.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", self.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", self.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", self.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", self.retry_delay_ms),
            ..self
        }
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed venue repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Arguments
    /// * `config` - Database configuration
    ///
    /// # Returns
    /// * `Ok(PostgresRepository)` on success
    /// * `Err(RepositoryError)` if connection or migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self { pool, config })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// Retries up to `max_retries` times with exponential backoff when the
    /// error is retryable (connection errors and serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        log::warn!("Retrying venue query after error: {}", e);
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

#[async_trait]
impl VenueRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn find(&self, query: &VenueQuery) -> RepositoryResult<Vec<Venue>> {
        let query = query.clone();
        let rows = self
            .with_conn(move |conn| {
                let mut statement = venues::table.into_boxed();

                if !query.business_status_not_in.is_empty() {
                    let excluded: Vec<String> =
                        query.business_status_not_in.iter().cloned().collect();
                    statement = statement.filter(
                        venues::business_status
                            .is_null()
                            .or(venues::business_status.ne_all(excluded)),
                    );
                }
                if let Some(types) = &query.primary_type_in {
                    let types: Vec<String> = types.iter().cloned().collect();
                    statement = statement.filter(venues::primary_type.eq_any(types));
                }
                if let Some(categories) = &query.category_in {
                    let categories: Vec<i32> = categories.iter().copied().collect();
                    statement = statement.filter(venues::category.eq_any(categories));
                }

                statement
                    .order(venues::venue_pk.asc())
                    .select(VenueRow::as_select())
                    .load::<VenueRow>(conn)
                    .map_err(|e| RepositoryError::from(e).with_operation("find_venues"))
            })
            .await?;

        Ok(rows.into_iter().map(VenueRow::into_venue).collect())
    }

    async fn distinct_primary_types(
        &self,
        business_status_not_in: &BTreeSet<String>,
    ) -> RepositoryResult<Vec<String>> {
        let excluded: Vec<String> = business_status_not_in.iter().cloned().collect();
        let types = self
            .with_conn(move |conn| {
                let mut statement = venues::table
                    .select(venues::primary_type)
                    .filter(venues::primary_type.is_not_null())
                    .distinct()
                    .into_boxed();
                if !excluded.is_empty() {
                    statement = statement.filter(
                        venues::business_status
                            .is_null()
                            .or(venues::business_status.ne_all(excluded.clone())),
                    );
                }
                statement.load::<Option<String>>(conn).map_err(|e| {
                    RepositoryError::from(e).with_operation("distinct_primary_types")
                })
            })
            .await?;

        // Sorted in process so ordering does not depend on database collation.
        let types: BTreeSet<String> = types.into_iter().flatten().collect();
        Ok(types.into_iter().collect())
    }

    async fn get_venue(&self, id: &str) -> RepositoryResult<Venue> {
        let id = id.to_string();
        let row = self
            .with_conn(move |conn| {
                venues::table
                    .filter(venues::place_id.eq(&id))
                    .select(VenueRow::as_select())
                    .first::<VenueRow>(conn)
                    .optional()
                    .map_err(RepositoryError::from)?
                    .ok_or_else(|| {
                        RepositoryError::not_found_with_context(
                            format!("Venue {} not found", id),
                            ErrorContext::new("get_venue")
                                .with_entity("venue")
                                .with_entity_id(&id),
                        )
                    })
            })
            .await?;

        Ok(row.into_venue())
    }

    async fn upsert_venue(&self, venue: &Venue) -> RepositoryResult<UpsertOutcome> {
        let new_row = NewVenueRow::from_venue(venue).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Failed to encode opening hours: {}", e),
                ErrorContext::new("upsert_venue")
                    .with_entity("venue")
                    .with_entity_id(&venue.id),
            )
        })?;

        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let existing = venues::table
                    .filter(venues::place_id.eq(&new_row.place_id))
                    .select(venues::venue_pk)
                    .for_update()
                    .first::<i64>(tx)
                    .optional()?;

                match existing {
                    Some(venue_pk) => {
                        diesel::update(venues::table.find(venue_pk))
                            .set((&new_row, venues::updated_at.eq(diesel::dsl::now)))
                            .execute(tx)?;
                        Ok(UpsertOutcome::Updated)
                    }
                    None => {
                        diesel::insert_into(venues::table)
                            .values(&new_row)
                            .execute(tx)?;
                        Ok(UpsertOutcome::Inserted)
                    }
                }
            })
            .map_err(|e: diesel::result::Error| {
                RepositoryError::from(e).with_operation("upsert_venue")
            })
        })
        .await
    }
}
