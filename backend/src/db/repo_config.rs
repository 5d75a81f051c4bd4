//! Repository configuration file support.
//!
//! Reads the `[repository]` and `[postgres]` sections of `venue-map.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::factory::RepositoryType;
use super::repository::RepositoryError;
use crate::db::PostgresConfig;

/// Name of the configuration file searched for in standard locations.
pub const CONFIG_FILE_NAME: &str = "venue-map.toml";

/// Repository configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub postgres: PostgresSettings,
}

/// Repository type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
    /// JSON array of raw venue documents loaded into the local repository.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
            seed_file: None,
        }
    }
}

/// Postgres connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSettings {
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_repo_type() -> String {
    "local".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Search order for [`CONFIG_FILE_NAME`].
pub fn default_config_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(CONFIG_FILE_NAME),
        PathBuf::from("backend").join(CONFIG_FILE_NAME),
        PathBuf::from("..").join(CONFIG_FILE_NAME),
    ]
}

impl RepositoryConfig {
    /// Load repository configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(RepositoryConfig)` if successful
    /// * `Err(RepositoryError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load repository configuration from the default location.
    ///
    /// Searches for `venue-map.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, RepositoryError> {
        default_config_paths()
            .into_iter()
            .find(|path| path.exists())
            .map(Self::from_file)
            .unwrap_or_else(|| {
                Err(RepositoryError::configuration(format!(
                    "No {} found in standard locations",
                    CONFIG_FILE_NAME
                )))
            })
    }

    /// Override file settings from the environment.
    ///
    /// `REPOSITORY_TYPE`, `DATABASE_URL`/`PG_DATABASE_URL`, `VENUE_SEED_FILE`
    /// and the `PG_*` tuning variables take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(repo_type) = std::env::var("REPOSITORY_TYPE") {
            self.repository.repo_type = repo_type;
        }
        if let Ok(seed) = std::env::var("VENUE_SEED_FILE") {
            self.repository.seed_file = Some(PathBuf::from(seed));
        }
        if let Ok(url) =
            std::env::var("DATABASE_URL").or_else(|_| std::env::var("PG_DATABASE_URL"))
        {
            self.postgres.database_url = url;
        }

        let pg = &mut self.postgres;
        pg.max_connections = env_parse("PG_POOL_MAX").unwrap_or(pg.max_connections);
        pg.min_connections = env_parse("PG_POOL_MIN").unwrap_or(pg.min_connections);
        pg.connect_timeout = env_parse("PG_CONN_TIMEOUT_SEC").unwrap_or(pg.connect_timeout);
        pg.idle_timeout = env_parse("PG_IDLE_TIMEOUT_SEC").unwrap_or(pg.idle_timeout);
        pg.max_retries = env_parse("PG_MAX_RETRIES").unwrap_or(pg.max_retries);
        pg.retry_delay_ms = env_parse("PG_RETRY_DELAY_MS").unwrap_or(pg.retry_delay_ms);
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> Result<RepositoryType, String> {
        RepositoryType::from_str(&self.repository.repo_type)
    }

    /// Convert to PostgresConfig if this is a Postgres configuration.
    #[cfg(feature = "postgres-repo")]
    pub fn to_postgres_config(&self) -> Result<Option<PostgresConfig>, RepositoryError> {
        let repo_type = self.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;

        if repo_type != RepositoryType::Postgres {
            return Ok(None);
        }

        if self.postgres.database_url.is_empty() {
            return Err(RepositoryError::configuration(
                "Postgres repository requires 'postgres.database_url' setting",
            ));
        }

        Ok(Some(PostgresConfig {
            database_url: self.postgres.database_url.clone(),
            max_pool_size: self.postgres.max_connections,
            min_pool_size: self.postgres.min_connections,
            connection_timeout_sec: self.postgres.connect_timeout,
            idle_timeout_sec: self.postgres.idle_timeout,
            max_retries: self.postgres.max_retries,
            retry_delay_ms: self.postgres.retry_delay_ms,
        }))
    }

    /// Convert to PostgresConfig when the feature is disabled.
    #[cfg(not(feature = "postgres-repo"))]
    pub fn to_postgres_config(&self) -> Result<Option<PostgresConfig>, RepositoryError> {
        let repo_type = self.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;

        if repo_type == RepositoryType::Postgres {
            return Err(RepositoryError::configuration(
                "Postgres repository feature not enabled",
            ));
        }

        Ok(None)
    }
}
