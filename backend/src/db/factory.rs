//! Repository factory for dependency injection.
//!
//! Selects and constructs the venue repository backend from runtime
//! configuration. The result is handed to the HTTP layer as an
//! `Arc<dyn VenueRepository>`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositoryConfig;
use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
use super::repository::{RepositoryError, RepositoryResult, VenueRepository};
use super::PostgresConfig;

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Postgres + Diesel implementation
    Postgres,
    /// In-memory local repository
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string ("postgres", "pg", "local").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Get repository type from environment variable.
    ///
    /// Reads `REPOSITORY_TYPE`. Defaults to Postgres if a database URL is
    /// present, otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            return val.parse().unwrap_or(Self::Local);
        }

        if std::env::var("DATABASE_URL").is_ok() || std::env::var("PG_DATABASE_URL").is_ok() {
            Self::Postgres
        } else {
            Self::Local
        }
    }
}

/// Repository factory for creating repository instances.
///
/// # Example
/// ```
/// use venue_map::db::RepositoryFactory;
///
/// let repo = RepositoryFactory::create_local();
/// # let _ = repo;
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance based on type.
    ///
    /// # Arguments
    /// * `repo_type` - Type of repository to create
    /// * `postgres_config` - Optional database configuration (required for Postgres)
    /// * `seed_file` - Optional venue documents for the local repository
    ///
    /// # Returns
    /// * `Ok(Arc<dyn VenueRepository>)` - Shared repository instance
    /// * `Err(RepositoryError)` - If creation fails
    pub async fn create(
        repo_type: RepositoryType,
        postgres_config: Option<&PostgresConfig>,
        seed_file: Option<&Path>,
    ) -> RepositoryResult<Arc<dyn VenueRepository>> {
        match repo_type {
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    if seed_file.is_some() {
                        log::warn!("Ignoring venue seed file for the Postgres repository");
                    }
                    let config = postgres_config.ok_or_else(|| {
                        RepositoryError::configuration(
                            "Postgres repository requires PostgresConfig",
                        )
                    })?;
                    let pg = Self::create_postgres(config).await?;
                    Ok(pg as Arc<dyn VenueRepository>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    let _ = (postgres_config, seed_file);
                    Err(RepositoryError::configuration(
                        "Postgres repository feature not enabled",
                    ))
                }
            }
            RepositoryType::Local => match seed_file {
                Some(path) => Self::create_local_seeded(path),
                None => Ok(Self::create_local()),
            },
        }
    }

    /// Create a Postgres repository.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> RepositoryResult<Arc<PostgresRepository>> {
        let config = config.clone();
        // Pool construction and migrations block on the network.
        let repo = tokio::task::spawn_blocking(move || PostgresRepository::new(config))
            .await
            .map_err(|e| RepositoryError::internal(format!("Task join error: {}", e)))??;
        Ok(Arc::new(repo))
    }

    /// Create an empty in-memory local repository.
    pub fn create_local() -> Arc<dyn VenueRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create an in-memory repository seeded from raw venue documents.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConfigurationError)` - If the seed file is unusable
    pub fn create_local_seeded(path: &Path) -> RepositoryResult<Arc<dyn VenueRepository>> {
        let repo = LocalRepository::from_seed_file(path).map_err(|e| {
            RepositoryError::configuration(format!(
                "Failed to load venue seed file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Arc::new(repo))
    }

    /// Create repository from environment configuration.
    ///
    /// Reads `REPOSITORY_TYPE`, the Postgres variables and `VENUE_SEED_FILE`.
    pub async fn from_env() -> RepositoryResult<Arc<dyn VenueRepository>> {
        RepositoryBuilder::new().from_env()?.build().await
    }

    /// Create repository from a TOML configuration file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the venue-map.toml configuration file
    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn VenueRepository>> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config).await
    }

    /// Create repository from a RepositoryConfig instance.
    pub async fn from_repository_config(
        config: &RepositoryConfig,
    ) -> RepositoryResult<Arc<dyn VenueRepository>> {
        RepositoryBuilder::new()
            .with_repository_config(config)?
            .build()
            .await
    }
}

/// Builder for configuring repository creation.
///
/// # Example
/// ```ignore
/// use venue_map::db::{RepositoryBuilder, RepositoryType};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let repo = RepositoryBuilder::new()
///         .repository_type(RepositoryType::Local)
///         .seed_file("data/venues.json")
///         .build()
///         .await?;
///     Ok(())
/// }
/// ```
pub struct RepositoryBuilder {
    repo_type: RepositoryType,
    seed_file: Option<PathBuf>,
    #[cfg(feature = "postgres-repo")]
    postgres_config: Option<PostgresConfig>,
}

impl RepositoryBuilder {
    /// Create a new repository builder with default settings.
    ///
    /// Defaults to Postgres if configured, otherwise Local.
    pub fn new() -> Self {
        Self {
            repo_type: RepositoryType::from_env(),
            seed_file: None,
            #[cfg(feature = "postgres-repo")]
            postgres_config: None,
        }
    }

    /// Set the repository type.
    pub fn repository_type(mut self, repo_type: RepositoryType) -> Self {
        self.repo_type = repo_type;
        self
    }

    /// Seed the local repository from a JSON file of venue documents.
    pub fn seed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_file = Some(path.into());
        self
    }

    /// Set the Postgres configuration.
    #[cfg(feature = "postgres-repo")]
    pub fn postgres_config(mut self, config: PostgresConfig) -> Self {
        self.postgres_config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Result<Self, RepositoryError> {
        self.repo_type = RepositoryType::from_env();
        if let Ok(seed) = std::env::var("VENUE_SEED_FILE") {
            self.seed_file = Some(PathBuf::from(seed));
        }

        if self.repo_type == RepositoryType::Postgres {
            #[cfg(feature = "postgres-repo")]
            {
                let config =
                    PostgresConfig::from_env().map_err(RepositoryError::configuration)?;
                self.postgres_config = Some(config);
            }
            #[cfg(not(feature = "postgres-repo"))]
            {
                return Err(RepositoryError::configuration(
                    "Postgres repository feature not enabled",
                ));
            }
        }

        Ok(self)
    }

    /// Take every setting from a parsed configuration.
    pub fn with_repository_config(
        mut self,
        config: &RepositoryConfig,
    ) -> Result<Self, RepositoryError> {
        self.repo_type = config.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;
        self.seed_file = config.repository.seed_file.clone();

        let pg_config = config.to_postgres_config()?;
        #[cfg(feature = "postgres-repo")]
        {
            self.postgres_config = pg_config;
        }
        #[cfg(not(feature = "postgres-repo"))]
        let _ = pg_config;

        Ok(self)
    }

    /// Load configuration from a TOML file.
    pub fn from_config_file<P: AsRef<Path>>(self, config_path: P) -> Result<Self, RepositoryError> {
        let repo_config = RepositoryConfig::from_file(config_path)?;
        self.with_repository_config(&repo_config)
    }

    /// Load configuration from the default location.
    pub fn from_default_config(self) -> Result<Self, RepositoryError> {
        let repo_config = RepositoryConfig::from_default_location()?;
        self.with_repository_config(&repo_config)
    }

    /// Build the repository instance.
    pub async fn build(self) -> RepositoryResult<Arc<dyn VenueRepository>> {
        #[cfg(feature = "postgres-repo")]
        let pg_config = self.postgres_config.as_ref();
        #[cfg(not(feature = "postgres-repo"))]
        let pg_config = None;

        log::info!("Creating {:?} venue repository", self.repo_type);
        RepositoryFactory::create(self.repo_type, pg_config, self.seed_file.as_deref()).await
    }
}

impl Default for RepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
