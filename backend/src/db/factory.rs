//! Repository factory for dependency injection.
//!
//! This module provides utilities for creating and configuring repository instances
//! based on runtime configuration.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::config::SqlServerConfig;
use super::repo_config::RepositoryConfig;
use super::repositories::LocalRepository;
#[cfg(feature = "sqlserver-repo")]
use super::repositories::SqlServerRepository;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// SQL Server through stored procedures
    SqlServer,
    /// In-memory local repository
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string.
    ///
    /// # Arguments
    /// * `s` - String representation ("sqlserver", "mssql", "local")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlserver" | "sql_server" | "mssql" => Ok(Self::SqlServer),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Get repository type from environment variable.
    ///
    /// Reads `REPOSITORY_TYPE`. Without it, defaults to SQL Server when
    /// `DB_SERVER` is set, otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            return val.parse().unwrap_or(Self::Local);
        }

        if std::env::var("DB_SERVER").is_ok() {
            Self::SqlServer
        } else {
            Self::Local
        }
    }
}

#[cfg(not(feature = "sqlserver-repo"))]
fn sqlserver_disabled() -> RepositoryError {
    RepositoryError::configuration("SQL Server repository feature not enabled")
}

/// Repository factory for creating repository instances.
///
/// # Example
/// ```ignore
/// use valyanmed::db::{RepositoryFactory, RepositoryType, SqlServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Requires the `sqlserver-repo` feature.
///     let config = SqlServerConfig::from_env()?;
///     let _sql = RepositoryFactory::create(RepositoryType::SqlServer, Some(&config)).await?;
///
///     let local_repo = RepositoryFactory::create_local();
///     Ok(())
/// }
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance based on type.
    ///
    /// # Arguments
    /// * `repo_type` - Type of repository to create
    /// * `sql_config` - Connection settings (required for SQL Server)
    ///
    /// # Returns
    /// * `Ok(Arc<dyn FullRepository>)` - Shared repository instance
    /// * `Err(RepositoryError)` - If creation fails
    pub async fn create(
        repo_type: RepositoryType,
        sql_config: Option<&SqlServerConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        match repo_type {
            RepositoryType::SqlServer => {
                #[cfg(feature = "sqlserver-repo")]
                {
                    let config = sql_config.ok_or_else(|| {
                        RepositoryError::configuration(
                            "SQL Server repository requires SqlServerConfig",
                        )
                    })?;
                    let repo = Self::create_sqlserver(config).await?;
                    Ok(repo as Arc<dyn FullRepository>)
                }
                #[cfg(not(feature = "sqlserver-repo"))]
                {
                    let _ = sql_config;
                    Err(sqlserver_disabled())
                }
            }
            RepositoryType::Local => Ok(Self::create_local()),
        }
    }

    /// Create a SQL Server repository with a connection pool.
    #[cfg(feature = "sqlserver-repo")]
    pub async fn create_sqlserver(
        config: &SqlServerConfig,
    ) -> RepositoryResult<Arc<SqlServerRepository>> {
        let repo = SqlServerRepository::connect(config).await?;
        Ok(Arc::new(repo))
    }

    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create repository from environment configuration.
    ///
    /// Reads `REPOSITORY_TYPE` to determine which repository to create;
    /// SQL Server settings come from the `DB_*` variables.
    pub async fn from_env() -> RepositoryResult<Arc<dyn FullRepository>> {
        match RepositoryType::from_env() {
            RepositoryType::SqlServer => {
                let config =
                    SqlServerConfig::from_env().map_err(RepositoryError::configuration)?;
                Self::create(RepositoryType::SqlServer, Some(&config)).await
            }
            RepositoryType::Local => Ok(Self::create_local()),
        }
    }

    /// Create repository from a TOML configuration file.
    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config).await
    }

    /// Create repository from the default configuration file location.
    ///
    /// Searches for `repository.toml` in standard locations and creates
    /// the appropriate repository instance.
    pub async fn from_default_config() -> RepositoryResult<Arc<dyn FullRepository>> {
        let config = RepositoryConfig::from_default_location()?;
        Self::from_repository_config(&config).await
    }

    async fn from_repository_config(
        config: &RepositoryConfig,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let repo_type = config.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;
        let sql_config = config.to_sqlserver_config()?;
        Self::create(repo_type, sql_config.as_ref()).await
    }
}

/// Builder for configuring repository creation.
///
/// # Example
/// ```ignore
/// use valyanmed::db::{RepositoryBuilder, RepositoryType};
///
/// let repo = RepositoryBuilder::new()
///     .repository_type(RepositoryType::Local)
///     .build()
///     .await?;
/// ```
pub struct RepositoryBuilder {
    repo_type: RepositoryType,
    sql_config: Option<SqlServerConfig>,
}

impl RepositoryBuilder {
    /// Create a new repository builder; the type defaults per
    /// [`RepositoryType::from_env`].
    pub fn new() -> Self {
        Self {
            repo_type: RepositoryType::from_env(),
            sql_config: None,
        }
    }

    /// Set the repository type.
    pub fn repository_type(mut self, repo_type: RepositoryType) -> Self {
        self.repo_type = repo_type;
        self
    }

    /// Set the SQL Server configuration.
    pub fn sqlserver_config(mut self, config: SqlServerConfig) -> Self {
        self.sql_config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Result<Self, RepositoryError> {
        self.repo_type = RepositoryType::from_env();
        if self.repo_type == RepositoryType::SqlServer {
            let config = SqlServerConfig::from_env().map_err(RepositoryError::configuration)?;
            self.sql_config = Some(config);
        }
        Ok(self)
    }

    /// Load configuration from a TOML file.
    pub fn from_config_file<P: AsRef<Path>>(
        self,
        config_path: P,
    ) -> Result<Self, RepositoryError> {
        let repo_config = RepositoryConfig::from_file(config_path)?;
        self.apply_config(&repo_config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `repository.toml` in standard locations.
    pub fn from_default_config(self) -> Result<Self, RepositoryError> {
        let repo_config = RepositoryConfig::from_default_location()?;
        self.apply_config(&repo_config)
    }

    /// Take the repository type and SQL Server settings from a parsed config.
    pub fn apply_config(mut self, repo_config: &RepositoryConfig) -> Result<Self, RepositoryError> {
        self.repo_type = repo_config.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;
        self.sql_config = repo_config.to_sqlserver_config()?;
        Ok(self)
    }

    /// Build the repository instance.
    pub async fn build(self) -> RepositoryResult<Arc<dyn FullRepository>> {
        RepositoryFactory::create(self.repo_type, self.sql_config.as_ref()).await
    }
}

impl Default for RepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
