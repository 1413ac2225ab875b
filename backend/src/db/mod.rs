//! Database module for clinic data storage.
//!
//! This module provides abstractions for database operations via the Repository pattern,
//! allowing different storage backends to be swapped easily.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP API (axum handlers) / grid client                 │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (crate::services) - Validation & rules   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────────┐
//!     │ LocalRepository   SqlServerRepository (stored procedures)
//!     │ (in-memory)       feature `sqlserver-repo`
//!     └──────────────────────────────────┘
//! ```
//!
//! # Module Organization
//! - `repository`: Trait definitions for database operations
//! - `repositories::local`: In-memory implementation for tests and local development
//! - `repositories::sqlserver`: SQL Server implementation over tiberius + bb8
//! - `factory`: Factory and builder for creating repository instances
//! - `config` / `repo_config`: Environment and `repository.toml` configuration

#[cfg(not(any(feature = "sqlserver-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod config;
pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

pub use config::SqlServerConfig;
pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::{RepositoryConfig, DEFAULT_CONFIG_PATHS};
pub use repositories::LocalRepository;
#[cfg(feature = "sqlserver-repo")]
pub use repositories::SqlServerRepository;
pub use repository::{
    DepartmentRepository, DeviceRepository, ErrorContext, FullRepository, HealthRepository,
    MedicationRepository, PartnerRepository, PatientRepository, RepositoryError,
    RepositoryResult, StaffRepository, UserRepository,
};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Global repository instance initialized once per process.
static REPOSITORY: OnceLock<Arc<dyn FullRepository>> = OnceLock::new();

/// Create the repository selected by configuration.
///
/// A `repository.toml` in a standard location wins; otherwise the
/// `REPOSITORY_TYPE` / `DB_*` environment variables decide.
pub async fn create_configured_repository() -> RepositoryResult<Arc<dyn FullRepository>> {
    create_repository_from_paths(&DEFAULT_CONFIG_PATHS).await
}

/// [`create_configured_repository`] over explicit config file locations.
///
/// The environment is only consulted when none of `paths` exists. A file
/// that exists but fails to read or parse is an error.
pub async fn create_repository_from_paths<P: AsRef<Path>>(
    paths: &[P],
) -> RepositoryResult<Arc<dyn FullRepository>> {
    match RepositoryConfig::find_in(paths)? {
        Some(config) => {
            log::info!(
                "Using repository.toml (type = {})",
                config.repository.repo_type
            );
            RepositoryBuilder::new().apply_config(&config)?.build().await
        }
        None => {
            log::info!(
                "No repository.toml found; using {:?} repository from environment",
                RepositoryType::from_env()
            );
            RepositoryFactory::from_env().await
        }
    }
}

/// Initialize the global repository singleton for the configured backend.
///
/// Subsequent calls return the already-initialized instance.
pub async fn init_repository() -> Result<&'static Arc<dyn FullRepository>> {
    if let Some(repo) = REPOSITORY.get() {
        return Ok(repo);
    }

    let repo = create_configured_repository()
        .await
        .map_err(|e| anyhow::Error::msg(e.to_string()))
        .context("Failed to create repository")?;
    let _ = REPOSITORY.set(repo);
    get_repository()
}

/// Get a reference to the global repository instance.
pub fn get_repository() -> Result<&'static Arc<dyn FullRepository>> {
    REPOSITORY
        .get()
        .context("Database not initialized. Call init_repository() first.")
}
