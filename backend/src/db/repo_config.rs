//! Repository configuration file support.
//!
//! This module provides utilities for reading repository configuration from
//! TOML configuration files:
//!
//! ```toml
//! [repository]
//! type = "sqlserver"
//!
//! [sqlserver]
//! server = "db.clinic.local"
//! database = "ValyanMed"
//! username = "valyan_app"
//! password_env = "DB_PASSWORD"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::config::SqlServerConfig;
use super::factory::RepositoryType;
use super::repository::RepositoryError;

/// Standard `repository.toml` locations, searched in order.
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "repository.toml",
    "backend/repository.toml",
    "../repository.toml",
];

/// Repository configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub repository: RepositorySettings,
    #[serde(default)]
    pub sqlserver: SqlServerSettings,
}

/// Repository type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type")]
    pub repo_type: String,
}

/// SQL Server connection settings.
///
/// The password may be given inline or, preferably, through the environment
/// variable named by `password_env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlServerSettings {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default = "default_trust_cert")]
    pub trust_cert: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
}

impl Default for SqlServerSettings {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            password_env: None,
            trust_cert: default_trust_cert(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
        }
    }
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1433
}

fn default_trust_cert() -> bool {
    true
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

        Self::from_toml_str(&content)
    }

    /// Parse repository configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, RepositoryError> {
        toml::from_str(content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load the first of `paths` that exists.
    ///
    /// # Returns
    /// * `Ok(None)` if none of the files exists
    /// * `Err(RepositoryError)` if the file exists but cannot be read or parsed
    pub fn find_in<P: AsRef<Path>>(paths: &[P]) -> Result<Option<Self>, RepositoryError> {
        for path in paths {
            let path = path.as_ref();
            if path.exists() {
                return Self::from_file(path).map(Some);
            }
        }
        Ok(None)
    }

    /// Load repository configuration from the default location.
    ///
    /// Searches [`DEFAULT_CONFIG_PATHS`]: the current directory, `backend/`,
    /// then the parent directory.
    pub fn from_default_location() -> Result<Self, RepositoryError> {
        Self::find_in(&DEFAULT_CONFIG_PATHS)?.ok_or_else(|| {
            RepositoryError::configuration("No repository.toml found in standard locations")
        })
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> Result<RepositoryType, String> {
        RepositoryType::from_str(&self.repository.repo_type)
    }

    /// Convert to a [`SqlServerConfig`] if this is a SQL Server configuration.
    ///
    /// Returns `Ok(None)` for other repository types.
    pub fn to_sqlserver_config(&self) -> Result<Option<SqlServerConfig>, RepositoryError> {
        let repo_type = self.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;

        if repo_type != RepositoryType::SqlServer {
            return Ok(None);
        }

        let settings = &self.sqlserver;
        if settings.database.is_empty() || settings.username.is_empty() {
            return Err(RepositoryError::configuration(
                "SQL Server repository requires 'sqlserver.database' and 'sqlserver.username'",
            ));
        }

        let password = match &settings.password_env {
            Some(var) => env::var(var).map_err(|_| {
                RepositoryError::configuration(format!(
                    "Environment variable {} (sqlserver.password_env) is not set",
                    var
                ))
            })?,
            None => settings.password.clone(),
        };

        Ok(Some(SqlServerConfig {
            server: settings.server.clone(),
            port: settings.port,
            database: settings.database.clone(),
            username: settings.username.clone(),
            password,
            trust_cert: settings.trust_cert,
            max_pool_size: settings.max_connections,
            min_pool_size: settings.min_connections,
            connection_timeout_sec: settings.connect_timeout,
            idle_timeout_sec: settings.idle_timeout,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_config() {
        let toml = r#"
[repository]
type = "local"
"#;

        let config = RepositoryConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.repository.repo_type, "local");
        assert_eq!(config.repository_type().unwrap(), RepositoryType::Local);
        assert!(config.to_sqlserver_config().unwrap().is_none());
    }

    #[test]
    fn test_parse_sqlserver_config() {
        let toml = r#"
[repository]
type = "sqlserver"

[sqlserver]
server = "db.clinic.local"
port = 14330
database = "ValyanMed"
username = "valyan_app"
password = "s3cret"
trust_cert = false
max_connections = 20
connect_timeout = 15
"#;

        let config = RepositoryConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.repository_type().unwrap(), RepositoryType::SqlServer);

        let sql = config.to_sqlserver_config().unwrap().unwrap();
        assert_eq!(sql.server, "db.clinic.local");
        assert_eq!(sql.port, 14330);
        assert_eq!(sql.password, "s3cret");
        assert!(!sql.trust_cert);
        assert_eq!(sql.max_pool_size, 20);
        assert_eq!(sql.min_pool_size, 1);
        assert_eq!(sql.connection_timeout_sec, 15);
    }

    #[test]
    fn test_sqlserver_requires_database() {
        let toml = r#"
[repository]
type = "sqlserver"
"#;

        let config = RepositoryConfig::from_toml_str(toml).unwrap();
        assert!(config.to_sqlserver_config().is_err());
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = RepositoryConfig::from_toml_str("[repository").unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationError { .. }));
    }
}
