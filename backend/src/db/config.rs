//! SQL Server connection configuration and environment variable handling.

use std::env;
use std::time::Duration;

/// SQL Server connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlServerConfig {
    /// SQL Server hostname
    pub server: String,
    /// SQL Server port (default: 1433)
    pub port: u16,
    /// Database name
    pub database: String,
    /// SQL login
    pub username: String,
    /// SQL password
    pub password: String,
    /// Whether to trust the server certificate
    pub trust_cert: bool,
    /// Maximum pooled connections
    pub max_pool_size: u32,
    /// Connections kept open while idle
    pub min_pool_size: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout_sec: u64,
    /// Seconds before an idle connection is closed
    pub idle_timeout_sec: u64,
}

impl Default for SqlServerConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 1433,
            database: "ValyanMed".to_string(),
            username: String::new(),
            password: String::new(),
            trust_cert: true,
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
        }
    }
}

impl SqlServerConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DB_SERVER` (required): SQL Server hostname
    /// - `DB_DATABASE` (required): Database name
    /// - `DB_USERNAME` (required): SQL login
    /// - `DB_PASSWORD` (required): SQL password
    /// - `DB_PORT` (optional, default: 1433): SQL Server port
    /// - `DB_TRUST_CERT` (optional, default: true): Trust server certificate
    /// - `DB_POOL_MAX` (optional, default: 10): Maximum pooled connections
    /// - `DB_CONN_TIMEOUT_SEC` (optional, default: 30): Pool checkout timeout
    ///
    /// # Errors
    /// Returns an error if required variables are not set or malformed.
    pub fn from_env() -> Result<Self, String> {
        let server = env::var("DB_SERVER")
            .map_err(|_| "DB_SERVER environment variable not set".to_string())?;
        let database = env::var("DB_DATABASE")
            .map_err(|_| "DB_DATABASE environment variable not set".to_string())?;
        let username = env::var("DB_USERNAME")
            .map_err(|_| "DB_USERNAME environment variable not set".to_string())?;
        let password = env::var("DB_PASSWORD")
            .map_err(|_| "DB_PASSWORD environment variable not set".to_string())?;
        let port = env::var("DB_PORT")
            .unwrap_or_else(|_| "1433".to_string())
            .parse()
            .map_err(|_| "DB_PORT must be a valid port number".to_string())?;
        let trust_cert = env::var("DB_TRUST_CERT")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let max_pool_size = env::var("DB_POOL_MAX")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| "DB_POOL_MAX must be a positive integer".to_string())?;
        let connection_timeout_sec = env::var("DB_CONN_TIMEOUT_SEC")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| "DB_CONN_TIMEOUT_SEC must be a number of seconds".to_string())?;

        Ok(Self {
            server,
            port,
            database,
            username,
            password,
            trust_cert,
            max_pool_size,
            connection_timeout_sec,
            ..Default::default()
        })
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_sec)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_sec)
    }

    /// Build the tiberius client configuration (SQL login authentication).
    #[cfg(feature = "sqlserver-repo")]
    pub fn to_tiberius_config(&self) -> tiberius::Config {
        let mut config = tiberius::Config::new();
        config.host(&self.server);
        config.port(self.port);
        config.database(&self.database);
        config.authentication(tiberius::AuthMethod::sql_server(
            &self.username,
            &self.password,
        ));
        config.application_name("valyanmed");
        if self.trust_cert {
            config.trust_cert();
        }
        config
    }
}
