//! Server configuration read from the environment.

use std::env;

use chrono::Duration;
use rand::RngCore;

use crate::auth::{JwtKeys, PasswordHasher};
use crate::services::auth::AuthService;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWT_ISSUER: &str = "valyanmed";
pub const DEFAULT_JWT_TTL_MINUTES: i64 = 480;

/// Settings for the HTTP server and its authentication.
#[derive(Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HS256 signing secret.
    pub jwt_secret: String,
    /// True when no `JWT_SECRET` was set and a random one was generated.
    pub jwt_secret_generated: bool,
    pub jwt_issuer: String,
    pub jwt_ttl_minutes: i64,
    /// Allowed CORS origins; empty means any origin.
    pub cors_origins: Vec<String>,
    /// Password for the seeded `admin` account.
    pub admin_password: Option<String>,
    pub password_iterations: u32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_ttl_minutes", &self.jwt_ttl_minutes)
            .field("cors_origins", &self.cors_origins)
            .field("password_iterations", &self.password_iterations)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Read the configuration from process environment variables.
    ///
    /// # Environment Variables
    /// - `HOST` (default `0.0.0.0`), `PORT` (default `8080`)
    /// - `JWT_SECRET` (random per process when unset)
    /// - `JWT_ISSUER` (default `valyanmed`), `JWT_TTL_MINUTES` (default 480)
    /// - `CORS_ORIGINS`: comma separated list
    /// - `ADMIN_PASSWORD`: initial admin password
    /// - `PASSWORD_ITERATIONS`: PBKDF2 rounds for new hashes
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("PORT must be a valid port number, got '{}'", raw))?,
            None => DEFAULT_PORT,
        };
        let jwt_ttl_minutes = match var("JWT_TTL_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| {
                    format!("JWT_TTL_MINUTES must be a positive integer, got '{}'", raw)
                })?,
            None => DEFAULT_JWT_TTL_MINUTES,
        };
        let password_iterations = match var("PASSWORD_ITERATIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|i| *i > 0)
                .ok_or_else(|| {
                    format!("PASSWORD_ITERATIONS must be a positive integer, got '{}'", raw)
                })?,
            None => crate::auth::password::DEFAULT_ITERATIONS,
        };

        let (jwt_secret, jwt_secret_generated) = match var("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (random_secret(), true),
        };

        let cors_origins = var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty() && *o != "*")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            jwt_secret,
            jwt_secret_generated,
            jwt_issuer: var("JWT_ISSUER").unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string()),
            jwt_ttl_minutes,
            cors_origins,
            admin_password: lookup("ADMIN_PASSWORD").filter(|p| !p.is_empty()),
            password_iterations,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            JwtKeys::new(
                self.jwt_secret.as_bytes(),
                self.jwt_issuer.clone(),
                Duration::minutes(self.jwt_ttl_minutes),
            ),
            PasswordHasher::new(self.password_iterations),
        )
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.jwt_issuer, "valyanmed");
        assert_eq!(config.jwt_ttl_minutes, 480);
        assert!(config.jwt_secret_generated);
        assert_eq!(config.jwt_secret.len(), 64);
        assert!(config.cors_origins.is_empty());
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "9000"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_TTL_MINUTES", "15"),
            ("CORS_ORIGINS", "http://localhost:5000, https://valyanmed.ro,"),
            ("ADMIN_PASSWORD", "admin-pass-1"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert!(!config.jwt_secret_generated);
        assert_eq!(config.auth_service().keys().ttl(), Duration::minutes(15));
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:5000", "https://valyanmed.ro"]
        );
        assert_eq!(config.admin_password.as_deref(), Some("admin-pass-1"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("JWT_TTL_MINUTES", "0")]).is_err());
        assert!(config(&[("PASSWORD_ITERATIONS", "-1")]).is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = config(&[("JWT_SECRET", "do-not-print")]).unwrap();
        assert!(!format!("{:?}", config).contains("do-not-print"));
    }
}
