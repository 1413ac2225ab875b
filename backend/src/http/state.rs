//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::services::auth::AuthService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    /// Token keys and password policy
    pub auth: Arc<AuthService>,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// Create a new application state with the given repository and auth service.
    pub fn new(repository: Arc<dyn FullRepository>, auth: AuthService) -> Self {
        Self {
            repository,
            auth: Arc::new(auth),
            cors_origins: Vec::new(),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}
