//! Request and response shapes specific to the HTTP API.
//!
//! Entity bodies are the model types themselves; listing queries
//! deserialize straight into [`crate::paging::PagedQuery`].

use serde::{Deserialize, Serialize};

/// Query string of the plain `GET /` listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListParams {
    pub include_inactive: bool,
}

/// Query string of `GET /api/medical-devices/maintenance-due`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaintenanceParams {
    /// Look-ahead window in days.
    pub days: Option<i64>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
    /// Database connection status
    pub database: String,
}
