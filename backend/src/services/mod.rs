//! Service layer for validation and orchestration.
//!
//! Services sit between the HTTP handlers and the repository traits. Each
//! operation cleans and validates its input, calls the repository and maps
//! storage failures onto a [`ServiceError`] the API can report.
//!
//! Services are plain async functions generic over the repository trait they
//! need, so they run unchanged against the in-memory store in tests and the
//! SQL Server store in production.

pub mod auth;
pub mod departments;
pub mod devices;
pub mod medications;
pub mod partners;
pub mod patients;
pub mod staff;
pub mod users;
pub mod validation;

use std::fmt;

use crate::db::repository::RepositoryError;
use crate::paging::{resolve_column, Pageable, PagedQuery};

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Category of a service failure. Drives the HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    Internal,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceErrorKind::Validation => "validation",
            ServiceErrorKind::NotFound => "not_found",
            ServiceErrorKind::Conflict => "conflict",
            ServiceErrorKind::Unauthorized => "unauthorized",
            ServiceErrorKind::Forbidden => "forbidden",
            ServiceErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Failure of a service operation, carrying every message the caller should see.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {}", .messages.join("; "))]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub messages: Vec<String>,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            messages: vec![message.into()],
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Validation, message)
    }

    /// Validation failure with several messages (one per offending field).
    pub fn validation_many(messages: Vec<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Validation,
            messages,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Conflict, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Internal, message)
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is(&self, kind: ServiceErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match &err {
            RepositoryError::NotFound { message, .. } => ServiceError::not_found(message.clone()),
            RepositoryError::ValidationError { message, .. } => {
                ServiceError::validation(message.clone())
            }
            RepositoryError::Conflict { message, .. } => ServiceError::conflict(message.clone()),
            _ => {
                log::error!("Repository failure: {}", err);
                ServiceError::internal(err.to_string())
            }
        }
    }
}

/// Normalize a listing query and canonicalize its sort/group columns against
/// what the record type exposes.
///
/// An unknown sort column is dropped so the listing falls back to id order.
/// An unknown group column is a validation error, as is a missing one when
/// `require_group` is set.
pub fn check_listing_query<T: Pageable>(
    query: &PagedQuery,
    require_group: bool,
) -> ServiceResult<PagedQuery> {
    let mut query = query.normalized();
    let mut errors = Vec::new();

    if let Some(column) = query.sort_column.take() {
        match resolve_column(T::SORT_COLUMNS, &column) {
            Some(canonical) => query.sort_column = Some(canonical.to_string()),
            None => log::debug!("Ignoring unknown sort column '{}'", column),
        }
    }

    match query.group_by.take() {
        Some(column) => match resolve_column(T::GROUP_COLUMNS, &column) {
            Some(canonical) => query.group_by = Some(canonical.to_string()),
            None => errors.push(format!(
                "Cannot group by '{}'. Allowed columns: {}",
                column,
                T::GROUP_COLUMNS.join(", ")
            )),
        },
        None if require_group => errors.push("A groupBy column is required".to_string()),
        None => {}
    }

    if errors.is_empty() {
        Ok(query)
    } else {
        Err(ServiceError::validation_many(errors))
    }
}
