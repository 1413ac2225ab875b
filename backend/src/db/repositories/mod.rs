//! Repository implementations module.
//!
//! - `local`: In-memory implementation for unit testing and local development
//! - `sqlserver`: SQL Server implementation over stored procedures

pub mod local;
#[cfg(feature = "sqlserver-repo")]
pub mod sqlserver;

pub use local::LocalRepository;
#[cfg(feature = "sqlserver-repo")]
pub use sqlserver::SqlServerRepository;
