//! HTTP server module for the ValyanMed backend.
//!
//! Exposes the service layer as a REST API under `/api`, guarded by JWT
//! bearer authentication.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Bearer-token middleware, admin guard                   │
//! │  - Outcome envelopes, status code mapping                 │
//! │  - CORS, compression, tracing                             │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (crate::services)                          │
//! │  - Validation and business rules                          │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repository Layer (crate::db)                             │
//! │  - LocalRepository / SqlServerRepository                  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use router::create_router;
pub use state::AppState;
