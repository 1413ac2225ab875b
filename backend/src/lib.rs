//! # ValyanMed backend
//!
//! Administration backend for a clinic: patients, medical staff, medical
//! devices, medications, partners, departments and user accounts.
//!
//! ## Architecture
//!
//! - [`models`]: entity records, inputs and id newtypes
//! - [`paging`]: paged / grouped listing envelope shared by every entity
//! - [`outcome`]: the `{isSuccess, value, errors}` envelope
//! - [`db`]: repository traits with in-memory and SQL Server backends
//! - [`services`]: validation and business rules per entity, login
//! - [`auth`]: password hashing and JWT bearer tokens
//! - [`http`]: axum REST API (feature `http-server`)
//! - [`grid`]: data-grid settings, debounced search and paging controller
//! - [`client`]: reqwest API client (feature `client`)

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod grid;
pub mod models;
pub mod outcome;
pub mod paging;
pub mod services;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "http-server")]
pub mod http;
