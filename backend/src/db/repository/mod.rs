//! Repository trait definitions for database operations.
//!
//! Each clinic entity gets its own focused trait so implementations stay
//! readable and services only depend on what they use.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`patients`], [`staff`], [`devices`], [`medications`], [`partners`],
//!   [`departments`], [`users`]: per-entity CRUD and listing operations
//!
//! # Trait Composition
//!
//! A complete repository implements every entity trait; [`FullRepository`]
//! is the blanket bound used by the service layer and the HTTP state:
//!
//! ```ignore
//! async fn archive<R: FullRepository + ?Sized>(repo: &R, id: PatientId) -> RepositoryResult<()> {
//!     repo.deactivate_patient(id).await?;
//!     Ok(())
//! }
//! ```

pub mod departments;
pub mod devices;
pub mod error;
pub mod medications;
pub mod partners;
pub mod patients;
pub mod staff;
pub mod users;

use async_trait::async_trait;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use departments::DepartmentRepository;
pub use devices::DeviceRepository;
pub use medications::MedicationRepository;
pub use partners::PartnerRepository;
pub use patients::PatientRepository;
pub use staff::StaffRepository;
pub use users::UserRepository;

/// Connection-level operations shared by every backend.
#[async_trait]
pub trait HealthRepository: Send + Sync {
    /// Check if the database connection is healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;
}

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type that implements every entity
/// repository trait.
pub trait FullRepository:
    HealthRepository
    + PatientRepository
    + StaffRepository
    + DeviceRepository
    + MedicationRepository
    + PartnerRepository
    + DepartmentRepository
    + UserRepository
{
}

impl<T> FullRepository for T where
    T: HealthRepository
        + PatientRepository
        + StaffRepository
        + DeviceRepository
        + MedicationRepository
        + PartnerRepository
        + DepartmentRepository
        + UserRepository
{
}
