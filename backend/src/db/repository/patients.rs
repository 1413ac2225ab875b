//! Patient repository trait.
//!
//! Patients are identified by their personal numeric code (CNP), which is
//! unique across active and inactive records.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Patient, PatientId, PatientInput};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

/// Repository trait for patient records.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Insert a new patient.
    ///
    /// # Arguments
    /// * `input` - Validated, cleaned patient fields
    ///
    /// # Returns
    /// * `Ok(Patient)` - The stored record with its assigned ID
    /// * `Err(RepositoryError::Conflict)` - If the CNP is already registered
    async fn create_patient(&self, input: &PatientInput) -> RepositoryResult<Patient>;

    /// Retrieve a patient by ID, active or not.
    ///
    /// # Returns
    /// * `Ok(Patient)` - The record
    /// * `Err(RepositoryError::NotFound)` - If the patient doesn't exist
    async fn get_patient(&self, id: PatientId) -> RepositoryResult<Patient>;

    /// Replace the editable fields of a patient.
    ///
    /// `input.is_active` of `None` keeps the current flag.
    ///
    /// # Returns
    /// * `Ok(Patient)` - The updated record
    /// * `Err(RepositoryError::NotFound)` - If the patient doesn't exist
    /// * `Err(RepositoryError::Conflict)` - If the new CNP belongs to another patient
    async fn update_patient(&self, id: PatientId, input: &PatientInput)
        -> RepositoryResult<Patient>;

    /// Soft delete: marks the patient inactive.
    async fn deactivate_patient(&self, id: PatientId) -> RepositoryResult<()>;

    /// All patients ordered by name; inactive ones only when requested.
    async fn list_patients(&self, include_inactive: bool) -> RepositoryResult<Vec<Patient>>;

    /// One page of patients filtered, sorted and sliced per `query`.
    ///
    /// The query is expected to be normalized.
    async fn get_patients_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Patient>>;

    /// Patients grouped by `query.group_by`; groups are paged, not rows.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ValidationError)` - If the group column is missing or unknown
    async fn get_patients_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Patient>>;

    /// Look up a patient by CNP regardless of the active flag.
    async fn find_patient_by_cnp(&self, cnp: &str) -> RepositoryResult<Option<Patient>>;
}
