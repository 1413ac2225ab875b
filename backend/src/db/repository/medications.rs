//! Medication repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Medication, MedicationId, MedicationInput};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

#[async_trait]
pub trait MedicationRepository: Send + Sync {
    async fn create_medication(&self, input: &MedicationInput) -> RepositoryResult<Medication>;

    async fn get_medication(&self, id: MedicationId) -> RepositoryResult<Medication>;

    async fn update_medication(
        &self,
        id: MedicationId,
        input: &MedicationInput,
    ) -> RepositoryResult<Medication>;

    async fn deactivate_medication(&self, id: MedicationId) -> RepositoryResult<()>;

    async fn list_medications(&self, include_inactive: bool) -> RepositoryResult<Vec<Medication>>;

    async fn get_medications_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Medication>>;

    async fn get_medications_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Medication>>;

    /// Active medications at or below their minimum stock.
    async fn low_stock_medications(&self) -> RepositoryResult<Vec<Medication>>;

    /// Apply a stock movement atomically.
    ///
    /// # Returns
    /// * `Ok(Medication)` - The record with the new quantity
    /// * `Err(RepositoryError::ValidationError)` - If the result would be negative
    /// * `Err(RepositoryError::NotFound)` - If the medication doesn't exist
    async fn adjust_medication_stock(
        &self,
        id: MedicationId,
        delta: i32,
    ) -> RepositoryResult<Medication>;
}
