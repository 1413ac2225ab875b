//! Medical device repository trait.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::RepositoryResult;
use crate::models::{DeviceId, DeviceInput, MedicalDevice};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Fails with `Conflict` when the serial number is already registered.
    async fn create_device(&self, input: &DeviceInput) -> RepositoryResult<MedicalDevice>;

    async fn get_device(&self, id: DeviceId) -> RepositoryResult<MedicalDevice>;

    async fn update_device(
        &self,
        id: DeviceId,
        input: &DeviceInput,
    ) -> RepositoryResult<MedicalDevice>;

    async fn deactivate_device(&self, id: DeviceId) -> RepositoryResult<()>;

    async fn list_devices(&self, include_inactive: bool) -> RepositoryResult<Vec<MedicalDevice>>;

    async fn get_devices_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<MedicalDevice>>;

    async fn get_devices_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<MedicalDevice>>;

    /// Active, non-retired devices whose next maintenance falls on or before
    /// `before`, soonest first.
    async fn devices_due_for_maintenance(
        &self,
        before: NaiveDate,
    ) -> RepositoryResult<Vec<MedicalDevice>>;
}
