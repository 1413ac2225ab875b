//! Medical staff repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{DepartmentId, MedicalStaff, StaffId, StaffInput};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

/// Repository trait for medical personnel.
///
/// Returned records carry the resolved category, specialty and subspecialty
/// names for their department ids.
#[async_trait]
pub trait StaffRepository: Send + Sync {
    /// Fails with `Conflict` when the license number is already in use.
    async fn create_staff(&self, input: &StaffInput) -> RepositoryResult<MedicalStaff>;

    async fn get_staff(&self, id: StaffId) -> RepositoryResult<MedicalStaff>;

    async fn update_staff(&self, id: StaffId, input: &StaffInput)
        -> RepositoryResult<MedicalStaff>;

    async fn deactivate_staff(&self, id: StaffId) -> RepositoryResult<()>;

    async fn list_staff(&self, include_inactive: bool) -> RepositoryResult<Vec<MedicalStaff>>;

    async fn get_staff_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<MedicalStaff>>;

    async fn get_staff_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<MedicalStaff>>;

    /// Active staff placed in `department` at any hierarchy level.
    async fn list_staff_by_department(
        &self,
        department: DepartmentId,
    ) -> RepositoryResult<Vec<MedicalStaff>>;
}
