//! Department hierarchy repository trait.
//!
//! Departments form a three-level tree: categories, specialties and
//! subspecialties. The repository stores the tree; hierarchy rules are
//! checked by the department service before writes reach it.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Department, DepartmentId, DepartmentInput, DepartmentKind};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    /// Fails with `Conflict` when a sibling already has the same name.
    async fn create_department(&self, input: &DepartmentInput) -> RepositoryResult<Department>;

    async fn get_department(&self, id: DepartmentId) -> RepositoryResult<Department>;

    async fn update_department(
        &self,
        id: DepartmentId,
        input: &DepartmentInput,
    ) -> RepositoryResult<Department>;

    async fn deactivate_department(&self, id: DepartmentId) -> RepositoryResult<()>;

    async fn list_departments(&self, include_inactive: bool) -> RepositoryResult<Vec<Department>>;

    async fn get_departments_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Department>>;

    async fn get_departments_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Department>>;

    /// Active direct children of `parent`, ordered by name.
    async fn department_children(&self, parent: DepartmentId)
        -> RepositoryResult<Vec<Department>>;

    /// Active departments of one level, ordered by name.
    async fn list_departments_by_kind(
        &self,
        kind: DepartmentKind,
    ) -> RepositoryResult<Vec<Department>>;
}
