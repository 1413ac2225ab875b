//! Partner (supplier, insurer, ...) repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Partner, PartnerId, PartnerInput};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

#[async_trait]
pub trait PartnerRepository: Send + Sync {
    /// Fails with `Conflict` when the fiscal code is already registered.
    async fn create_partner(&self, input: &PartnerInput) -> RepositoryResult<Partner>;

    async fn get_partner(&self, id: PartnerId) -> RepositoryResult<Partner>;

    async fn update_partner(&self, id: PartnerId, input: &PartnerInput)
        -> RepositoryResult<Partner>;

    async fn deactivate_partner(&self, id: PartnerId) -> RepositoryResult<()>;

    async fn list_partners(&self, include_inactive: bool) -> RepositoryResult<Vec<Partner>>;

    async fn get_partners_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<Partner>>;

    async fn get_partners_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<Partner>>;

    /// `fiscal_code` must already be normalized (no `RO` prefix).
    async fn find_partner_by_fiscal_code(
        &self,
        fiscal_code: &str,
    ) -> RepositoryResult<Option<Partner>>;
}
