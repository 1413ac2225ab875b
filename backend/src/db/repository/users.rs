//! User account repository trait.
//!
//! Accounts are stored with their password hash; hashing and verification
//! happen in the auth layer, never in a repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{UserAccount, UserDraft, UserId};
use crate::paging::{GroupedResult, PagedQuery, PagedResult};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username is taken (case-insensitive).
    async fn create_user(&self, draft: &UserDraft) -> RepositoryResult<UserAccount>;

    async fn get_user(&self, id: UserId) -> RepositoryResult<UserAccount>;

    /// The username in `draft` is ignored; usernames never change.
    async fn update_user(&self, id: UserId, draft: &UserDraft) -> RepositoryResult<UserAccount>;

    async fn deactivate_user(&self, id: UserId) -> RepositoryResult<()>;

    async fn list_users(&self, include_inactive: bool) -> RepositoryResult<Vec<UserAccount>>;

    async fn get_users_paged(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<PagedResult<UserAccount>>;

    async fn get_users_grouped(
        &self,
        query: &PagedQuery,
    ) -> RepositoryResult<GroupedResult<UserAccount>>;

    /// Case-insensitive lookup, active or not.
    async fn find_user_by_username(&self, username: &str)
        -> RepositoryResult<Option<UserAccount>>;

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> RepositoryResult<()>;

    /// Number of accounts, active or not. Used to seed the first admin.
    async fn count_users(&self) -> RepositoryResult<u64>;
}
