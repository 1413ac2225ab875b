//! Where a grid gets its rows from.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::outcome::Outcome;
use crate::paging::{group, paginate, GroupedResult, PagedQuery, PagedResult, Pageable};

/// Paged and grouped listing of one entity.
#[async_trait]
pub trait GridDataSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    async fn fetch_page(&self, query: &PagedQuery) -> Outcome<PagedResult<Self::Item>>;

    async fn fetch_groups(&self, query: &PagedQuery) -> Outcome<GroupedResult<Self::Item>>;
}

/// Rows held locally and paged in memory.
#[derive(Debug, Default)]
pub struct InMemorySource<T> {
    rows: RwLock<Vec<T>>,
}

impl<T: Pageable + Clone> InMemorySource<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub fn replace(&self, rows: Vec<T>) {
        *self.rows.write() = rows;
    }
}

#[async_trait]
impl<T> GridDataSource for InMemorySource<T>
where
    T: Pageable + Clone + Send + Sync + 'static,
{
    type Item = T;

    async fn fetch_page(&self, query: &PagedQuery) -> Outcome<PagedResult<T>> {
        let rows = self.rows.read().clone();
        Outcome::success(paginate(rows, query))
    }

    async fn fetch_groups(&self, query: &PagedQuery) -> Outcome<GroupedResult<T>> {
        let rows = self.rows.read().clone();
        match group(rows, query) {
            Ok(groups) => Outcome::success(groups),
            Err(message) => Outcome::failure_message(message),
        }
    }
}
