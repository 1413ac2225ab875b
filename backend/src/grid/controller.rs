//! Drives a grid: turns state changes into fetches and binds the results.
//!
//! Each fetch takes a generation number. A response is bound only if no
//! newer fetch was started in the meantime, so a slow response to an old
//! search can never overwrite the rows of a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::debounce::Debouncer;
use super::settings::GridSettings;
use super::source::GridDataSource;
use super::state::GridState;
use crate::outcome::Outcome;
use crate::paging::{GroupedResult, PagedResult};

/// Rows currently bound to the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum GridData<T> {
    Empty,
    Page(PagedResult<T>),
    Groups(GroupedResult<T>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridView<T> {
    pub data: GridData<T>,
    /// Errors of the last failed fetch; the previous rows stay bound.
    pub errors: Vec<String>,
    pub loading: bool,
    /// Generation of the fetch that produced `data`.
    pub generation: u64,
}

impl<T> Default for GridView<T> {
    fn default() -> Self {
        Self {
            data: GridData::Empty,
            errors: Vec::new(),
            loading: false,
            generation: 0,
        }
    }
}

struct Inner<S: GridDataSource> {
    source: S,
    state: Mutex<GridState>,
    view: RwLock<GridView<S::Item>>,
    generation: AtomicU64,
}

impl<S: GridDataSource> Inner<S> {
    async fn load(&self) -> bool {
        let query = self.state.lock().query();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.view.write().loading = true;

        let outcome = if query.group_by.is_some() {
            self.source.fetch_groups(&query).await.map(GridData::Groups)
        } else {
            self.source.fetch_page(&query).await.map(GridData::Page)
        };
        self.bind(generation, outcome)
    }

    fn bind(&self, generation: u64, outcome: Outcome<GridData<S::Item>>) -> bool {
        let mut view = self.view.write();
        if generation != self.generation.load(Ordering::SeqCst) {
            log::debug!("Discarding stale grid response (generation {})", generation);
            return false;
        }

        view.loading = false;
        view.generation = generation;
        if outcome.is_success {
            if let Some(data) = outcome.value {
                view.data = data;
            }
            view.errors.clear();
        } else {
            log::warn!("Grid fetch failed: {}", outcome.errors.join("; "));
            view.errors = outcome.errors;
        }
        true
    }
}

/// Grid over a [`GridDataSource`] with debounced search.
pub struct GridController<S: GridDataSource + 'static> {
    inner: Arc<Inner<S>>,
    debouncer: Debouncer,
}

impl<S: GridDataSource + 'static> GridController<S> {
    pub fn new(source: S, settings: &GridSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(GridState::from_settings(settings)),
                view: RwLock::new(GridView::default()),
                generation: AtomicU64::new(0),
            }),
            debouncer: Debouncer::default(),
        }
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = Debouncer::new(delay);
        self
    }

    pub fn state(&self) -> GridState {
        self.inner.state.lock().clone()
    }

    pub fn view(&self) -> GridView<S::Item> {
        self.inner.view.read().clone()
    }

    /// Fetch with the current state. Returns whether the response was bound.
    pub async fn refresh(&self) -> bool {
        self.inner.load().await
    }

    /// Update the search text and fetch once typing pauses. `None` when the
    /// text did not change.
    pub fn search(&self, text: &str) -> Option<JoinHandle<bool>> {
        if !self.inner.state.lock().set_search(text) {
            return None;
        }
        let inner = self.inner.clone();
        Some(self.debouncer.call(move || async move {
            inner.load().await;
        }))
    }

    pub async fn go_to_page(&self, page: i64) -> bool {
        self.inner.state.lock().set_page(page);
        self.refresh().await
    }

    pub async fn next_page(&self) -> bool {
        self.inner.state.lock().next_page();
        self.refresh().await
    }

    pub async fn previous_page(&self) -> bool {
        self.inner.state.lock().previous_page();
        self.refresh().await
    }

    pub async fn set_page_size(&self, page_size: i64) -> bool {
        self.inner.state.lock().set_page_size(page_size);
        self.refresh().await
    }

    pub async fn toggle_sort(&self, column: &str) -> bool {
        self.inner.state.lock().toggle_sort(column);
        self.refresh().await
    }

    pub async fn set_group_by(&self, column: Option<&str>) -> bool {
        self.inner.state.lock().set_group_by(column);
        self.refresh().await
    }

    pub async fn set_include_inactive(&self, include: bool) -> bool {
        self.inner.state.lock().set_include_inactive(include);
        self.refresh().await
    }

    /// Current layout choices, ready to hand to the settings service.
    pub fn settings(&self, base: &GridSettings) -> GridSettings {
        let mut settings = base.clone();
        self.inner.state.lock().apply_to(&mut settings);
        settings
    }

    /// Cancel pending searches; call when the grid goes away.
    pub fn dispose(&self) {
        self.debouncer.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::source::InMemorySource;
    use crate::paging::{
        any_field_contains, GroupedResult, PagedQuery, Pageable, SortValue, EMPTY_GROUP_KEY,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        name: String,
        ward: Option<String>,
    }

    impl Pageable for Row {
        const SORT_COLUMNS: &'static [&'static str] = &["id", "name"];
        const GROUP_COLUMNS: &'static [&'static str] = &["ward"];

        fn record_id(&self) -> i64 {
            self.id
        }

        fn is_active(&self) -> bool {
            true
        }

        fn matches_search(&self, needle: &str) -> bool {
            any_field_contains(&[Some(self.name.as_str())], needle)
        }

        fn sort_value(&self, column: &str) -> Option<SortValue> {
            match column {
                "id" => Some(SortValue::Int(self.id)),
                "name" => Some(SortValue::text(&self.name)),
                _ => None,
            }
        }

        fn group_key(&self, column: &str) -> Option<String> {
            match column {
                "ward" => Some(self.ward.clone().unwrap_or_else(|| EMPTY_GROUP_KEY.to_string())),
                _ => None,
            }
        }
    }

    fn rows() -> Vec<Row> {
        let names = ["Popescu", "Ionescu", "Popa", "Marin", "Avram"];
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Row {
                id: i as i64 + 1,
                name: name.to_string(),
                ward: Some(if i % 2 == 0 { "A" } else { "B" }.to_string()),
            })
            .collect()
    }

    /// In-memory source answering each fetch after a scripted delay.
    struct DelayedSource {
        inner: InMemorySource<Row>,
        delays: Mutex<VecDeque<Duration>>,
    }

    impl DelayedSource {
        fn new(delays: &[u64]) -> Self {
            Self {
                inner: InMemorySource::new(rows()),
                delays: Mutex::new(delays.iter().map(|ms| Duration::from_millis(*ms)).collect()),
            }
        }

        async fn wait(&self) {
            let delay = self.delays.lock().pop_front().unwrap_or_default();
            tokio::time::sleep(delay).await;
        }
    }

    #[async_trait]
    impl GridDataSource for DelayedSource {
        type Item = Row;

        async fn fetch_page(&self, query: &PagedQuery) -> Outcome<PagedResult<Row>> {
            self.wait().await;
            self.inner.fetch_page(query).await
        }

        async fn fetch_groups(&self, query: &PagedQuery) -> Outcome<GroupedResult<Row>> {
            self.wait().await;
            self.inner.fetch_groups(query).await
        }
    }

    fn settings(page_size: i64) -> GridSettings {
        GridSettings {
            page_size,
            ..Default::default()
        }
    }

    fn page_of(view: &GridView<Row>) -> &PagedResult<Row> {
        match &view.data {
            GridData::Page(page) => page,
            other => panic!("expected a page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_binds_first_page() {
        let grid = GridController::new(InMemorySource::new(rows()), &settings(2));
        assert!(grid.refresh().await);

        let view = grid.view();
        let page = page_of(&view);
        assert_eq!(page.total_count, 5);
        assert_eq!(page.items.len(), 2);
        assert!(grid.next_page().await);
        assert_eq!(page_of(&grid.view()).page, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_search_filters_rows() {
        let grid = GridController::new(InMemorySource::new(rows()), &settings(10));
        grid.search("p");
        grid.search("po");
        let handle = grid.search("pop").unwrap();
        assert!(handle.await.unwrap());

        let view = grid.view();
        let names: Vec<_> = page_of(&view).items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Popescu", "Popa"]);
        assert!(grid.search("pop").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let grid = GridController::new(DelayedSource::new(&[200, 10]), &settings(2));

        let (slow, fast) = tokio::join!(grid.refresh(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            grid.go_to_page(3).await
        });
        assert!(!slow);
        assert!(fast);

        let view = grid.view();
        assert_eq!(page_of(&view).page, 3);
        assert_eq!(view.generation, 2);
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn test_grouping_and_group_errors() {
        let grid = GridController::new(InMemorySource::new(rows()), &settings(10));
        assert!(grid.set_group_by(Some("ward")).await);
        match grid.view().data {
            GridData::Groups(groups) => {
                assert_eq!(groups.total_groups, 2);
                assert_eq!(groups.groups[0].count, 3);
            }
            other => panic!("expected groups, got {:?}", other),
        }

        grid.set_group_by(Some("name")).await;
        let view = grid.view();
        assert!(matches!(view.data, GridData::Groups(_)));
        assert_eq!(view.errors.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_pending_search() {
        let grid = GridController::new(InMemorySource::new(rows()), &settings(10));
        let handle = grid.search("avram").unwrap();
        grid.dispose();
        assert!(!handle.await.unwrap());
        assert_eq!(grid.view().data, GridData::Empty);
    }

    #[test]
    fn test_settings_snapshot() {
        let grid = GridController::new(InMemorySource::new(rows()), &settings(10));
        grid.inner.state.lock().toggle_sort("name");
        let saved = grid.settings(&GridSettings::default());
        assert_eq!(saved.sort_column.as_deref(), Some("name"));
        assert_eq!(saved.page_size, 10);
    }
}
