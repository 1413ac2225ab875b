//! Paging, search, sort and grouping state of a data grid.

use crate::paging::{PagedQuery, SortDirection, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

use super::settings::GridSettings;

/// What the grid is currently showing. Every change that alters the result
/// set (search, sort, grouping, page size) returns to the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    page: i64,
    page_size: i64,
    search: String,
    sort_column: Option<String>,
    sort_direction: SortDirection,
    group_by: Option<String>,
    include_inactive: bool,
}

impl Default for GridState {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: String::new(),
            sort_column: None,
            sort_direction: SortDirection::Asc,
            group_by: None,
            include_inactive: false,
        }
    }
}

impl GridState {
    pub fn from_settings(settings: &GridSettings) -> Self {
        let mut state = Self {
            sort_column: settings.sort_column.clone(),
            sort_direction: settings.sort_direction,
            group_by: settings.group_by.clone(),
            ..Default::default()
        };
        state.set_page_size(settings.page_size);
        state
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> Option<(&str, SortDirection)> {
        self.sort_column
            .as_deref()
            .map(|column| (column, self.sort_direction))
    }

    pub fn group_by(&self) -> Option<&str> {
        self.group_by.as_deref()
    }

    pub fn set_page(&mut self, page: i64) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self) {
        self.page += 1;
    }

    pub fn previous_page(&mut self) {
        self.set_page(self.page - 1);
    }

    pub fn set_page_size(&mut self, page_size: i64) {
        let page_size = if page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE)
        };
        if page_size != self.page_size {
            self.page_size = page_size;
            self.page = 1;
        }
    }

    /// Returns `false` when the (trimmed) text did not change.
    pub fn set_search(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text == self.search {
            return false;
        }
        self.search = text.to_string();
        self.page = 1;
        true
    }

    /// Sort by `column`; sorting by the current column again flips the direction.
    pub fn toggle_sort(&mut self, column: &str) {
        match &self.sort_column {
            Some(current) if current.eq_ignore_ascii_case(column) => {
                self.sort_direction = match self.sort_direction {
                    SortDirection::Asc => SortDirection::Desc,
                    SortDirection::Desc => SortDirection::Asc,
                };
            }
            _ => {
                self.sort_column = Some(column.to_string());
                self.sort_direction = SortDirection::Asc;
            }
        }
        self.page = 1;
    }

    pub fn clear_sort(&mut self) {
        self.sort_column = None;
        self.sort_direction = SortDirection::Asc;
        self.page = 1;
    }

    pub fn set_group_by(&mut self, column: Option<&str>) {
        self.group_by = column
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self.page = 1;
    }

    pub fn set_include_inactive(&mut self, include: bool) {
        if include != self.include_inactive {
            self.include_inactive = include;
            self.page = 1;
        }
    }

    /// Store the current layout choices back into `settings`.
    pub fn apply_to(&self, settings: &mut GridSettings) {
        settings.page_size = self.page_size;
        settings.sort_column = self.sort_column.clone();
        settings.sort_direction = self.sort_direction;
        settings.group_by = self.group_by.clone();
    }

    pub fn query(&self) -> PagedQuery {
        PagedQuery {
            page: self.page,
            page_size: self.page_size,
            search: Some(self.search.clone()).filter(|s| !s.is_empty()),
            sort_column: self.sort_column.clone(),
            sort_direction: self.sort_direction,
            group_by: self.group_by.clone(),
            include_inactive: self.include_inactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_resets_page() {
        let mut state = GridState::default();
        state.set_page(4);
        assert!(state.set_search("  Popescu "));
        assert_eq!(state.page(), 1);
        assert_eq!(state.query().search.as_deref(), Some("Popescu"));

        state.set_page(2);
        assert!(!state.set_search("Popescu"));
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn test_toggle_sort() {
        let mut state = GridState::default();
        state.set_page(3);
        state.toggle_sort("lastName");
        assert_eq!(state.sort(), Some(("lastName", SortDirection::Asc)));
        assert_eq!(state.page(), 1);

        state.toggle_sort("lastname");
        assert_eq!(state.sort(), Some(("lastName", SortDirection::Desc)));

        state.toggle_sort("city");
        assert_eq!(state.sort(), Some(("city", SortDirection::Asc)));
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let mut state = GridState::default();
        state.set_page(5);
        state.set_page_size(DEFAULT_PAGE_SIZE);
        assert_eq!(state.page(), 5);

        state.set_page_size(500);
        assert_eq!(state.page_size(), MAX_PAGE_SIZE);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_previous_page_stops_at_first() {
        let mut state = GridState::default();
        state.previous_page();
        assert_eq!(state.page(), 1);
        state.next_page();
        state.next_page();
        state.previous_page();
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn test_settings_round_trip() {
        let settings = GridSettings {
            group_by: Some("city".to_string()),
            sort_column: Some("lastName".to_string()),
            sort_direction: SortDirection::Desc,
            page_size: 0,
            ..Default::default()
        };
        let state = GridState::from_settings(&settings);
        assert_eq!(state.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(state.group_by(), Some("city"));

        let mut saved = GridSettings::default();
        state.apply_to(&mut saved);
        assert_eq!(saved.sort_direction, SortDirection::Desc);
        assert_eq!(saved.group_by.as_deref(), Some("city"));
    }
}
