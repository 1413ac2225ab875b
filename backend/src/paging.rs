//! Pagination, sorting and grouping envelope shared by every entity listing.
//!
//! A listing request is described by a [`PagedQuery`]. Repositories that can
//! push paging down to the database (the SQL Server stored procedures) only
//! need [`PagedQuery::normalized`] and [`PagedResult::new`]; everything else
//! (the in-memory repository and the client grid) runs the generic
//! filter → sort → slice pipeline in [`paginate`] and [`group`] over records
//! implementing [`Pageable`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Page size used when the caller sends none (or zero).
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound on a single page.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Highest page number accepted; larger requests are clamped so the offset
/// stays in range and the page still fits a SQL Server `INT` parameter.
pub const MAX_PAGE: i64 = i32::MAX as i64;

/// Group key used for records with no value in the grouped column.
pub const EMPTY_GROUP_KEY: &str = "(none)";

/// Sort direction for listings. Parsed case-insensitively, serialized lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, SortDirection::Desc)
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("Unknown sort direction: {}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing request: page, search text, sorting and grouping.
///
/// Page and page size are signed so that out-of-range values coming from a
/// query string (`page=0`, `page=-3`) are accepted and normalized instead of
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagedQuery {
    /// 1-based page number.
    pub page: i64,
    pub page_size: i64,
    pub search: Option<String>,
    pub sort_column: Option<String>,
    pub sort_direction: SortDirection,
    pub group_by: Option<String>,
    pub include_inactive: bool,
}

impl Default for PagedQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            sort_column: None,
            sort_direction: SortDirection::Asc,
            group_by: None,
            include_inactive: false,
        }
    }
}

impl PagedQuery {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_sort(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_column = Some(column.into());
        self.sort_direction = direction;
        self
    }

    pub fn with_group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = Some(column.into());
        self
    }

    pub fn including_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    /// Clamp page and page size into range and drop blank text fields.
    ///
    /// - page < 1 becomes 1, page above [`MAX_PAGE`] becomes [`MAX_PAGE`]
    /// - page size 0 (or negative) becomes [`DEFAULT_PAGE_SIZE`]
    /// - page size above [`MAX_PAGE_SIZE`] becomes [`MAX_PAGE_SIZE`]
    pub fn normalized(&self) -> Self {
        let page_size = if self.page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size.min(MAX_PAGE_SIZE)
        };

        Self {
            page: self.page.clamp(1, MAX_PAGE),
            page_size,
            search: non_blank(&self.search),
            sort_column: non_blank(&self.sort_column),
            sort_direction: self.sort_direction,
            group_by: non_blank(&self.group_by),
            include_inactive: self.include_inactive,
        }
    }

    /// Number of records skipped before this page. Only meaningful on a
    /// normalized query.
    pub fn offset(&self) -> usize {
        let skipped = (self.page.max(1) - 1).saturating_mul(self.page_size.max(0));
        usize::try_from(skipped).unwrap_or(usize::MAX)
    }

    /// Lowercased search needle, if any.
    pub fn search_needle(&self) -> Option<String> {
        non_blank(&self.search).map(|s| s.to_lowercase())
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// One page of results plus the totals a grid needs for its pager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> PagedResult<T> {
    /// Build a page from its items and the total number of matching records.
    pub fn new(items: Vec<T>, total_count: u64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            ((total_count as i64) + page_size - 1) / page_size
        } else {
            0
        };

        Self {
            items,
            total_count,
            page,
            page_size,
            total_pages,
            has_previous: page > 1,
            has_next: page < total_pages,
        }
    }

    pub fn empty(query: &PagedQuery) -> Self {
        let query = query.normalized();
        Self::new(Vec::new(), 0, query.page, query.page_size)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}

/// A set of records sharing the same value in the grouped column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group<T> {
    pub key: String,
    pub count: u64,
    pub items: Vec<T>,
}

/// Grouped listing. Paging applies to groups, not to individual records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedResult<T> {
    pub group_by: String,
    pub groups: Vec<Group<T>>,
    /// Number of records across all groups.
    pub total_count: u64,
    pub total_groups: u64,
    pub page: i64,
    pub page_size: i64,
    pub has_next: bool,
}

impl<T> GroupedResult<T> {
    /// Group an already filtered and sorted record set, then page the groups.
    ///
    /// Groups are ordered by key; record order inside a group is preserved.
    pub fn from_keyed(
        group_by: impl Into<String>,
        keyed: impl IntoIterator<Item = (String, T)>,
        query: &PagedQuery,
    ) -> Self {
        let query = query.normalized();
        let mut buckets: BTreeMap<String, Vec<T>> = BTreeMap::new();
        let mut total_count = 0u64;
        for (key, item) in keyed {
            total_count += 1;
            buckets.entry(key).or_default().push(item);
        }

        let total_groups = buckets.len() as u64;
        let groups: Vec<Group<T>> = buckets
            .into_iter()
            .skip(query.offset())
            .take(query.page_size as usize)
            .map(|(key, items)| Group {
                key,
                count: items.len() as u64,
                items,
            })
            .collect();

        let shown = query.offset() as u64 + groups.len() as u64;
        Self {
            group_by: group_by.into(),
            groups,
            total_count,
            total_groups,
            page: query.page,
            page_size: query.page_size,
            has_next: shown < total_groups,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> GroupedResult<U> {
        GroupedResult {
            group_by: self.group_by,
            groups: self
                .groups
                .into_iter()
                .map(|g| Group {
                    key: g.key,
                    count: g.count,
                    items: g.items.into_iter().map(&mut f).collect(),
                })
                .collect(),
            total_count: self.total_count,
            total_groups: self.total_groups,
            page: self.page,
            page_size: self.page_size,
            has_next: self.has_next,
        }
    }
}

/// Comparable value extracted from a record for sorting.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    /// Compared case-insensitively.
    Text(String),
}

impl SortValue {
    pub fn text(value: impl AsRef<str>) -> Self {
        SortValue::Text(value.as_ref().to_lowercase())
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map(SortValue::text).unwrap_or(SortValue::Missing)
    }

    pub fn opt_date(value: Option<NaiveDate>) -> Self {
        value.map(SortValue::Date).unwrap_or(SortValue::Missing)
    }

    fn rank(&self) -> u8 {
        match self {
            SortValue::Missing => 0,
            SortValue::Bool(_) => 1,
            SortValue::Int(_) => 2,
            SortValue::Float(_) => 3,
            SortValue::Date(_) => 4,
            SortValue::Timestamp(_) => 5,
            SortValue::Text(_) => 6,
        }
    }

    /// Total order: missing values first, then by value within the same kind.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Bool(a), SortValue::Bool(b)) => a.cmp(b),
            (SortValue::Int(a), SortValue::Int(b)) => a.cmp(b),
            (SortValue::Float(a), SortValue::Float(b)) => a.total_cmp(b),
            (SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
            (SortValue::Timestamp(a), SortValue::Timestamp(b)) => a.cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Record that can be searched, sorted and grouped by column name.
///
/// Column names are the camelCase JSON field names and are matched
/// case-insensitively.
pub trait Pageable {
    /// Columns accepted by [`Pageable::sort_value`].
    const SORT_COLUMNS: &'static [&'static str];
    /// Columns accepted by [`Pageable::group_key`].
    const GROUP_COLUMNS: &'static [&'static str];

    fn record_id(&self) -> i64;

    fn is_active(&self) -> bool;

    /// `needle` is already lowercased and non-blank.
    fn matches_search(&self, needle: &str) -> bool;

    /// `None` for an unknown column.
    fn sort_value(&self, column: &str) -> Option<SortValue>;

    /// `None` for an unknown column; `Some(EMPTY_GROUP_KEY)` for a missing value.
    fn group_key(&self, column: &str) -> Option<String>;
}

/// Canonical spelling of `column` if it is one of `allowed`.
pub fn resolve_column(allowed: &[&'static str], column: &str) -> Option<&'static str> {
    allowed
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(column.trim()))
}

/// Case-insensitive substring match over a set of optional text fields.
pub fn any_field_contains(fields: &[Option<&str>], needle: &str) -> bool {
    fields
        .iter()
        .flatten()
        .any(|f| f.to_lowercase().contains(needle))
}

fn filter_and_sort<T: Pageable>(
    records: impl IntoIterator<Item = T>,
    query: &PagedQuery,
) -> Vec<T> {
    let needle = query.search_needle();
    let mut rows: Vec<T> = records
        .into_iter()
        .filter(|r| query.include_inactive || r.is_active())
        .filter(|r| match &needle {
            Some(n) => r.matches_search(n),
            None => true,
        })
        .collect();

    let column = query
        .sort_column
        .as_deref()
        .and_then(|c| resolve_column(T::SORT_COLUMNS, c));

    match column {
        Some(column) => rows.sort_by(|a, b| {
            let va = a.sort_value(column).unwrap_or(SortValue::Missing);
            let vb = b.sort_value(column).unwrap_or(SortValue::Missing);
            va.compare(&vb)
                .then_with(|| a.record_id().cmp(&b.record_id()))
        }),
        None => rows.sort_by_key(|r| r.record_id()),
    }

    if query.sort_direction.is_descending() {
        rows.reverse();
    }
    rows
}

/// Filter, sort and slice `records` into one page.
///
/// An unknown sort column falls back to id order. A page past the end yields
/// no items while still reporting the totals.
pub fn paginate<T: Pageable>(
    records: impl IntoIterator<Item = T>,
    query: &PagedQuery,
) -> PagedResult<T> {
    let query = query.normalized();
    let rows = filter_and_sort(records, &query);
    let total = rows.len() as u64;
    let items: Vec<T> = rows
        .into_iter()
        .skip(query.offset())
        .take(query.page_size as usize)
        .collect();

    PagedResult::new(items, total, query.page, query.page_size)
}

/// Filter, sort and group `records` by the query's `group_by` column.
///
/// Fails with a message when no group column is given or it is unknown.
pub fn group<T: Pageable>(
    records: impl IntoIterator<Item = T>,
    query: &PagedQuery,
) -> Result<GroupedResult<T>, String> {
    let query = query.normalized();
    let requested = query
        .group_by
        .as_deref()
        .ok_or_else(|| "A groupBy column is required".to_string())?;
    let column = resolve_column(T::GROUP_COLUMNS, requested).ok_or_else(|| {
        format!(
            "Cannot group by '{}'. Allowed columns: {}",
            requested,
            T::GROUP_COLUMNS.join(", ")
        )
    })?;

    let rows = filter_and_sort(records, &query);
    let keyed = rows.into_iter().map(|r| {
        let key = r
            .group_key(column)
            .unwrap_or_else(|| EMPTY_GROUP_KEY.to_string());
        (key, r)
    });

    Ok(GroupedResult::from_keyed(column, keyed, &query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        name: &'static str,
        city: Option<&'static str>,
        active: bool,
    }

    impl Pageable for Row {
        const SORT_COLUMNS: &'static [&'static str] = &["id", "name", "city"];
        const GROUP_COLUMNS: &'static [&'static str] = &["city"];

        fn record_id(&self) -> i64 {
            self.id
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn matches_search(&self, needle: &str) -> bool {
            any_field_contains(&[Some(self.name), self.city], needle)
        }

        fn sort_value(&self, column: &str) -> Option<SortValue> {
            match column {
                "id" => Some(SortValue::Int(self.id)),
                "name" => Some(SortValue::text(self.name)),
                "city" => Some(SortValue::opt_text(self.city)),
                _ => None,
            }
        }

        fn group_key(&self, column: &str) -> Option<String> {
            match column {
                "city" => Some(self.city.unwrap_or(EMPTY_GROUP_KEY).to_string()),
                _ => None,
            }
        }
    }

    fn rows() -> Vec<Row> {
        [
            (1, "Popescu", Some("Iasi"), true),
            (2, "ionescu", Some("Cluj"), true),
            (3, "Georgescu", None, true),
            (4, "Marin", Some("Iasi"), false),
            (5, "Avram", Some("Cluj"), true),
        ]
        .into_iter()
        .map(|(id, name, city, active)| Row {
            id,
            name,
            city,
            active,
        })
        .collect()
    }

    #[test]
    fn test_normalize_page_zero_and_oversized_page_size() {
        let q = PagedQuery::new(0, 500).normalized();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, MAX_PAGE_SIZE);

        let q = PagedQuery::new(-4, 0).normalized();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_normalize_clamps_huge_page() {
        let q = PagedQuery::new(i64::MAX, 10).normalized();
        assert_eq!(q.page, MAX_PAGE);
        assert_eq!(q.offset(), (MAX_PAGE as usize - 1) * 10);

        // an unnormalized query saturates instead of overflowing
        assert_eq!(PagedQuery::new(i64::MAX, i64::MAX).offset(), usize::MAX);
    }

    #[test]
    fn test_paginate_huge_page_is_empty() {
        let page = paginate(rows(), &PagedQuery::new(i64::MAX, 10));
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 4);
        assert_eq!(page.page, MAX_PAGE);
        assert!(!page.has_next);

        let grouped = group(rows(), &PagedQuery::new(i64::MAX, 10).with_group_by("city")).unwrap();
        assert!(grouped.groups.is_empty());
        assert_eq!(grouped.total_groups, 3);
    }

    #[test]
    fn test_sort_direction_deserializes_case_insensitively() {
        for raw in ["\"DESC\"", "\"Desc\"", "\"descending\""] {
            let dir: SortDirection = serde_json::from_str(raw).unwrap();
            assert_eq!(dir, SortDirection::Desc);
        }
        let q: PagedQuery = serde_json::from_str(r#"{"sortDirection":"ASC"}"#).unwrap();
        assert_eq!(q.sort_direction, SortDirection::Asc);
        assert!(serde_json::from_str::<SortDirection>("\"sideways\"").is_err());
        assert_eq!(serde_json::to_string(&SortDirection::Desc).unwrap(), "\"desc\"");
    }

    #[test]
    fn test_normalize_drops_blank_search() {
        let q = PagedQuery::default().with_search("   ").normalized();
        assert!(q.search.is_none());
    }

    #[test]
    fn test_paginate_excludes_inactive_by_default() {
        let page = paginate(rows(), &PagedQuery::new(1, 10));
        assert_eq!(page.total_count, 4);
        assert!(page.items.iter().all(|r| r.active));

        let page = paginate(rows(), &PagedQuery::new(1, 10).including_inactive());
        assert_eq!(page.total_count, 5);
    }

    #[test]
    fn test_paginate_page_beyond_last() {
        let page = paginate(rows(), &PagedQuery::new(9, 2));
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 4);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_previous);
        assert!(!page.has_next);
    }

    #[test]
    fn test_paginate_sort_is_case_insensitive_and_reversible() {
        let q = PagedQuery::new(1, 10).with_sort("NAME", SortDirection::Asc);
        let names: Vec<_> = paginate(rows(), &q).items.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Avram", "Georgescu", "ionescu", "Popescu"]);

        let q = PagedQuery::new(1, 10).with_sort("name", SortDirection::Desc);
        let first = paginate(rows(), &q).items[0].name;
        assert_eq!(first, "Popescu");
    }

    #[test]
    fn test_paginate_unknown_sort_column_uses_id_order() {
        let q = PagedQuery::new(1, 10).with_sort("nope", SortDirection::Asc);
        let ids: Vec<_> = paginate(rows(), &q).items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_paginate_search() {
        let q = PagedQuery::new(1, 10).with_search("CLUJ");
        let ids: Vec<_> = paginate(rows(), &q).items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 5]);
    }

    #[test]
    fn test_group_by_city() {
        let q = PagedQuery::new(1, 10).with_group_by("city");
        let grouped = group(rows(), &q).unwrap();
        assert_eq!(grouped.total_count, 4);
        let keys: Vec<_> = grouped.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec![EMPTY_GROUP_KEY, "Cluj", "Iasi"]);
        assert_eq!(grouped.groups[1].count, 2);
    }

    #[test]
    fn test_group_requires_known_column() {
        assert!(group(rows(), &PagedQuery::default()).is_err());
        assert!(group(rows(), &PagedQuery::default().with_group_by("name")).is_err());
    }

    #[test]
    fn test_group_pages_over_groups() {
        let q = PagedQuery::new(2, 2).with_group_by("city");
        let grouped = group(rows(), &q).unwrap();
        assert_eq!(grouped.total_groups, 3);
        assert_eq!(grouped.groups.len(), 1);
        assert!(!grouped.has_next);
    }

    #[test]
    fn test_paged_result_totals() {
        let page: PagedResult<u8> = PagedResult::new(vec![], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn test_paged_result_serialization_shape() {
        let page = PagedResult::new(vec![1, 2], 2, 1, 20);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalCount"], 2);
        assert_eq!(json["pageSize"], 20);
        assert_eq!(json["hasNext"], false);
    }

    #[test]
    fn test_query_deserializes_from_partial_json() {
        let q: PagedQuery = serde_json::from_str(r#"{"page":3,"sortDirection":"desc"}"#).unwrap();
        assert_eq!(q.page, 3);
        assert_eq!(q.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(q.sort_direction, SortDirection::Desc);
    }
}
