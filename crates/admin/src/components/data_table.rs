//! Data table component types.
//!
//! Every list page has the same controls: a search box, at most one select
//! filter, sortable column headers, and (on some pages) a CSV export link
//! that carries the current search and filter.

use drone_core::listing::{SortDirection, SortState};
use serde::Deserialize;
use url::form_urlencoded;

/// Column definition for a data table.
#[derive(Debug, Clone, Copy)]
pub struct TableColumn {
    /// Sort key passed as `sort=`.
    pub key: &'static str,
    /// Display label for the column header.
    pub label: &'static str,
    pub sortable: bool,
}

impl TableColumn {
    /// Create a new sortable column.
    #[must_use]
    pub const fn sortable(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            sortable: true,
        }
    }

    /// Create a new non-sortable column.
    #[must_use]
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            sortable: false,
        }
    }
}

/// Option for a select filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    /// Option value.
    pub value: String,
    /// Display label.
    pub label: String,
}

impl FilterOption {
    /// Create a new filter option.
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// A single-select filter, sent as `filter=`.
#[derive(Debug, Clone)]
pub struct TableFilter {
    /// Display label ("All ..." is shown for no selection).
    pub label: &'static str,
    pub options: Vec<FilterOption>,
}

impl TableFilter {
    /// Create a select filter.
    #[must_use]
    pub const fn select(label: &'static str, options: Vec<FilterOption>) -> Self {
        Self { label, options }
    }
}

/// Query parameters shared by every list page.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub filter: Option<String>,
    /// Outcome code of the last action, set by post/redirect/get.
    pub success: Option<String>,
    pub error: Option<String>,
}

impl ListQuery {
    /// The trimmed search term, empty when absent.
    #[must_use]
    pub fn search(&self) -> &str {
        self.q.as_deref().map_or("", str::trim)
    }

    /// The selected filter value, `None` when absent or blank.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone)]
pub struct DataTableConfig {
    /// Path of the list page, e.g. `/users`.
    pub base: &'static str,
    pub columns: Vec<TableColumn>,
    pub filter: Option<TableFilter>,
    pub search_placeholder: &'static str,
    /// Path of the CSV export, if the page has one.
    pub export: Option<&'static str>,
    pub default_sort: (&'static str, SortDirection),
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub const fn new(base: &'static str) -> Self {
        Self {
            base,
            columns: Vec::new(),
            filter: None,
            search_placeholder: "Search...",
            export: None,
            default_sort: ("created_at", SortDirection::Desc),
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the select filter.
    #[must_use]
    pub fn filter(mut self, filter: TableFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set search placeholder.
    #[must_use]
    pub const fn search_placeholder(mut self, placeholder: &'static str) -> Self {
        self.search_placeholder = placeholder;
        self
    }

    /// Link a CSV export.
    #[must_use]
    pub const fn export(mut self, path: &'static str) -> Self {
        self.export = Some(path);
        self
    }

    /// Sort used when the query names none (or an unknown column).
    #[must_use]
    pub const fn default_sort(mut self, column: &'static str, direction: SortDirection) -> Self {
        self.default_sort = (column, direction);
        self
    }

    /// Resolve the requested sort against the sortable columns.
    #[must_use]
    pub fn sort_state(&self, query: &ListQuery) -> SortState {
        let allowed: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.sortable)
            .map(|c| c.key)
            .collect();
        SortState::from_query(
            query.sort.as_deref(),
            query.dir.as_deref(),
            &allowed,
            self.default_sort.0,
            self.default_sort.1,
        )
    }

    /// Everything the table controls partial needs.
    #[must_use]
    pub fn view(&self, query: &ListQuery, sort: &SortState, shown: usize, total: usize) -> TableView {
        let search = query.search().to_string();
        let filter_value = query.filter().unwrap_or_default().to_string();

        let headers = self
            .columns
            .iter()
            .map(|column| {
                let href = column.sortable.then(|| {
                    let next = sort.toggled_for(column.key);
                    link(
                        self.base,
                        &[
                            ("q", search.as_str()),
                            ("filter", filter_value.as_str()),
                            ("sort", next.column.as_str()),
                            ("dir", next.direction.as_str()),
                        ],
                    )
                });
                HeaderCell {
                    label: column.label,
                    href,
                    indicator: sort.indicator(column.key),
                }
            })
            .collect();

        let export_href = self.export.map(|path| {
            link(
                path,
                &[
                    ("q", search.as_str()),
                    ("filter", filter_value.as_str()),
                    ("sort", sort.column.as_str()),
                    ("dir", sort.direction.as_str()),
                ],
            )
        });

        TableView {
            base: self.base,
            search,
            search_placeholder: self.search_placeholder,
            filter: self.filter.clone(),
            filter_value,
            headers,
            export_href,
            shown,
            total,
        }
    }
}

/// A rendered column header.
#[derive(Debug, Clone)]
pub struct HeaderCell {
    pub label: &'static str,
    /// Link that sorts by this column; `None` for plain headers.
    pub href: Option<String>,
    pub indicator: &'static str,
}

/// Table controls for one request.
#[derive(Debug, Clone)]
pub struct TableView {
    pub base: &'static str,
    pub search: String,
    pub search_placeholder: &'static str,
    pub filter: Option<TableFilter>,
    pub filter_value: String,
    pub headers: Vec<HeaderCell>,
    pub export_href: Option<String>,
    /// Rows after search and filter.
    pub shown: usize,
    /// Rows before search and filter.
    pub total: usize,
}

impl TableView {
    /// Whether `value` is the selected filter option.
    #[must_use]
    pub fn is_selected(&self, value: &str) -> bool {
        self.filter_value == value
    }
}

/// `path?query`, skipping empty values.
fn link(path: &str, params: &[(&str, &str)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if !value.is_empty() {
            serializer.append_pair(key, value);
        }
    }
    let query = serializer.finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}
