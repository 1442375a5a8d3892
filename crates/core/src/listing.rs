//! Search, sort, and CSV export over in-memory lists.
//!
//! List pages fetch a bounded list from the backend, then narrow and order it
//! here before rendering. Nothing in this module talks to the network.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A row that can be matched against a free-text search term.
pub trait Searchable {
    /// Fields the search term is matched against.
    fn search_fields(&self) -> Vec<Cow<'_, str>>;
}

/// Whether any searchable field of `item` contains `term`, ignoring case.
///
/// An empty or whitespace-only term matches everything.
#[must_use]
pub fn matches_search<T: Searchable + ?Sized>(item: &T, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Keep only the items matching `term`.
#[must_use]
pub fn filter_by_search<T: Searchable>(items: Vec<T>, term: &str) -> Vec<T> {
    if term.trim().is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| matches_search(item, term))
        .collect()
}

/// Sort direction for a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Parse a query-string value, falling back to `default` for anything unknown.
    #[must_use]
    pub fn parse_or(value: Option<&str>, default: Self) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("asc") => Self::Asc,
            Some(v) if v.eq_ignore_ascii_case("desc") => Self::Desc,
            _ => default,
        }
    }

    /// Apply this direction to an ascending comparison result.
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Current sort column and direction of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub column: String,
    pub direction: SortDirection,
}

impl SortState {
    #[must_use]
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Resolve the sort from query parameters.
    ///
    /// `column` must be one of `allowed`; otherwise the defaults are used.
    #[must_use]
    pub fn from_query(
        column: Option<&str>,
        direction: Option<&str>,
        allowed: &[&str],
        default_column: &str,
        default_direction: SortDirection,
    ) -> Self {
        match column.map(str::trim).filter(|c| allowed.contains(c)) {
            Some(column) => Self::new(column, SortDirection::parse_or(direction, SortDirection::Asc)),
            None => Self::new(default_column, SortDirection::parse_or(direction, default_direction)),
        }
    }

    /// The state after clicking the header of `column`.
    ///
    /// Clicking the active column flips its direction; any other column
    /// starts ascending.
    #[must_use]
    pub fn toggled_for(&self, column: &str) -> Self {
        if self.column == column {
            Self::new(column, self.direction.toggle())
        } else {
            Self::new(column, SortDirection::Asc)
        }
    }

    #[must_use]
    pub fn is_active(&self, column: &str) -> bool {
        self.column == column
    }

    /// Arrow shown next to the active column header.
    #[must_use]
    pub fn indicator(&self, column: &str) -> &'static str {
        match (self.is_active(column), self.direction) {
            (false, _) => "",
            (true, SortDirection::Asc) => "▲",
            (true, SortDirection::Desc) => "▼",
        }
    }
}

/// Sort `items` in place by an ascending comparison, honoring `direction`.
///
/// The sort is stable and never changes the number of items.
pub fn sort_items<T, F>(items: &mut [T], direction: SortDirection, mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    items.sort_by(|a, b| direction.apply(compare(a, b)));
}

/// Case-insensitive string comparison for sort keys.
#[must_use]
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// A row that can be exported to CSV.
pub trait CsvRow {
    /// Column names written as the header row.
    const HEADERS: &'static [&'static str];

    /// Field values in `HEADERS` order.
    fn csv_fields(&self) -> Vec<String>;
}

/// Quote a single CSV field, doubling embedded quotes.
#[must_use]
pub fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Render a header row plus one row per item.
///
/// Every field is quoted so commas and newlines inside values survive.
#[must_use]
pub fn to_csv<T: CsvRow>(items: &[T]) -> String {
    let mut out = csv_line(T::HEADERS.iter().copied());
    for item in items {
        let fields = item.csv_fields();
        out.push_str(&csv_line(fields.iter().map(String::as_str)));
    }
    out
}

fn csv_line<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut line = fields.map(csv_field).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}
