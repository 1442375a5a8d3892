//! Investor portal. Every handler requires a signed-in investor.

pub mod contracts;
pub mod dashboard;
pub mod documents;
pub mod invest;
pub mod kyc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use drone_core::listing::SortState;
use url::form_urlencoded;

use crate::state::AppState;

/// Largest file the portal accepts.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Room for the multipart framing around the file.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::show))
        .route("/documents", get(documents::index))
        .route("/documents/{id}/download", get(documents::download))
        .route("/contracts", get(contracts::index))
        .route(
            "/contracts/{id}/upload",
            post(contracts::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/contracts/{id}/download", get(contracts::download))
        .route("/kyc", get(kyc::show).post(kyc::submit))
        .route("/invest", get(invest::form).post(invest::start))
        .route("/invest/crypto/verify", post(invest::verify_crypto))
        .route("/invest/complete", get(invest::complete))
}

/// A sortable table header.
#[derive(Debug, Clone)]
pub struct SortColumn {
    pub label: &'static str,
    pub href: String,
    pub indicator: &'static str,
}

/// Header links for `columns` (`(key, label)` pairs) on the page at `base`.
///
/// Each link keeps the current search term and toggles the sort for its column.
#[must_use]
pub fn sort_columns(
    base: &str,
    search: &str,
    sort: &SortState,
    columns: &[(&str, &'static str)],
) -> Vec<SortColumn> {
    columns
        .iter()
        .map(|&(key, label)| {
            let next = sort.toggled_for(key);
            let mut query = form_urlencoded::Serializer::new(String::new());
            if !search.is_empty() {
                query.append_pair("q", search);
            }
            query.append_pair("sort", &next.column);
            query.append_pair("dir", next.direction.as_str());
            SortColumn {
                label,
                href: format!("{base}?{}", query.finish()),
                indicator: sort.indicator(key),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use drone_core::listing::SortDirection;

    use super::*;

    #[test]
    fn test_sort_columns_toggle_active_column() {
        let sort = SortState::new("title", SortDirection::Asc);
        let columns = sort_columns(
            "/portal/documents",
            "white paper",
            &sort,
            &[("title", "Title"), ("uploaded_at", "Uploaded")],
        );

        assert_eq!(
            columns[0].href,
            "/portal/documents?q=white+paper&sort=title&dir=desc"
        );
        assert_eq!(columns[0].indicator, "▲");
        assert_eq!(
            columns[1].href,
            "/portal/documents?q=white+paper&sort=uploaded_at&dir=asc"
        );
        assert_eq!(columns[1].indicator, "");
    }
}
