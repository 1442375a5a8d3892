//! Document library: public documents plus the investor's own.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use drone_core::DocumentId;
use drone_core::listing::{SortDirection, SortState, compare_text, filter_by_search, sort_items};
use drone_core::models::Document;
use serde::Deserialize;

use super::{SortColumn, sort_columns};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireInvestor;
use crate::services::PortalClient;
use crate::state::AppState;

const SORT_COLUMNS: [(&str, &str); 4] = [
    ("title", "Title"),
    ("category", "Category"),
    ("size", "Size"),
    ("uploaded_at", "Uploaded"),
];

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "portal/documents.html")]
pub struct DocumentsTemplate {
    pub investor_name: String,
    pub documents: Vec<Document>,
    pub search: String,
    pub columns: Vec<SortColumn>,
    pub error: Option<String>,
}

/// Filter by the search term, then sort by the chosen column.
fn arrange(documents: Vec<Document>, search: &str, sort: &SortState) -> Vec<Document> {
    let mut documents = filter_by_search(documents, search);
    sort_items(&mut documents, sort.direction, |a, b| match sort.column.as_str() {
        "title" => compare_text(&a.title, &b.title),
        "category" => compare_text(a.category.label(), b.category.label()),
        "size" => a.size_bytes.cmp(&b.size_bytes),
        _ => a.uploaded_at.cmp(&b.uploaded_at),
    });
    documents
}

pub async fn index(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let search = query.q.unwrap_or_default().trim().to_string();
    let keys = SORT_COLUMNS.map(|(key, _)| key);
    let sort = SortState::from_query(
        query.sort.as_deref(),
        query.dir.as_deref(),
        &keys,
        "uploaded_at",
        SortDirection::Desc,
    );

    let (documents, error) = match PortalClient::new(state.backend(), &investor).documents().await
    {
        Ok(documents) => (arrange(documents, &search, &sort), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load documents");
            (Vec::new(), Some(e.user_message()))
        }
    };

    DocumentsTemplate {
        investor_name: investor.display_name().to_string(),
        columns: sort_columns("/portal/documents", &search, &sort, &SORT_COLUMNS),
        documents,
        search,
        error,
    }
}

/// Redirect to a short-lived signed URL.
pub async fn download(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    Path(id): Path<DocumentId>,
) -> Result<Redirect> {
    let url = PortalClient::new(state.backend(), &investor)
        .document_url(id)
        .await?;
    Ok(Redirect::to(&url))
}
