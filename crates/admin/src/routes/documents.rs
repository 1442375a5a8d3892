//! Document library: upload, delete, download.
//!
//! Objects live in the `documents` bucket under `public/` or the owner's
//! user id; the table row points at the object.

use std::sync::LazyLock;
use std::time::Duration;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::Redirect,
    routing::{get, post},
};
use drone_backend::storage::object_path;
use drone_backend::{BackendError, Credential, TableQuery, UploadForm};
use drone_core::listing::{SortDirection, SortState, compare_text, filter_by_search, sort_items};
use drone_core::models::{Document, buckets, tables};
use drone_core::{DocumentCategory, DocumentId, UserId};
use serde_json::json;

use super::{AdminView, banners, redirect_with};
use crate::components::{DataTableConfig, FilterOption, ListQuery, TableColumn, TableFilter, TableView};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::services::audit;
use crate::state::AppState;

const BASE: &str = "/documents";

/// Largest accepted document.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Request body limit for the upload route (file plus form fields).
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Lifetime of a download link.
const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Build the documents router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            BASE,
            get(index)
                .post(upload)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/documents/{id}/delete", post(delete))
        .route("/documents/{id}/download", get(download))
}

static TABLE: LazyLock<DataTableConfig> = LazyLock::new(|| {
    DataTableConfig::new(BASE)
        .column(TableColumn::sortable("title", "Title"))
        .column(TableColumn::sortable("category", "Category"))
        .column(TableColumn::new("visibility", "Visibility"))
        .column(TableColumn::sortable("size", "Size"))
        .column(TableColumn::sortable("uploaded_at", "Uploaded"))
        .column(TableColumn::new("actions", ""))
        .filter(TableFilter::select(
            "categories",
            DocumentCategory::ALL
                .iter()
                .map(|c| FilterOption::new(c.as_str(), c.label()))
                .collect(),
        ))
        .search_placeholder("Search title, file name...")
        .default_sort("uploaded_at", SortDirection::Desc)
});

#[derive(Template, WebTemplate)]
#[template(path = "documents.html")]
pub struct DocumentsTemplate {
    pub admin: AdminView,
    pub current_path: &'static str,
    pub documents: Vec<Document>,
    pub table: TableView,
    pub categories: &'static [DocumentCategory],
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Search, filter by category, then sort.
fn arrange(documents: Vec<Document>, query: &ListQuery, sort: &SortState) -> Vec<Document> {
    let category = query.filter().and_then(|f| f.parse::<DocumentCategory>().ok());
    let mut documents: Vec<Document> = filter_by_search(documents, query.search())
        .into_iter()
        .filter(|d| category.is_none_or(|c| d.category == c))
        .collect();
    sort_items(&mut documents, sort.direction, |a, b| match sort.column.as_str() {
        "title" => compare_text(&a.title, &b.title),
        "category" => compare_text(a.category.label(), b.category.label()),
        "size" => a.size_bytes.cmp(&b.size_bytes),
        _ => a.uploaded_at.cmp(&b.uploaded_at),
    });
    documents
}

/// GET /documents
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> DocumentsTemplate {
    let sort = TABLE.sort_state(&query);
    let (success, mut error) = banners(query.success.as_deref(), query.error.as_deref());

    let result: std::result::Result<Vec<Document>, BackendError> = state
        .backend()
        .select(
            tables::DOCUMENTS,
            &TableQuery::new().order("uploaded_at", SortDirection::Desc),
            Credential::Service,
        )
        .await;

    let (documents, total) = match result {
        Ok(documents) => {
            let total = documents.len();
            (arrange(documents, &query, &sort), total)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load documents");
            error = Some(e.user_message());
            (Vec::new(), 0)
        }
    };

    DocumentsTemplate {
        admin: AdminView::from(&admin),
        current_path: BASE,
        table: TABLE.view(&query, &sort, documents.len(), total),
        documents,
        categories: DocumentCategory::ALL,
        success,
        error,
    }
}

/// Validated metadata of an upload.
#[derive(Debug, PartialEq, Eq)]
struct UploadMeta {
    title: String,
    category: DocumentCategory,
    owner_id: Option<UserId>,
    is_public: bool,
}

impl UploadMeta {
    /// Read the text fields; `Err` carries the banner code.
    fn from_form(form: &UploadForm) -> std::result::Result<Self, &'static str> {
        let title = form.field("title").ok_or("invalid")?.to_string();
        let category = form
            .field("category")
            .map_or(Ok(DocumentCategory::Other), str::parse)
            .map_err(|_| "invalid")?;
        let owner_id = form
            .field("owner_id")
            .map(str::parse::<UserId>)
            .transpose()
            .map_err(|_| "invalid")?;
        let is_public = form.field("visibility") == Some("public");

        if !is_public && owner_id.is_none() {
            return Err("owner");
        }

        Ok(Self {
            title,
            category,
            owner_id,
            is_public,
        })
    }
}

/// POST /documents
async fn upload(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    multipart: Multipart,
) -> Redirect {
    let mut form = match UploadForm::read(multipart, MAX_UPLOAD_BYTES).await {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected document upload");
            return redirect_with(BASE, "error", "file");
        }
    };
    let meta = match UploadMeta::from_form(&form) {
        Ok(meta) => meta,
        Err(code) => return redirect_with(BASE, "error", code),
    };
    let Ok(file) = form.take_file() else {
        return redirect_with(BASE, "error", "file");
    };

    let id = DocumentId::generate();
    let folder = meta
        .owner_id
        .map_or_else(|| "public".to_string(), |owner| owner.to_string());
    let storage_path = object_path(&[&folder, &id.to_string(), &file.file_name]);
    let size_bytes = file.bytes.len();

    if let Err(e) = state
        .backend()
        .upload_object(
            buckets::DOCUMENTS,
            &storage_path,
            file.bytes,
            &file.content_type,
            false,
            Credential::Service,
        )
        .await
    {
        tracing::error!(error = %e, path = %storage_path, "Failed to store document");
        return redirect_with(BASE, "error", "backend");
    }

    let row = json!({
        "id": id,
        "owner_id": meta.owner_id,
        "title": meta.title,
        "category": meta.category,
        "storage_path": storage_path,
        "file_name": file.file_name,
        "content_type": file.content_type,
        "size_bytes": size_bytes,
        "is_public": meta.is_public,
    });
    let inserted: std::result::Result<Document, BackendError> = state
        .backend()
        .insert(tables::DOCUMENTS, &row, Credential::Service)
        .await;

    if let Err(e) = inserted {
        tracing::error!(error = %e, "Failed to record document, removing object");
        if let Err(e) = state
            .backend()
            .remove_objects(buckets::DOCUMENTS, &[storage_path.as_str()], Credential::Service)
            .await
        {
            tracing::warn!(error = %e, path = %storage_path, "Orphaned document object");
        }
        return redirect_with(BASE, "error", "backend");
    }

    audit::record(
        state.backend(),
        audit::entry(&admin, "upload_document", "document")
            .target(id)
            .details(json!({ "title": meta.title, "is_public": meta.is_public })),
    )
    .await;
    tracing::info!(document_id = %id, size_bytes, "Document uploaded");
    redirect_with(BASE, "success", "uploaded")
}

async fn find(state: &AppState, id: DocumentId) -> Result<Document> {
    state
        .backend()
        .select_optional(
            tables::DOCUMENTS,
            &TableQuery::new().eq("id", id),
            Credential::Service,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("document {id}")))
}

/// POST /documents/{id}/delete
async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<DocumentId>,
) -> Redirect {
    let document = match find(&state, id).await {
        Ok(document) => document,
        Err(AppError::NotFound(_)) => return redirect_with(BASE, "error", "missing"),
        Err(e) => {
            tracing::error!(error = %e, document_id = %id, "Failed to look up document");
            return redirect_with(BASE, "error", "backend");
        }
    };

    if let Err(e) = state
        .backend()
        .remove_objects(
            buckets::DOCUMENTS,
            &[document.storage_path.as_str()],
            Credential::Service,
        )
        .await
    {
        tracing::warn!(error = %e, path = %document.storage_path, "Failed to remove document object");
    }

    if let Err(e) = state
        .backend()
        .delete(
            tables::DOCUMENTS,
            &TableQuery::new().eq("id", id),
            Credential::Service,
        )
        .await
    {
        tracing::error!(error = %e, document_id = %id, "Failed to delete document row");
        return redirect_with(BASE, "error", "backend");
    }

    audit::record(
        state.backend(),
        audit::entry(&admin, "delete_document", "document")
            .target(id)
            .details(json!({ "title": document.title })),
    )
    .await;
    redirect_with(BASE, "success", "deleted")
}

/// GET /documents/{id}/download
async fn download(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<DocumentId>,
) -> Result<Redirect> {
    let document = find(&state, id).await?;
    let url = state
        .backend()
        .create_signed_url(
            buckets::DOCUMENTS,
            &document.storage_path,
            SIGNED_URL_TTL,
            Credential::Service,
        )
        .await?;
    Ok(Redirect::to(&url))
}
