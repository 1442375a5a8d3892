//! Markdown content pages and the FAQ.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use crate::content::{Faq, Page};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalInvestor;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "pages/content.html")]
pub struct ContentPageTemplate {
    pub signed_in: bool,
    pub page: Page,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/faq.html")]
pub struct FaqTemplate {
    pub signed_in: bool,
    pub faq: Faq,
}

/// Render `content/pages/{slug}.md`.
pub async fn show(
    State(state): State<AppState>,
    OptionalInvestor(investor): OptionalInvestor,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let page = state
        .content()
        .get_page(&slug)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("page {slug}")))?;

    Ok(ContentPageTemplate {
        signed_in: investor.is_some(),
        page,
    })
}

pub async fn faq(
    State(state): State<AppState>,
    OptionalInvestor(investor): OptionalInvestor,
) -> Result<impl IntoResponse> {
    let faq = state
        .content()
        .faq()
        .cloned()
        .ok_or_else(|| AppError::NotFound("faq".to_string()))?;

    Ok(FaqTemplate {
        signed_in: investor.is_some(),
        faq,
    })
}
