//! Markdown content for the marketing pages and the FAQ.
//!
//! Files are loaded once at startup from the `content/` directory:
//!
//! ```text
//! content/pages/{slug}.md   about, terms, privacy, risk, whitepaper
//! content/faq.md            frontmatter `items: [{question, answer}]`
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use serde::Deserialize;

/// Frontmatter of a content page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<NaiveDate>,
}

/// A rendered page.
#[derive(Debug, Clone)]
pub struct Page {
    pub slug: String,
    pub meta: PageMeta,
    pub content_html: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FaqMeta {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    items: Vec<FaqSource>,
}

#[derive(Debug, Clone, Deserialize)]
struct FaqSource {
    question: String,
    answer: String,
}

/// One FAQ accordion entry with its answer rendered to HTML.
#[derive(Debug, Clone)]
pub struct FaqItem {
    pub question: String,
    pub answer_html: String,
}

/// The FAQ page.
#[derive(Debug, Clone)]
pub struct Faq {
    pub title: String,
    pub description: Option<String>,
    pub intro_html: String,
    pub items: Vec<FaqItem>,
}

/// Errors loading content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// All content, held in memory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    pages: Arc<HashMap<String, Page>>,
    faq: Option<Arc<Faq>>,
}

impl ContentStore {
    /// Load pages and the FAQ from `content_dir`.
    ///
    /// A missing directory yields an empty store; a file that fails to parse
    /// is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the pages directory exists but cannot be read.
    pub fn load(content_dir: &Path) -> Result<Self, ContentError> {
        let pages = load_pages(&content_dir.join("pages"))?;

        let faq_path = content_dir.join("faq.md");
        let faq = if faq_path.exists() {
            match std::fs::read_to_string(&faq_path)
                .map_err(|e| ContentError::Io(e.to_string()))
                .and_then(|raw| parse_faq(&raw))
            {
                Ok(faq) => Some(Arc::new(faq)),
                Err(e) => {
                    tracing::error!("Failed to load FAQ {:?}: {}", faq_path, e);
                    None
                }
            }
        } else {
            tracing::warn!("FAQ file does not exist: {:?}", faq_path);
            None
        };

        Ok(Self {
            pages: Arc::new(pages),
            faq,
        })
    }

    /// An empty store.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            pages: Arc::new(HashMap::new()),
            faq: None,
        }
    }

    /// A store holding `pages` and no FAQ.
    #[cfg(test)]
    pub(crate) fn from_pages(pages: Vec<Page>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().map(|p| (p.slug.clone(), p)).collect()),
            faq: None,
        }
    }

    #[must_use]
    pub fn get_page(&self, slug: &str) -> Option<&Page> {
        self.pages.get(slug)
    }

    #[must_use]
    pub fn faq(&self) -> Option<&Faq> {
        self.faq.as_deref()
    }
}

fn load_pages(dir: &Path) -> Result<HashMap<String, Page>, ContentError> {
    let mut pages = HashMap::new();

    if !dir.exists() {
        tracing::warn!("Pages directory does not exist: {:?}", dir);
        return Ok(pages);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ContentError::Io(e.to_string()))?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }
        let Some(slug) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        match std::fs::read_to_string(&path)
            .map_err(|e| ContentError::Io(e.to_string()))
            .and_then(|raw| parse_page(&slug, &raw))
        {
            Ok(page) => {
                tracing::info!("Loaded page: {}", page.slug);
                pages.insert(page.slug.clone(), page);
            }
            Err(e) => tracing::error!("Failed to load page {:?}: {}", path, e),
        }
    }

    Ok(pages)
}

fn parse_page(slug: &str, raw: &str) -> Result<Page, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<PageMeta> = matter
        .parse(raw)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    Ok(Page {
        slug: slug.to_string(),
        meta,
        content_html: render_markdown(&parsed.content),
    })
}

fn parse_faq(raw: &str) -> Result<Faq, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<FaqMeta> = matter
        .parse(raw)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    Ok(Faq {
        title: meta.title,
        description: meta.description,
        intro_html: render_markdown(&parsed.content),
        items: meta
            .items
            .into_iter()
            .map(|item| FaqItem {
                question: item.question,
                answer_html: render_markdown(&item.answer),
            })
            .collect(),
    })
}

/// Render markdown to HTML with the GitHub extensions we use.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.header_ids = Some(String::new());
    options.extension.footnotes = true;

    markdown_to_html(content, &options)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        let raw = "---\ntitle: Risk Disclosure\nupdated_at: 2026-03-01\n---\n# Risks\n\nTokens may lose **all** value.\n";
        let page = parse_page("risk", raw).unwrap();
        assert_eq!(page.slug, "risk");
        assert_eq!(page.meta.title, "Risk Disclosure");
        assert_eq!(page.meta.updated_at, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert!(page.content_html.contains("<strong>all</strong>"));
    }

    #[test]
    fn test_page_without_frontmatter_is_rejected() {
        assert!(parse_page("about", "# Just markdown\n").is_err());
    }

    #[test]
    fn test_parse_faq_items() {
        let raw = "---\ntitle: FAQ\nitems:\n  - question: What is DRN?\n    answer: A *token*.\n  - question: Minimum?\n    answer: $100\n---\nCommon questions.\n";
        let faq = parse_faq(raw).unwrap();
        assert_eq!(faq.title, "FAQ");
        assert_eq!(faq.items.len(), 2);
        assert_eq!(faq.items[0].question, "What is DRN?");
        assert!(faq.items[0].answer_html.contains("<em>token</em>"));
        assert!(faq.intro_html.contains("Common questions."));
    }

    #[test]
    fn test_missing_directory_loads_empty() {
        let store = ContentStore::load(Path::new("/nonexistent/drone-content")).unwrap();
        assert!(store.get_page("about").is_none());
        assert!(store.faq().is_none());
    }
}
