//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Timestamp without seconds, e.g. `2026-10-19 12:00`.
///
/// Usage in templates: `{{ log.created_at|minutes }}`
#[askama::filter_fn]
pub fn minutes(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = value.to_string();
    let mut parts = text.split_whitespace();
    let date = parts.next().unwrap_or_default();
    let time = parts.next().unwrap_or_default();
    Ok(format!("{date} {}", time.get(..5).unwrap_or(time)).trim().to_string())
}
