//! Body and query extractors that reject with the JSON envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::FunctionError;

/// `Json<T>` that answers malformed bodies with a 400 envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = FunctionError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|e: JsonRejection| FunctionError::BadRequest(e.body_text()))
    }
}

/// `Query<T>` that answers malformed query strings with a 400 envelope.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = FunctionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|e: QueryRejection| FunctionError::BadRequest(e.body_text()))
    }
}

/// Trimmed value of a required text field.
///
/// # Errors
///
/// Returns `BadRequest` naming the field when it is missing or blank.
pub fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, FunctionError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FunctionError::BadRequest(format!("{name} is required")))
}
