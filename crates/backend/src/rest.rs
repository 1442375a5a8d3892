//! Table and RPC access over the backend's REST API.
//!
//! Filters use the `column=op.value` query syntax. Writes ask for the
//! affected rows back with `Prefer: return=representation`.

use std::fmt::Display;

use drone_core::listing::SortDirection;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::client::{BackendClient, Credential, check_status, read_json};
use crate::error::BackendError;

const PREFER_REPRESENTATION: &str = "return=representation";

/// Filters, ordering, and limits for a table request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

impl TableQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns to return (default `*`).
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    /// `column = value`
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// `column <> value`
    #[must_use]
    pub fn neq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("neq.{value}")));
        self
    }

    /// Case-insensitive substring match.
    #[must_use]
    pub fn ilike(mut self, column: &str, term: &str) -> Self {
        let term = term.replace(['*', ','], " ");
        self.filters
            .push((column.to_string(), format!("ilike.*{}*", term.trim())));
        self
    }

    /// `column IS NULL`
    #[must_use]
    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push((column.to_string(), "is.null".to_string()));
        self
    }

    #[must_use]
    pub fn order(mut self, column: &str, direction: SortDirection) -> Self {
        self.order = Some(format!("{column}.{}", direction.as_str()));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether any row filter is set.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.filters.is_empty()
    }

    fn apply(&self, url: &mut Url, default_select: bool) {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        match (&self.select, default_select) {
            (Some(select), _) => pairs.push(("select", select.clone())),
            (None, true) => pairs.push(("select", "*".to_string())),
            (None, false) => {}
        }
        for (column, filter) in &self.filters {
            pairs.push((column.as_str(), filter.clone()));
        }
        if let Some(order) = &self.order {
            pairs.push(("order", order.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
    }
}

impl BackendClient {
    fn table_url(&self, table: &str, query: &TableQuery, default_select: bool) -> Result<Url, BackendError> {
        let mut url = self.endpoint(&["rest", "v1", table])?;
        query.apply(&mut url, default_select);
        Ok(url)
    }

    /// Fetch rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or rows do not decode as `T`.
    #[instrument(skip(self, query, credential), fields(table = %table))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
        credential: Credential<'_>,
    ) -> Result<Vec<T>, BackendError> {
        let url = self.table_url(table, query, true)?;
        let response = self.request(Method::GET, url, credential)?.send().await?;
        read_json(response).await
    }

    /// Fetch at most one row matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the row does not decode as `T`.
    pub async fn select_optional<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
        credential: Credential<'_>,
    ) -> Result<Option<T>, BackendError> {
        let query = query.clone().limit(1);
        let rows: Vec<T> = self.select(table, &query, credential).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns error if the insert is rejected or nothing is returned.
    #[instrument(skip(self, row, credential), fields(table = %table))]
    pub async fn insert<B, T>(
        &self,
        table: &str,
        row: &B,
        credential: Credential<'_>,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&["rest", "v1", table])?;
        let response = self
            .request(Method::POST, url, credential)?
            .header("Prefer", PREFER_REPRESENTATION)
            .json(row)
            .send()
            .await?;
        let rows: Vec<T> = read_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse(format!("insert into {table} returned no rows")))
    }

    /// Patch every row matching `query` and return the updated rows.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::UnfilteredWrite`] if `query` has no filter,
    /// otherwise any request or decode failure.
    #[instrument(skip(self, query, patch, credential), fields(table = %table))]
    pub async fn update<B, T>(
        &self,
        table: &str,
        query: &TableQuery,
        patch: &B,
        credential: Credential<'_>,
    ) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if !query.is_filtered() {
            return Err(BackendError::UnfilteredWrite("update"));
        }
        let url = self.table_url(table, query, false)?;
        let response = self
            .request(Method::PATCH, url, credential)?
            .header("Prefer", PREFER_REPRESENTATION)
            .json(patch)
            .send()
            .await?;
        read_json(response).await
    }

    /// Delete every row matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::UnfilteredWrite`] if `query` has no filter,
    /// otherwise any request failure.
    #[instrument(skip(self, query, credential), fields(table = %table))]
    pub async fn delete(
        &self,
        table: &str,
        query: &TableQuery,
        credential: Credential<'_>,
    ) -> Result<(), BackendError> {
        if !query.is_filtered() {
            return Err(BackendError::UnfilteredWrite("delete"));
        }
        let url = self.table_url(table, query, false)?;
        let response = self.request(Method::DELETE, url, credential)?.send().await?;
        check_status(response).await.map(|_| ())
    }

    /// Call a database function and decode its result.
    ///
    /// # Errors
    ///
    /// Returns error if the call fails or the result does not decode as `T`.
    #[instrument(skip(self, params, credential), fields(function = %function))]
    pub async fn rpc<P, T>(
        &self,
        function: &str,
        params: &P,
        credential: Credential<'_>,
    ) -> Result<T, BackendError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&["rest", "v1", "rpc", function])?;
        let response = self
            .request(Method::POST, url, credential)?
            .json(params)
            .send()
            .await?;
        read_json(response).await
    }

    /// Call a database function whose result is ignored.
    ///
    /// # Errors
    ///
    /// Returns error if the call fails.
    #[instrument(skip(self, params, credential), fields(function = %function))]
    pub async fn rpc_void<P>(
        &self,
        function: &str,
        params: &P,
        credential: Credential<'_>,
    ) -> Result<(), BackendError>
    where
        P: Serialize + ?Sized,
    {
        let url = self.endpoint(&["rest", "v1", "rpc", function])?;
        let response = self
            .request(Method::POST, url, credential)?
            .json(params)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drone_core::models::{Profile, tables};
    use drone_core::UserId;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::test_support::client;

    fn profile_row(id: &str, email: &str) -> serde_json::Value {
        json!({
            "id": id,
            "email": email,
            "full_name": "Ada Lovelace",
            "role": "investor",
            "status": "active",
            "kyc_status": "approved",
            "created_at": "2025-03-01T12:00:00+00:00"
        })
    }

    #[test]
    fn test_query_string() {
        let mut url = Url::parse("http://localhost/rest/v1/profiles").unwrap();
        TableQuery::new()
            .eq("role", "admin")
            .order("created_at", SortDirection::Desc)
            .limit(50)
            .apply(&mut url, true);
        assert_eq!(
            url.query(),
            Some("select=*&role=eq.admin&order=created_at.desc&limit=50")
        );
    }

    #[test]
    fn test_empty_query_adds_no_question_mark() {
        let mut url = Url::parse("http://localhost/rest/v1/profiles").unwrap();
        TableQuery::new().apply(&mut url, false);
        assert_eq!(url.as_str(), "http://localhost/rest/v1/profiles");
    }

    #[test]
    fn test_ilike_strips_wildcards() {
        let query = TableQuery::new().ilike("email", " a*b,c ");
        assert_eq!(
            query.filters,
            vec![("email".to_string(), "ilike.*a b c*".to_string())]
        );
    }

    #[tokio::test]
    async fn test_select_sends_filters_and_decodes_rows() {
        let server = MockServer::start().await;
        let id = UserId::generate();
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", format!("eq.{id}").as_str()))
            .and(query_param("select", "*"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([profile_row(&id.to_string(), "ada@example.com")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let profile: Option<Profile> = client(&server.uri(), true)
            .select_optional(tables::PROFILES, &TableQuery::new().eq("id", id), Credential::Service)
            .await
            .unwrap();
        assert_eq!(profile.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_insert_returns_first_row() {
        let server = MockServer::start().await;
        let id = UserId::generate();
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .and(header("prefer", PREFER_REPRESENTATION))
            .and(body_json(json!({"email": "ada@example.com"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!([profile_row(&id.to_string(), "ada@example.com")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let profile: Profile = client(&server.uri(), true)
            .insert(
                tables::PROFILES,
                &json!({"email": "ada@example.com"}),
                Credential::Service,
            )
            .await
            .unwrap();
        assert_eq!(profile.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_unfiltered_writes_are_refused() {
        let client = client("http://127.0.0.1:9", true);
        let err = client
            .delete(tables::DOCUMENTS, &TableQuery::new(), Credential::Service)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnfilteredWrite("delete")));

        let err = client
            .update::<_, serde_json::Value>(
                tables::PROFILES,
                &TableQuery::new().limit(1),
                &json!({"role": "admin"}),
                Credential::Service,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnfilteredWrite("update")));
    }

    #[tokio::test]
    async fn test_rpc_posts_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_platform_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_investors": 42,
                "total_raised_usd": "125000.00",
                "tokens_issued": "1250000.0000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stats: drone_core::models::PlatformStats = client(&server.uri(), false)
            .rpc("get_platform_stats", &json!({}), Credential::Anon)
            .await
            .unwrap();
        assert_eq!(stats.total_investors, 42);
    }

    #[tokio::test]
    async fn test_rpc_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/adjust_token_balance"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "balance cannot go negative"})),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri(), true)
            .rpc_void("adjust_token_balance", &json!({"p_amount": "-5"}), Credential::Service)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "balance cannot go negative");
    }
}
