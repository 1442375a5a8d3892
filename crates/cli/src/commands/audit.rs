//! Audit log export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use drone_backend::{BackendClient, Credential, TableQuery};
use drone_core::listing::{SortDirection, filter_by_search, to_csv};
use drone_core::models::{AuditLog, tables};

use super::CliError;

/// Entries fetched when `--limit` is not given.
pub const DEFAULT_LIMIT: usize = 1000;

/// What to export.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub search: String,
    pub action: Option<String>,
    pub limit: usize,
}

impl ExportFilter {
    /// Keep entries that match the search term and action, newest first.
    #[must_use]
    pub fn apply(&self, logs: Vec<AuditLog>) -> Vec<AuditLog> {
        let action = self.action.as_deref().map(str::trim).filter(|a| !a.is_empty());
        filter_by_search(logs, self.search.trim())
            .into_iter()
            .filter(|log| action.is_none_or(|a| log.action == a))
            .collect()
    }
}

/// Fetch the latest entries and render the filtered CSV.
///
/// # Errors
///
/// Returns `CliError::Backend` if the audit table cannot be read.
pub async fn render(backend: &BackendClient, filter: &ExportFilter) -> Result<String, CliError> {
    let logs: Vec<AuditLog> = backend
        .select(
            tables::AUDIT_LOGS,
            &TableQuery::new()
                .order("created_at", SortDirection::Desc)
                .limit(filter.limit),
            Credential::Service,
        )
        .await?;
    let fetched = logs.len();
    let logs = filter.apply(logs);
    tracing::info!(fetched, exported = logs.len(), "Audit log filtered");
    Ok(to_csv(&logs))
}

/// `drone-cli audit export`
///
/// # Errors
///
/// Returns an error if the fetch fails or the output cannot be written.
pub async fn export(
    backend: &BackendClient,
    filter: &ExportFilter,
    out: Option<&Path>,
) -> Result<(), CliError> {
    let csv = render(backend, filter).await?;
    match out {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            writer.write_all(csv.as_bytes())?;
            writer.flush()?;
            tracing::info!(path = %path.display(), "Audit log written");
        }
        None => std::io::stdout().lock().write_all(csv.as_bytes())?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use drone_backend::BackendConfig;
    use secrecy::SecretString;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> BackendClient {
        let url = Url::parse(&server.uri()).unwrap();
        BackendClient::new(&BackendConfig {
            functions_url: url.join("functions/v1").unwrap(),
            url,
            anon_key: SecretString::from("anon-test-key"),
            service_key: Some(SecretString::from("service-test-key")),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn row(action: &str, target_id: &str) -> serde_json::Value {
        json!({
            "id": "5d2a7b9e-1c3f-4e8a-9b6d-0f1e2a3b4c5d",
            "admin_email": "ops@dronecapital.io",
            "action": action,
            "target_type": "user",
            "target_id": target_id,
            "details": { "reason": "a \"quoted\" note" },
            "created_at": "2026-10-19T12:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_export_filters_by_action_and_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/admin_audit_logs"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("limit", "50"))
            .and(header("apikey", "service-test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                row("update_user_role", "ada"),
                row("update_user_role", "grace"),
                row("approve_kyc", "ada"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let filter = ExportFilter {
            search: "ADA".to_string(),
            action: Some("update_user_role".to_string()),
            limit: 50,
        };
        let csv = render(&client(&server), &filter).await.unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"created_at\""));
        assert!(lines[1].contains("\"ada\""));
        assert!(lines[1].contains(r#"a \""quoted\"" note"#));
    }

    #[test]
    fn test_blank_action_matches_everything() {
        let logs: Vec<AuditLog> =
            serde_json::from_value(json!([row("a", "1"), row("b", "2")])).unwrap();
        let filter = ExportFilter {
            action: Some("  ".to_string()),
            ..ExportFilter::default()
        };
        assert_eq!(filter.apply(logs).len(), 2);
    }
}
