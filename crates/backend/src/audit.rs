//! Admin audit trail.

use drone_core::models::{AuditEntry, rpc};

use crate::client::{BackendClient, Credential};

/// Record an admin action.
///
/// Best effort: a failure is logged and swallowed, the action itself has
/// already happened.
pub async fn record(backend: &BackendClient, entry: AuditEntry) {
    if let Err(e) = backend
        .rpc_void(rpc::LOG_ADMIN_ACTION, &entry, Credential::Service)
        .await
    {
        tracing::warn!(
            error = %e,
            action = %entry.action,
            target_type = %entry.target_type,
            "Failed to record audit log entry"
        );
    }
}
