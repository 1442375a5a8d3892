//! Admin audit trail.

use drone_core::models::AuditEntry;

use crate::models::CurrentAdmin;

pub use drone_backend::audit::record;

/// Start an entry attributed to `admin`.
#[must_use]
pub fn entry(admin: &CurrentAdmin, action: &str, target_type: &str) -> AuditEntry {
    AuditEntry::new(admin.email.as_str(), action, target_type)
}
