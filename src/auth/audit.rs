use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::permissions::PermissionLevel;

/// One authorization decision, as recorded in the audit log
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub resource: String,
    pub level: String,
    pub allowed: bool,
    pub source: String, // "cache", "directory", "error"
}

/// Emit a structured audit record for a permission check
///
/// Compliance tooling filters on `target: "audit"`; the host application
/// decides where that stream ends up.
pub fn audit_permission_check(
    user_id: &str,
    resource: &str,
    level: PermissionLevel,
    allowed: bool,
    source: &str,
) {
    let entry = AuditEntry {
        timestamp: Utc::now(),
        user_id: user_id.to_string(),
        resource: resource.to_string(),
        level: level.to_string(),
        allowed,
        source: source.to_string(),
    };

    info!(
        target: "audit",
        audit_type = "permission_check",
        user_id = %entry.user_id,
        resource = %entry.resource,
        level = %entry.level,
        allowed = %entry.allowed,
        source = %entry.source,
        "Permission decision"
    );
}
