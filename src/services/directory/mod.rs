//! User/persona directory integration
//!
//! The directory is the external source of truth for who a user is: their
//! assigned persona and coarse role live in the hosted backend, outside
//! this crate. This module owns the boundary — the client trait the
//! evaluator calls, the raw payload shapes the hosted store returns, and
//! the normalization of those payloads into structured [`Permission`]
//! values so the evaluation logic never sees string shorthands.
//!
//! Failure semantics matter here: the evaluator converts every
//! [`DirectoryError`] into an empty permission set (deny-all) rather than
//! letting it propagate. The error type still distinguishes not-found
//! from transport problems so hosts can log them apart.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::auth::permissions::{parse_shorthand, Conditions, Permission, PermissionLevel};

/// A user's directory record: persona assignment plus coarse role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Persona holding the user's declared permission list
    pub persona_id: String,
    /// Coarse role, e.g. "employee", "manager", "admin"
    pub role: String,
}

/// Errors from the directory collaborator
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("persona not found: {0}")]
    PersonaNotFound(String),

    #[error("directory transport error: {0}")]
    Transport(String),

    #[error("malformed directory record: {0}")]
    InvalidData(String),
}

/// A permission entry as the hosted store returns it
///
/// Persona records mix two shapes: plain strings in the legacy
/// `"resource"` / `"resource.level"` shorthand, and structured objects
/// with explicit fields. Both deserialize through this untagged enum and
/// are normalized into [`Permission`] right at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPermission {
    /// Legacy shorthand, e.g. `"procurement.write"`
    Shorthand(String),
    /// Structured entry; `level` defaults to Read when omitted
    Structured {
        resource: String,
        #[serde(default)]
        level: Option<PermissionLevel>,
        #[serde(default)]
        conditions: Conditions,
    },
}

impl RawPermission {
    /// Normalize into a structured [`Permission`]
    ///
    /// Returns `None` for entries with an empty resource name — those can
    /// never match anything and are dropped (with a warning at the call
    /// site) instead of being carried around.
    pub fn normalize(self) -> Option<Permission> {
        match self {
            RawPermission::Shorthand(raw) => {
                if raw.is_empty() {
                    return None;
                }
                let (resource, level) = parse_shorthand(&raw);
                Some(Permission::new(resource, level))
            }
            RawPermission::Structured {
                resource,
                level,
                conditions,
            } => {
                if resource.is_empty() {
                    return None;
                }
                Some(Permission::with_conditions(
                    resource,
                    level.unwrap_or(PermissionLevel::Read),
                    conditions,
                ))
            }
        }
    }
}

/// Client trait for the user/persona directory
///
/// Implemented against the hosted backend by the application layer; the
/// in-memory implementation below serves tests and demo wiring.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Resolve a user id to its persona assignment and coarse role
    async fn lookup_user(&self, user_id: &str) -> Result<UserRecord, DirectoryError>;

    /// Fetch a persona's declared permission entries, raw
    async fn persona_permissions(
        &self,
        persona_id: &str,
    ) -> Result<Vec<RawPermission>, DirectoryError>;
}

/// In-memory directory for tests and demo environments
///
/// Records are mutable at runtime so tests can model role changes, and a
/// failure toggle simulates the hosted backend being unreachable.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
    personas: RwLock<HashMap<String, Vec<RawPermission>>>,
    failing: RwLock<bool>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record
    ///
    /// Callers changing an existing user's persona or role must also
    /// invalidate the evaluator's cache for that user.
    pub async fn put_user(&self, user_id: &str, persona_id: &str, role: &str) {
        self.users.write().await.insert(
            user_id.to_string(),
            UserRecord {
                persona_id: persona_id.to_string(),
                role: role.to_string(),
            },
        );
    }

    /// Insert or replace a persona's permission list
    pub async fn put_persona(&self, persona_id: &str, permissions: Vec<RawPermission>) {
        self.personas
            .write()
            .await
            .insert(persona_id.to_string(), permissions);
    }

    /// Make every lookup fail with a transport error until reset
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    async fn check_transport(&self) -> Result<(), DirectoryError> {
        if *self.failing.read().await {
            Err(DirectoryError::Transport(
                "directory unreachable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn lookup_user(&self, user_id: &str) -> Result<UserRecord, DirectoryError> {
        self.check_transport().await?;
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound(user_id.to_string()))
    }

    async fn persona_permissions(
        &self,
        persona_id: &str,
    ) -> Result<Vec<RawPermission>, DirectoryError> {
        self.check_transport().await?;
        self.personas
            .read()
            .await
            .get(persona_id)
            .cloned()
            .ok_or_else(|| DirectoryError::PersonaNotFound(persona_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_permission_deserializes_both_shapes() {
        let raw: Vec<RawPermission> = serde_json::from_str(
            r#"[
                "procurement.write",
                { "resource": "hr.records", "level": "admin" },
                { "resource": "finance", "conditions": { "departmentOnly": true } }
            ]"#,
        )
        .unwrap();

        assert_eq!(
            raw[0],
            RawPermission::Shorthand("procurement.write".to_string())
        );

        let normalized: Vec<Permission> =
            raw.into_iter().filter_map(RawPermission::normalize).collect();
        assert_eq!(
            normalized[0],
            Permission::new("procurement", PermissionLevel::Write)
        );
        assert_eq!(
            normalized[1],
            Permission::new("hr.records", PermissionLevel::Admin)
        );
        assert_eq!(normalized[2].resource, "finance");
        // Omitted level defaults to Read
        assert_eq!(normalized[2].level, PermissionLevel::Read);
        assert!(!normalized[2].conditions.is_empty());
    }

    #[test]
    fn test_normalize_drops_empty_resources() {
        assert_eq!(RawPermission::Shorthand(String::new()).normalize(), None);
        assert_eq!(
            RawPermission::Structured {
                resource: String::new(),
                level: Some(PermissionLevel::Admin),
                conditions: Conditions::new(),
            }
            .normalize(),
            None
        );
    }

    #[tokio::test]
    async fn test_in_memory_lookup() {
        let directory = InMemoryDirectory::new();
        directory.put_user("u1", "buyer", "employee").await;
        directory
            .put_persona(
                "buyer",
                vec![RawPermission::Shorthand("procurement.write".to_string())],
            )
            .await;

        let user = directory.lookup_user("u1").await.unwrap();
        assert_eq!(user.persona_id, "buyer");
        assert_eq!(user.role, "employee");

        let permissions = directory.persona_permissions("buyer").await.unwrap();
        assert_eq!(permissions.len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_not_found() {
        let directory = InMemoryDirectory::new();

        let err = directory.lookup_user("ghost").await.unwrap_err();
        assert!(matches!(err, DirectoryError::UserNotFound(_)));

        let err = directory.persona_permissions("ghost").await.unwrap_err();
        assert!(matches!(err, DirectoryError::PersonaNotFound(_)));
    }

    #[tokio::test]
    async fn test_failure_toggle() {
        let directory = InMemoryDirectory::new();
        directory.put_user("u1", "buyer", "employee").await;

        directory.set_failing(true).await;
        let err = directory.lookup_user("u1").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Transport(_)));

        directory.set_failing(false).await;
        assert!(directory.lookup_user("u1").await.is_ok());
    }

    #[tokio::test]
    async fn test_records_are_replaceable() {
        let directory = InMemoryDirectory::new();
        directory.put_user("u1", "buyer", "employee").await;
        directory.put_user("u1", "auditor", "manager").await;

        let user = directory.lookup_user("u1").await.unwrap();
        assert_eq!(user.persona_id, "auditor");
        assert_eq!(user.role, "manager");
    }
}
