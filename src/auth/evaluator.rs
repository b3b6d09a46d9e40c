//! Permission evaluation backed by the object cache
//!
//! This is the decision point the UI guards and route loaders call into:
//! "can user U perform action A on resource R given context C". The
//! evaluator loads the user's normalized permission set — from cache when
//! fresh, from the directory collaborator otherwise — and applies a fixed
//! precedence rule:
//!
//! 1. a condition-free wildcard grant with sufficient level allows
//!    immediately
//! 2. permissions matching the resource (exact name or its top-level
//!    segment; a conditional wildcard matches everything) are filtered
//! 3. access is allowed iff one of them has sufficient level and all of
//!    its conditions hold exactly in the request context
//!
//! Every failure path resolves to deny: an unknown user, an unreachable
//! directory, or a malformed persona record all produce `false`, never an
//! error. Authorization checks must not crash a request path; when in
//! doubt the system denies.
//!
//! The evaluator itself is stateless — all shared state lives in the
//! cache it delegates to, and staleness is bounded by the configured TTL
//! plus collaborator-driven [`invalidate_cache`] calls.
//!
//! [`invalidate_cache`]: PermissionEvaluator::invalidate_cache

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::audit::audit_permission_check;
use crate::auth::permissions::{
    Conditions, Permission, PermissionLevel, DEPARTMENT_ONLY, WILDCARD,
};
use crate::cache::ObjectCache;
use crate::services::directory::DirectoryClient;

/// Roles that must complete multi-factor authentication
pub const MFA_REQUIRED_ROLES: &[&str] = &["admin", "security_admin", "compliance_admin"];

/// Where a permission set was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSource {
    /// Fresh enough copy in the object cache
    Cache,
    /// Loaded from the directory collaborator
    Directory,
    /// Directory lookup failed; the set is the empty deny-all fallback
    Error,
}

impl fmt::Display for PermissionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionSource::Cache => "cache",
            PermissionSource::Directory => "directory",
            PermissionSource::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Authorization decision point for the dashboard
///
/// Construct one per process via [`AccessComponents`] and share it;
/// evaluators are cheap to clone and hold no per-request state.
///
/// [`AccessComponents`]: crate::auth::components::AccessComponents
#[derive(Clone)]
pub struct PermissionEvaluator {
    directory: Arc<dyn DirectoryClient>,
    cache: ObjectCache,
    permissions_ttl: Duration,
}

impl PermissionEvaluator {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        cache: ObjectCache,
        permissions_ttl: Duration,
    ) -> Self {
        Self {
            directory,
            cache,
            permissions_ttl,
        }
    }

    /// Check whether a user may act on a resource at the required level
    ///
    /// Returns `false` for every failure mode — unknown user, directory
    /// outage, insufficient level, unmet conditions — so callers treat it
    /// as the uniform "access denied" signal and must not retry or infer
    /// a reason from it.
    pub async fn has_permission(
        &self,
        user_id: &str,
        resource: &str,
        required: PermissionLevel,
        context: &Conditions,
    ) -> bool {
        let (permissions, source) = self.load_permissions(user_id).await;
        let allowed = evaluate(&permissions, resource, required, context);

        debug!(
            user_id = %user_id,
            resource = %resource,
            required = %required,
            allowed = %allowed,
            source = %source,
            "permission check"
        );
        audit_permission_check(user_id, resource, required, allowed, &source.to_string());

        allowed
    }

    /// Load the user's normalized permission set, cache-first
    ///
    /// On a miss this performs the two dependent directory lookups
    /// (user → persona/role, persona → permissions), normalizes the raw
    /// entries, appends role-synthesized wildcards, and caches the result
    /// for the configured TTL. Any directory failure degrades to an empty
    /// set — deny-all — rather than propagating; the error-path empty set
    /// is not cached, so a transient outage doesn't pin a user to denial
    /// for a full TTL.
    pub async fn get_user_permissions(&self, user_id: &str) -> Vec<Permission> {
        self.load_permissions(user_id).await.0
    }

    async fn load_permissions(&self, user_id: &str) -> (Vec<Permission>, PermissionSource) {
        let key = permission_cache_key(user_id);

        if let Some(cached) = self.cache.get::<Vec<Permission>>(&key).await {
            return (cached, PermissionSource::Cache);
        }

        let user = match self.directory.lookup_user(user_id).await {
            Ok(user) => user,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "user lookup failed, denying all");
                return (Vec::new(), PermissionSource::Error);
            }
        };

        let raw = match self.directory.persona_permissions(&user.persona_id).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    persona_id = %user.persona_id,
                    error = %err,
                    "persona lookup failed, denying all"
                );
                return (Vec::new(), PermissionSource::Error);
            }
        };

        let mut permissions = Vec::with_capacity(raw.len() + 1);
        for entry in raw {
            match entry.normalize() {
                Some(permission) => permissions.push(permission),
                None => {
                    warn!(
                        user_id = %user_id,
                        persona_id = %user.persona_id,
                        "dropping persona permission with empty resource"
                    );
                }
            }
        }
        permissions.extend(role_permissions(&user.role));

        self.cache
            .set_with_ttl(&key, &permissions, self.permissions_ttl)
            .await;

        (permissions, PermissionSource::Directory)
    }

    /// Check the user's coarse role by direct equality
    ///
    /// Uncached: role checks are infrequent and a stale answer here would
    /// be worse than the extra lookup. Failure resolves to `false`.
    pub async fn user_has_role(&self, user_id: &str, required_role: &str) -> bool {
        match self.directory.lookup_user(user_id).await {
            Ok(user) => user.role == required_role,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "role lookup failed");
                false
            }
        }
    }

    /// Whether the user's role is in the privileged set requiring MFA
    pub async fn user_requires_mfa(&self, user_id: &str) -> bool {
        match self.directory.lookup_user(user_id).await {
            Ok(user) => MFA_REQUIRED_ROLES.contains(&user.role.as_str()),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "mfa role lookup failed");
                false
            }
        }
    }

    /// Drop the cached permission set for a user
    ///
    /// Must be called immediately after any change to the user's persona
    /// or role assignment commits; the evaluator never invalidates
    /// proactively, so staleness is otherwise bounded only by the TTL.
    pub async fn invalidate_cache(&self, user_id: &str) {
        self.cache.remove(&permission_cache_key(user_id)).await;
        debug!(user_id = %user_id, "invalidated cached permissions");
    }
}

fn permission_cache_key(user_id: &str) -> String {
    format!("user_permissions:{}", user_id)
}

/// Apply the precedence rule to a loaded permission set
///
/// The unconditional short-circuit covers only condition-free wildcards;
/// a wildcard carrying conditions (the `manager` synthesis) matches every
/// resource but still has its conditions enforced below.
fn evaluate(
    permissions: &[Permission],
    resource: &str,
    required: PermissionLevel,
    context: &Conditions,
) -> bool {
    if permissions
        .iter()
        .any(|p| p.is_wildcard() && p.conditions.is_empty() && p.level.satisfies(required))
    {
        return true;
    }

    permissions
        .iter()
        .filter(|p| p.matches_resource(resource))
        .any(|p| p.level.satisfies(required) && p.conditions_met(context))
}

/// Wildcard permissions synthesized from a coarse role
///
/// `admin`/`superuser` get an unconditional wildcard Admin grant;
/// `manager` gets wildcard Write scoped to their own department. Every
/// other role contributes nothing beyond its persona.
fn role_permissions(role: &str) -> Vec<Permission> {
    match role {
        "admin" | "superuser" => vec![Permission::new(WILDCARD, PermissionLevel::Admin)],
        "manager" => {
            let mut conditions = Conditions::new();
            conditions.insert(DEPARTMENT_ONLY.to_string(), true.into());
            vec![Permission::with_conditions(
                WILDCARD,
                PermissionLevel::Write,
                conditions,
            )]
        }
        _ => Vec::new(),
    }
}
