//! Permission type definitions for the authorization core
//!
//! These types give the evaluator structured data to work with: the raw
//! persona payloads from the hosted directory are normalized into
//! [`Permission`] values at the service boundary, so nothing in here has
//! to care about string shorthands or dynamic maps.
//!
//! A permission names a resource (either the `"*"` wildcard or a
//! dot-delimited name such as `"procurement.orders"`), carries an access
//! level, and optionally a set of exact-match conditions that must all
//! hold against the caller-supplied context for the grant to apply.
//! Permissions are immutable once constructed; the evaluator only ever
//! rebuilds lists, never mutates one in place.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The resource name that matches everything
pub const WILDCARD: &str = "*";

/// Condition key synthesized for `manager` role grants
pub const DEPARTMENT_ONLY: &str = "departmentOnly";

/// Ordered access tier
///
/// The derived ordering follows declaration order, so
/// `None < Read < Write < Admin` holds and a held level satisfies a
/// required one iff `held >= required`.
///
/// # Examples
///
/// ```rust
/// use chainboard_access::auth::PermissionLevel;
///
/// assert!(PermissionLevel::Write.satisfies(PermissionLevel::Read));
/// assert!(!PermissionLevel::Read.satisfies(PermissionLevel::Admin));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// No access
    #[default]
    None,
    /// Read access - view or retrieve data
    Read,
    /// Write access - create or modify data
    Write,
    /// Administrative access - manage permissions and settings
    Admin,
}

impl PermissionLevel {
    /// Get all levels in ascending order
    pub fn all() -> Vec<PermissionLevel> {
        vec![
            PermissionLevel::None,
            PermissionLevel::Read,
            PermissionLevel::Write,
            PermissionLevel::Admin,
        ]
    }

    /// Check whether this level grants the required one
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self >= required
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionLevel::None => "none",
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
            PermissionLevel::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PermissionLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(PermissionLevel::None),
            "read" => Ok(PermissionLevel::Read),
            "write" => Ok(PermissionLevel::Write),
            "admin" => Ok(PermissionLevel::Admin),
            other => Err(UnknownLevel(other.to_string())),
        }
    }
}

/// Error returned when a string is not a recognized permission level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown permission level: {}", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

/// A single condition value
///
/// Conditions in the hosted store are plain JSON scalars; modeling them as
/// a closed union instead of an `any` map keeps a typo'd condition from
/// silently matching. Comparison is exact equality, no coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        ConditionValue::Bool(value)
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        ConditionValue::Int(value)
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Text(value.to_string())
    }
}

/// Key/value constraints attached to a permission, and likewise the
/// request context they are checked against
pub type Conditions = BTreeMap<String, ConditionValue>;

/// A normalized permission grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    /// `"*"` or a dot-delimited resource name
    pub resource: String,
    /// Access level this grant confers
    pub level: PermissionLevel,
    /// Exact-match constraints; empty means the grant is unconditional
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: Conditions,
}

impl Permission {
    /// Create an unconditional permission
    pub fn new(resource: impl Into<String>, level: PermissionLevel) -> Self {
        Self {
            resource: resource.into(),
            level,
            conditions: Conditions::new(),
        }
    }

    /// Create a permission with conditions attached
    pub fn with_conditions(
        resource: impl Into<String>,
        level: PermissionLevel,
        conditions: Conditions,
    ) -> Self {
        Self {
            resource: resource.into(),
            level,
            conditions,
        }
    }

    /// True if this is the `"*"` wildcard grant
    pub fn is_wildcard(&self) -> bool {
        self.resource == WILDCARD
    }

    /// Check whether this permission applies to the requested resource
    ///
    /// Matches the wildcard, the exact resource name, or — when the
    /// request names a nested resource like `"procurement.orders"` — the
    /// segment before the first `.`.
    pub fn matches_resource(&self, requested: &str) -> bool {
        if self.is_wildcard() || self.resource == requested {
            return true;
        }
        match requested.split_once('.') {
            Some((head, _)) => self.resource == head,
            None => false,
        }
    }

    /// Check whether every condition holds exactly in `context`
    ///
    /// An empty condition set always passes; a missing or unequal key
    /// fails the whole conjunction.
    pub fn conditions_met(&self, context: &Conditions) -> bool {
        self.conditions
            .iter()
            .all(|(key, value)| context.get(key) == Some(value))
    }
}

/// Parse the legacy `"resource.level"` shorthand
///
/// The suffix after the last `.` is read as a level when it names one;
/// otherwise the whole string is the resource and the level defaults to
/// `Read`. So `"procurement.write"` grants Write on `procurement`, while
/// `"procurement.orders"` grants Read on `procurement.orders`.
pub fn parse_shorthand(raw: &str) -> (String, PermissionLevel) {
    if let Some((resource, suffix)) = raw.rsplit_once('.') {
        if !resource.is_empty() {
            if let Ok(level) = suffix.parse::<PermissionLevel>() {
                return (resource.to_string(), level);
            }
        }
    }
    (raw.to_string(), PermissionLevel::Read)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(PermissionLevel::None < PermissionLevel::Read);
        assert!(PermissionLevel::Read < PermissionLevel::Write);
        assert!(PermissionLevel::Write < PermissionLevel::Admin);
    }

    #[test]
    fn test_level_satisfies() {
        // Admin satisfies everything
        for level in PermissionLevel::all() {
            assert!(PermissionLevel::Admin.satisfies(level));
        }

        assert!(PermissionLevel::Write.satisfies(PermissionLevel::Read));
        assert!(PermissionLevel::Write.satisfies(PermissionLevel::Write));
        assert!(!PermissionLevel::Write.satisfies(PermissionLevel::Admin));
        assert!(!PermissionLevel::None.satisfies(PermissionLevel::Read));
        assert!(PermissionLevel::None.satisfies(PermissionLevel::None));
    }

    #[test]
    fn test_level_display_and_parse() {
        for level in PermissionLevel::all() {
            assert_eq!(level.to_string().parse::<PermissionLevel>(), Ok(level));
        }

        let err = "owner".parse::<PermissionLevel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown permission level: owner");
    }

    #[test]
    fn test_level_serde_lowercase() {
        let json = serde_json::to_string(&PermissionLevel::Write).unwrap();
        assert_eq!(json, "\"write\"");

        let level: PermissionLevel = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(level, PermissionLevel::Admin);
    }

    #[test]
    fn test_matches_resource_exact() {
        let perm = Permission::new("procurement.orders", PermissionLevel::Read);
        assert!(perm.matches_resource("procurement.orders"));
        assert!(!perm.matches_resource("procurement"));
        assert!(!perm.matches_resource("finance.invoices"));
    }

    #[test]
    fn test_matches_resource_prefix() {
        let perm = Permission::new("procurement", PermissionLevel::Write);
        assert!(perm.matches_resource("procurement"));
        assert!(perm.matches_resource("procurement.orders"));
        assert!(perm.matches_resource("procurement.orders.lines"));
        assert!(!perm.matches_resource("procurementx.orders"));
        assert!(!perm.matches_resource("finance.invoices"));
    }

    #[test]
    fn test_matches_resource_wildcard() {
        let perm = Permission::new(WILDCARD, PermissionLevel::Admin);
        assert!(perm.is_wildcard());
        assert!(perm.matches_resource("anything"));
        assert!(perm.matches_resource("anything.at.all"));
    }

    #[test]
    fn test_conditions_met() {
        let mut conditions = Conditions::new();
        conditions.insert(DEPARTMENT_ONLY.to_string(), true.into());
        let perm = Permission::with_conditions("hr", PermissionLevel::Write, conditions);

        let empty = Conditions::new();
        assert!(!perm.conditions_met(&empty));

        let mut mismatched = Conditions::new();
        mismatched.insert(DEPARTMENT_ONLY.to_string(), false.into());
        assert!(!perm.conditions_met(&mismatched));

        let mut matching = Conditions::new();
        matching.insert(DEPARTMENT_ONLY.to_string(), true.into());
        assert!(perm.conditions_met(&matching));

        // Extra context keys don't hurt
        matching.insert("region".to_string(), "emea".into());
        assert!(perm.conditions_met(&matching));
    }

    #[test]
    fn test_conditions_conjunction() {
        let mut conditions = Conditions::new();
        conditions.insert("departmentOnly".to_string(), true.into());
        conditions.insert("region".to_string(), "emea".into());
        let perm = Permission::with_conditions("logistics", PermissionLevel::Write, conditions);

        let mut partial = Conditions::new();
        partial.insert("departmentOnly".to_string(), true.into());
        assert!(!perm.conditions_met(&partial));

        partial.insert("region".to_string(), "emea".into());
        assert!(perm.conditions_met(&partial));
    }

    #[test]
    fn test_empty_conditions_always_pass() {
        let perm = Permission::new("finance", PermissionLevel::Read);
        assert!(perm.conditions_met(&Conditions::new()));

        let mut context = Conditions::new();
        context.insert("anything".to_string(), 7i64.into());
        assert!(perm.conditions_met(&context));
    }

    #[test]
    fn test_condition_value_no_coercion() {
        assert_ne!(
            ConditionValue::Bool(true),
            ConditionValue::Text("true".to_string())
        );
        assert_ne!(ConditionValue::Int(1), ConditionValue::Bool(true));
    }

    #[test]
    fn test_parse_shorthand() {
        assert_eq!(
            parse_shorthand("procurement.write"),
            ("procurement".to_string(), PermissionLevel::Write)
        );
        assert_eq!(
            parse_shorthand("inventory"),
            ("inventory".to_string(), PermissionLevel::Read)
        );
        // Suffix that isn't a level stays part of the resource
        assert_eq!(
            parse_shorthand("procurement.orders"),
            ("procurement.orders".to_string(), PermissionLevel::Read)
        );
        // Nested resource with a level suffix
        assert_eq!(
            parse_shorthand("procurement.orders.admin"),
            ("procurement.orders".to_string(), PermissionLevel::Admin)
        );
        // A bare level name with nothing before the dot is a resource
        assert_eq!(
            parse_shorthand(".write"),
            (".write".to_string(), PermissionLevel::Read)
        );
    }

    #[test]
    fn test_permission_serde_roundtrip() {
        let mut conditions = Conditions::new();
        conditions.insert(DEPARTMENT_ONLY.to_string(), true.into());
        let perm = Permission::with_conditions("hr.records", PermissionLevel::Write, conditions);

        let json = serde_json::to_string(&perm).unwrap();
        let back: Permission = serde_json::from_str(&json).unwrap();
        assert_eq!(perm, back);

        // Unconditional permissions serialize without a conditions field
        let plain = Permission::new("finance", PermissionLevel::Read);
        let json = serde_json::to_string(&plain).unwrap();
        assert!(!json.contains("conditions"));
    }
}
