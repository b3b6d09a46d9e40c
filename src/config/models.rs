use garde::Validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Validate, Default)]
pub struct AccessConfig {
    #[garde(dive)]
    #[serde(default)]
    pub cache: CacheSettings,

    #[garde(dive)]
    #[serde(default)]
    pub permissions: PermissionSettings,

    #[garde(dive)]
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CacheSettings {
    /// TTL applied when a caller doesn't pick one
    #[garde(range(min = 1, max = 86400))]
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_seconds: u64,

    /// Background sweep period
    #[garde(range(min = 1, max = 3600))]
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 300,
            sweep_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct PermissionSettings {
    /// How long a user's resolved permission set stays cached
    #[garde(range(min = 1, max = 86400))]
    #[serde(default = "default_permissions_ttl")]
    pub ttl_seconds: u64,
}

fn default_permissions_ttl() -> u64 {
    300
}

impl Default for PermissionSettings {
    fn default() -> Self {
        Self { ttl_seconds: 300 }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LoggingConfig {
    #[garde(length(min = 1), custom(validate_log_level))]
    #[serde(default = "default_log_level")]
    pub level: String, // trace, debug, info, warn, error

    #[garde(pattern(r"^(json|pretty)$"))]
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

fn validate_log_level(value: &str, _: &()) -> garde::Result {
    value
        .parse::<tracing::Level>()
        .map(|_| ())
        .map_err(|_| garde::Error::new("Invalid log level"))
}
