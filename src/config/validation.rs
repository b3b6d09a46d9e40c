use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use garde::Validate;

use super::AccessConfig;
use crate::error::AccessError;

/// Load configuration with the 4-tier hierarchy
///
/// Lowest to highest precedence: embedded defaults, `config/default.toml`,
/// `config/{ENVIRONMENT}.toml`, then `ACCESS_*` environment variables
/// (nested keys split on `__`, e.g. `ACCESS_CACHE__DEFAULT_TTL_SECONDS`).
pub fn load_config() -> Result<AccessConfig, AccessError> {
    let env_name =
        std::env::var("ENVIRONMENT").unwrap_or_else(|_| "production".to_string());

    let figment = Figment::new()
        .merge(Serialized::defaults(AccessConfig::default()))
        .merge(Toml::file("config/default.toml").nested())
        .merge(Toml::file(format!("config/{}.toml", env_name)).nested())
        .merge(Env::prefixed("ACCESS_").split("__"));

    let config: AccessConfig = figment
        .extract()
        .map_err(|err| AccessError::Config(err.to_string()))?;

    config
        .validate()
        .map_err(|report| AccessError::Config(report.to_string()))?;

    Ok(config)
}
