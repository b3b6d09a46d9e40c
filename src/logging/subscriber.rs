use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::AccessError;

/// Set up the tracing subscriber from configuration
///
/// Supports two formats:
/// - "json": structured JSON output for production
/// - "pretty": human-readable format for development
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn setup_tracing(config: &LoggingConfig) -> Result<(), AccessError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init()
                .map_err(|err| AccessError::Internal(anyhow::anyhow!(err)))?;
        }
        "pretty" => {
            let pretty_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(pretty_layer)
                .try_init()
                .map_err(|err| AccessError::Internal(anyhow::anyhow!(err)))?;
        }
        other => {
            return Err(AccessError::Config(format!(
                "Unsupported log format: {}. Use 'json' or 'pretty'",
                other
            )));
        }
    }

    Ok(())
}
