use thiserror::Error;

use crate::services::directory::DirectoryError;

/// Errors surfaced by the crate's fallible entry points
///
/// Permission checks never return these — evaluation failures resolve to
/// a denied decision instead. What remains fallible is initialization:
/// configuration loading and logging setup.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}
