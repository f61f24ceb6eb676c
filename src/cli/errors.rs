//! CLI-specific error types

use thiserror::Error;

use crate::store::StoreError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file error
    #[error("configuration error: {0}")]
    Config(String),

    /// Store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Output could not be written
    #[error("output error: {0}")]
    Output(String),
}

impl CliError {
    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Output(format!("JSON error: {}", e))
    }
}
