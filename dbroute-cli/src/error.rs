//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(dbroute::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(dbroute::config))]
    Config(#[from] dbroute_config::ConfigError),

    /// Output serialization error
    #[error("Serialization error: {0}")]
    #[diagnostic(code(dbroute::serialization))]
    Serialization(String),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(dbroute::command))]
    Command(String),
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Serialization(format!("Failed to serialize JSON: {}", err))
    }
}
