//! Error types for configuration loading.

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while reading connection settings.
///
/// None of these escape the top-level resolver: they are downgraded to
/// warnings and the offending value is treated as absent.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format.
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    /// Invalid environment variable value.
    #[error("invalid environment variable '{name}': {message}")]
    InvalidEnvValue { name: String, message: String },

    /// PEM or base64 material could not be decoded.
    #[error("invalid SSL material in '{name}': {message}")]
    InvalidPem { name: String, message: String },

    /// Environment file could not be read.
    #[error("failed to load environment file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

impl ConfigError {
    /// Create an invalid URL error.
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl(message.into())
    }

    /// Create an invalid environment value error.
    pub fn invalid_env(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvValue {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid PEM error.
    pub fn invalid_pem(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPem {
            name: name.into(),
            message: message.into(),
        }
    }
}
