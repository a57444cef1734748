//! Error types for PostgreSQL routing.

use thiserror::Error;

/// Result type for PostgreSQL routing operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur while routing or probing.
///
/// None of these escape [`crate::router::route`]; they are downgraded to
/// warnings and probe attempt records there.
#[derive(Error, Debug)]
pub enum PgError {
    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// I/O error (DNS lookup, socket).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS setup error.
    #[error("tls error: {0}")]
    Tls(String),

    /// DNS resolution error.
    #[error("dns error: {0}")]
    Dns(String),

    /// Timeout error.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a TLS error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create a DNS error.
    pub fn dns(message: impl Into<String>) -> Self {
        Self::Dns(message.into())
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is a TLS setup error.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PgError::config("missing host");
        assert!(matches!(err, PgError::Config(_)));
        assert_eq!(err.to_string(), "configuration error: missing host");

        let err = PgError::tls("bad certificate");
        assert!(err.is_tls());

        let err = PgError::Timeout(7000);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "operation timed out after 7000ms");
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: PgError = io.into();
        assert!(matches!(err, PgError::Io(_)));
    }
}
