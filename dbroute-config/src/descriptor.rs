//! The resolved connection descriptor handed to a database driver.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::client::DatabaseClient;
use crate::connection_url::{QueryParams, redact};
use crate::pool::PoolSettings;
use crate::routing::RoutingReport;
use crate::ssl::{PemValue, SslMode, SslPolicy};

/// How the driver should resolve the host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "strategy", content = "address", rename_all = "lowercase")]
pub enum LookupStrategy {
    /// Let the driver resolve through the OS default path.
    #[default]
    System,
    /// Dial this IPv4 address, keeping the host name for TLS.
    Ipv4(Ipv4Addr),
}

/// A network database endpoint with credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConnection {
    /// Host name or address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Username.
    pub user: String,
    /// Password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// PostgreSQL schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Encryption policy.
    pub ssl: SslPolicy,
    /// Connection-string query parameters.
    pub params: QueryParams,
    /// Rendered connection string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    /// Host resolution strategy.
    pub lookup: LookupStrategy,
}

impl ServerConnection {
    /// Get a query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The `options` parameter.
    pub fn options(&self) -> Option<&str> {
        self.param("options")
    }

    /// The parsed `sslmode` parameter.
    pub fn ssl_mode(&self) -> Option<SslMode> {
        self.param("sslmode").and_then(SslMode::parse)
    }
}

/// Client-specific connection target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Connection {
    /// A database file (SQLite).
    File {
        /// Path to the database file.
        filename: PathBuf,
    },
    /// A network server.
    Server(ServerConnection),
}

/// The final, resolved connection configuration.
///
/// Built once at startup and treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDescriptor {
    /// Database client.
    pub client: DatabaseClient,
    /// Connection target.
    pub connection: Connection,
    /// Pool settings (absent for SQLite).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolSettings>,
    /// Insert NULL for unspecified columns (SQLite).
    pub use_null_as_default: bool,
    /// Time to wait when acquiring a connection.
    #[serde(rename = "acquire_connection_timeout_ms", serialize_with = "crate::pool::millis::duration")]
    pub acquire_connection_timeout: Duration,
    /// How the endpoint was chosen (PostgreSQL only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingReport>,
}

impl ConnectionDescriptor {
    /// Network endpoint, for server clients.
    pub fn server(&self) -> Option<&ServerConnection> {
        match &self.connection {
            Connection::Server(server) => Some(server),
            Connection::File { .. } => None,
        }
    }

    /// Database file, for SQLite.
    pub fn filename(&self) -> Option<&Path> {
        match &self.connection {
            Connection::File { filename } => Some(filename),
            Connection::Server(_) => None,
        }
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Connection::Server(server) = &mut copy.connection {
            if server.password.is_some() {
                server.password = Some("****".to_string());
            }
            if let Some(cs) = &server.connection_string {
                server.connection_string = Some(redact(cs));
            }
            if let SslPolicy::Enabled(material) = &mut server.ssl {
                if material.key.is_some() {
                    material.key = Some(PemValue::from_raw("****"));
                }
            }
        }
        copy
    }
}
