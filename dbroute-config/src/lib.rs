//! # dbroute-config
//!
//! Environment-driven database connection settings for dbroute.
//!
//! This crate provides:
//! - An [`EnvSource`] abstraction over the process environment, with typed
//!   coercion through [`EnvReader`]
//! - Lenient connection URL parsing ([`ConnectionUrl`])
//! - SSL material normalization (raw PEM or base64-encoded PEM)
//! - Pool settings and the final [`ConnectionDescriptor`] handed to a driver
//! - Static descriptors for the `sqlite` and `mysql` clients
//!
//! ## Reading the environment
//!
//! ```rust
//! use dbroute_config::{EnvReader, MapEnvSource};
//!
//! let source = MapEnvSource::new()
//!     .set("DATABASE_PORT", "6543")
//!     .set("DATABASE_SSL", "off");
//! let env = EnvReader::new(&source);
//!
//! assert_eq!(env.int("DATABASE_PORT", 5432u16), 6543);
//! assert!(!env.bool("DATABASE_SSL", true));
//! assert_eq!(env.string_or("DATABASE_NAME", "strapi"), "strapi");
//! ```
//!
//! ## Database clients
//!
//! ```rust
//! use dbroute_config::DatabaseClient;
//!
//! assert_eq!(DatabaseClient::parse("postgresql"), Some(DatabaseClient::Postgres));
//! assert_eq!(DatabaseClient::parse("mariadb"), Some(DatabaseClient::MySql));
//! assert_eq!(DatabaseClient::Postgres.default_port(), Some(5432));
//! assert_eq!(DatabaseClient::Sqlite.default_port(), None);
//! ```

pub mod client;
pub mod connection_url;
pub mod descriptor;
pub mod env;
pub mod error;
pub mod mysql;
pub mod pool;
pub mod routing;
pub mod sqlite;
pub mod ssl;

pub use client::DatabaseClient;
pub use connection_url::{ConnectionUrl, QueryParams};
pub use descriptor::{Connection, ConnectionDescriptor, LookupStrategy, ServerConnection};
pub use env::{EnvReader, EnvSource, MapEnvSource, StdEnvSource, parse_bool};
pub use error::{ConfigError, ConfigResult};
pub use pool::PoolSettings;
pub use routing::{
    AttemptFailure, CandidateMode, ConnectionMode, FailureKind, ProbeAttempt, ProjectRefSource,
    RoutingReport, Selection,
};
pub use ssl::{PemValue, SslMaterial, SslMode, SslPolicy};

/// Default acquire-connection timeout applied to every client.
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 60_000;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::DatabaseClient;
    pub use crate::descriptor::{Connection, ConnectionDescriptor, LookupStrategy, ServerConnection};
    pub use crate::env::{EnvReader, EnvSource, MapEnvSource, StdEnvSource};
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::routing::{CandidateMode, ConnectionMode, RoutingReport, Selection};
    pub use crate::ssl::{SslMode, SslPolicy};
}
