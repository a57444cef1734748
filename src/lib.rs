//! # dbroute
//!
//! Resolve a single database connection descriptor from a patchwork of
//! environment variables.
//!
//! dbroute provides:
//! - Static descriptors for SQLite, MySQL and PostgreSQL
//! - Managed-Postgres routing between direct, pooler, raw-URL and custom
//!   IPv4 endpoints, with optional live probing
//! - IPv4 pinning expressed as a driver `hostaddr`
//! - SSL material accepted as raw or base64-encoded PEM
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dbroute::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     dbroute::logging::init();
//!
//!     let descriptor = Resolver::from_env().resolve().await;
//!     if let Some(server) = descriptor.server() {
//!         let config = dbroute::postgres::pg_config(server);
//!         println!("connecting to {:?}", config.get_hosts());
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod logging;
pub mod resolver;

/// Environment layer, descriptor and routing types.
pub mod config {
    pub use dbroute_config::*;
}

/// PostgreSQL routing, probing and driver handoff.
pub mod postgres {
    pub use dbroute_postgres::*;
}

pub use resolver::{Resolver, resolve};

// Re-export key types at the crate root
pub use dbroute_config::{
    Connection, ConnectionDescriptor, DatabaseClient, EnvSource, LookupStrategy, MapEnvSource,
    RoutingReport, ServerConnection, StdEnvSource,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::prelude::*;
    pub use crate::postgres::{HostResolver, PgProber, ProbeRequest, Prober, StaticResolver, SystemResolver};
    pub use crate::resolver::{Resolver, resolve};
}
