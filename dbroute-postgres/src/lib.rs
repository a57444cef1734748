//! # dbroute-postgres
//!
//! PostgreSQL endpoint routing for dbroute.
//!
//! This crate provides:
//! - Settings for PostgreSQL and its managed-provider routing, read from the environment
//! - Project reference derivation from overrides, `options` and hostnames
//! - Direct / pooler / URL / custom-IPv4 candidates, deduplicated and ordered
//! - Optional live probing through `tokio-postgres` with a rustls connector
//! - IPv4 pinning via `hostaddr`, without touching process-wide DNS settings
//! - Conversion of the result into a `tokio_postgres::Config`
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbroute_config::{EnvReader, StdEnvSource};
//! use dbroute_postgres::{PgProber, SystemResolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let env = EnvReader::new(&StdEnvSource);
//!     let descriptor = dbroute_postgres::descriptor(&env, &PgProber, &SystemResolver).await;
//!
//!     let server = descriptor.server().expect("postgres descriptor");
//!     let config = dbroute_postgres::pg_config(server);
//!     match dbroute_postgres::tls::make_connector(&server.ssl)? {
//!         Some(tls) => { config.connect(tls).await?; }
//!         None => { config.connect(tokio_postgres::NoTls).await?; }
//!     }
//!     Ok(())
//! }
//! ```

pub mod candidate;
pub mod config;
pub mod dns;
pub mod error;
pub mod probe;
pub mod project;
pub mod router;
pub mod settings;
pub mod tls;

use dbroute_config::{
    Connection, ConnectionDescriptor, DEFAULT_CONNECTION_TIMEOUT_MS, DatabaseClient, EnvReader,
    EnvSource,
};

pub use candidate::ConnectionCandidate;
pub use config::pg_config;
pub use dns::{HostResolver, StaticResolver, SystemResolver};
pub use error::{PgError, PgResult};
pub use probe::{PgProber, ProbeRequest, Prober};
pub use project::ProjectRef;
pub use router::route;
pub use settings::{PostgresSettings, SupabaseSettings};

/// Resolve the PostgreSQL descriptor from the environment.
pub async fn descriptor<S, P, R>(env: &EnvReader<'_, S>, prober: &P, resolver: &R) -> ConnectionDescriptor
where
    S: EnvSource + ?Sized,
    P: Prober + ?Sized,
    R: HostResolver + ?Sized,
{
    let settings = PostgresSettings::from_env(env);
    let (server, report) = route(&settings, prober, resolver).await;

    ConnectionDescriptor {
        client: DatabaseClient::Postgres,
        connection: Connection::Server(server),
        pool: Some(settings.pool),
        use_null_as_default: false,
        acquire_connection_timeout: env
            .millis("DATABASE_CONNECTION_TIMEOUT", DEFAULT_CONNECTION_TIMEOUT_MS),
        routing: Some(report),
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dns::{HostResolver, StaticResolver, SystemResolver};
    pub use crate::error::{PgError, PgResult};
    pub use crate::probe::{PgProber, ProbeRequest, Prober};
    pub use crate::settings::PostgresSettings;
    pub use crate::{descriptor, pg_config, route};
}
