//! MySQL descriptor.
//!
//! MySQL takes its settings verbatim from the environment; there is no
//! endpoint routing.

use tracing::warn;

use crate::DEFAULT_CONNECTION_TIMEOUT_MS;
use crate::client::DatabaseClient;
use crate::connection_url::QueryParams;
use crate::descriptor::{Connection, ConnectionDescriptor, LookupStrategy, ServerConnection};
use crate::env::{EnvReader, EnvSource};
use crate::pool::PoolSettings;
use crate::ssl::SslPolicy;

/// Build the MySQL descriptor.
///
/// SSL is off unless `DATABASE_SSL` is set, and verifies certificates by
/// default when on. SSL material that fails to decode is logged and left out.
pub fn descriptor<S: EnvSource + ?Sized>(env: &EnvReader<'_, S>) -> ConnectionDescriptor {
    let mut warnings = Vec::new();
    let ssl = SslPolicy::from_env(env, false, true, &mut warnings);
    for warning in &warnings {
        warn!(client = "mysql", warning = %warning, "SSL material left out of the descriptor");
    }

    let server = ServerConnection {
        host: env.string_or("DATABASE_HOST", "localhost"),
        port: env.int("DATABASE_PORT", 3306u16),
        database: env.string_or("DATABASE_NAME", "strapi"),
        user: env.string_or("DATABASE_USERNAME", "strapi"),
        password: Some(env.raw("DATABASE_PASSWORD").unwrap_or_else(|| "strapi".to_string())),
        schema: None,
        ssl,
        params: QueryParams::new(),
        connection_string: None,
        lookup: LookupStrategy::System,
    };

    ConnectionDescriptor {
        client: DatabaseClient::MySql,
        connection: Connection::Server(server),
        pool: Some(PoolSettings::limits_from_env(env)),
        use_null_as_default: false,
        acquire_connection_timeout: env
            .millis("DATABASE_CONNECTION_TIMEOUT", DEFAULT_CONNECTION_TIMEOUT_MS),
        routing: None,
    }
}
