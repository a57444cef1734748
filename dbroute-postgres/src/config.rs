//! Conversion of a resolved server connection into driver configuration.

use std::net::IpAddr;
use std::time::Duration;

use dbroute_config::{LookupStrategy, ServerConnection, SslMode};
use tokio_postgres::config::SslMode as PgSslMode;

/// Build a `tokio_postgres::Config` for a resolved endpoint.
///
/// A forced IPv4 lookup becomes `hostaddr`; the host name is kept for TLS
/// server name verification.
pub fn pg_config(server: &ServerConnection) -> tokio_postgres::Config {
    let mut config = tokio_postgres::Config::new();
    config.host(&server.host);
    config.port(server.port);
    config.dbname(&server.database);
    config.user(&server.user);

    if let Some(ref password) = server.password {
        config.password(password);
    }

    if let LookupStrategy::Ipv4(addr) = server.lookup {
        config.hostaddr(IpAddr::V4(addr));
    }

    if let Some(options) = server.options().filter(|o| !o.is_empty()) {
        config.options(options);
    }

    if let Some(name) = server.param("application_name") {
        config.application_name(name);
    }

    if let Some(secs) = server.param("connect_timeout").and_then(|v| v.parse::<u64>().ok()) {
        config.connect_timeout(Duration::from_secs(secs));
    }

    config.ssl_mode(ssl_mode(server));
    config
}

/// Driver SSL mode: the `sslmode` parameter, bounded by the SSL policy.
pub fn ssl_mode(server: &ServerConnection) -> PgSslMode {
    if !server.ssl.is_enabled() {
        return PgSslMode::Disable;
    }
    match server.ssl_mode().unwrap_or_default() {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow | SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => PgSslMode::Require,
    }
}
