//! Live reachability probes.
//!
//! A probe is a single short-lived connection: connect, authenticate, drop.
//! It never retries; the router moves on to the next candidate instead.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use dbroute_config::{AttemptFailure, CandidateMode, FailureKind, ServerConnection, SslPolicy};
use tokio_postgres::NoTls;
use tracing::debug;

use crate::config::pg_config;
use crate::error::{PgError, PgResult};
use crate::tls::make_connector;

/// One probe to run.
#[derive(Debug, Clone, Copy)]
pub struct ProbeRequest<'a> {
    /// Candidate kind.
    pub mode: CandidateMode,
    /// Endpoint to connect to.
    pub server: &'a ServerConnection,
    /// Upper bound for the whole attempt.
    pub timeout: Duration,
}

/// Tests whether an endpoint accepts a connection.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Run one probe.
    async fn probe(&self, request: &ProbeRequest<'_>) -> Result<(), AttemptFailure>;
}

/// Prober performing a real PostgreSQL handshake.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgProber;

#[async_trait]
impl Prober for PgProber {
    async fn probe(&self, request: &ProbeRequest<'_>) -> Result<(), AttemptFailure> {
        let mut config = pg_config(request.server);
        config.connect_timeout(request.timeout);

        debug!(
            mode = %request.mode,
            host = %request.server.host,
            port = request.server.port,
            "Probing connection candidate"
        );

        match tokio::time::timeout(request.timeout, handshake(&config, &request.server.ssl)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(failure_from_error(&e)),
            Err(_) => Err(failure_from_error(&PgError::Timeout(
                request.timeout.as_millis() as u64,
            ))),
        }
    }
}

async fn handshake(config: &tokio_postgres::Config, ssl: &SslPolicy) -> PgResult<()> {
    match make_connector(ssl)? {
        Some(tls) => {
            let (_client, connection) = config.connect(tls).await?;
            drop(connection);
        }
        None => {
            let (_client, connection) = config.connect(NoTls).await?;
            drop(connection);
        }
    }
    Ok(())
}

/// Classify an error into an attempt failure.
pub fn failure_from_error(err: &PgError) -> AttemptFailure {
    match err {
        PgError::Postgres(e) => failure_from_postgres(e),
        PgError::Io(e) => AttemptFailure {
            kind: kind_from_io(e, &e.to_string()),
            message: e.to_string(),
            code: Some(format!("{:?}", e.kind())),
        },
        PgError::Tls(_) => failure(FailureKind::Tls, err),
        PgError::Dns(_) => failure(FailureKind::Dns, err),
        PgError::Timeout(_) => failure(FailureKind::Timeout, err),
        PgError::Config(_) => failure(FailureKind::Other, err),
    }
}

fn failure(kind: FailureKind, err: &PgError) -> AttemptFailure {
    AttemptFailure {
        kind,
        message: err.to_string(),
        code: None,
    }
}

fn failure_from_postgres(e: &tokio_postgres::Error) -> AttemptFailure {
    if let Some(db) = e.as_db_error() {
        let code = db.code().code();
        return AttemptFailure {
            kind: kind_from_sqlstate(code),
            message: db.message().to_string(),
            code: Some(code.to_string()),
        };
    }

    let message = e.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("tls") || lowered.contains("certificate") {
        return AttemptFailure {
            kind: FailureKind::Tls,
            message,
            code: None,
        };
    }

    match io_source(e) {
        Some(io) => AttemptFailure {
            kind: kind_from_io(io, &message),
            code: Some(format!("{:?}", io.kind())),
            message,
        },
        None => AttemptFailure {
            kind: kind_from_message(&message),
            message,
            code: None,
        },
    }
}

fn io_source<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    let mut current = err.source();
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            return Some(io);
        }
        current = e.source();
    }
    None
}

/// Invalid authorization and unknown database both count as auth failures.
pub fn kind_from_sqlstate(code: &str) -> FailureKind {
    if code.starts_with("28") || code == "3D000" {
        FailureKind::Auth
    } else {
        FailureKind::Other
    }
}

fn kind_from_io(e: &io::Error, message: &str) -> FailureKind {
    match e.kind() {
        io::ErrorKind::TimedOut => FailureKind::Timeout,
        _ if kind_from_message(message) == FailureKind::Dns => FailureKind::Dns,
        _ => FailureKind::Connect,
    }
}

/// Best-effort classification from driver error text.
pub fn kind_from_message(message: &str) -> FailureKind {
    let m = message.to_lowercase();
    if m.contains("timeout") || m.contains("timed out") {
        FailureKind::Timeout
    } else if m.contains("lookup") || m.contains("resolve") || m.contains("name or service") {
        FailureKind::Dns
    } else if m.contains("tls") || m.contains("ssl") || m.contains("certificate") {
        FailureKind::Tls
    } else if m.contains("password") || m.contains("authentication") {
        FailureKind::Auth
    } else if m.contains("connect") || m.contains("refused") || m.contains("unreachable") {
        FailureKind::Connect
    } else {
        FailureKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbroute_config::{LookupStrategy, QueryParams};
    use std::net::TcpListener;

    #[test]
    fn test_sqlstate_kinds() {
        assert_eq!(kind_from_sqlstate("28P01"), FailureKind::Auth);
        assert_eq!(kind_from_sqlstate("28000"), FailureKind::Auth);
        assert_eq!(kind_from_sqlstate("3D000"), FailureKind::Auth);
        assert_eq!(kind_from_sqlstate("53300"), FailureKind::Other);
    }

    #[test]
    fn test_message_kinds() {
        assert_eq!(kind_from_message("timeout waiting for server"), FailureKind::Timeout);
        assert_eq!(
            kind_from_message("error connecting to server: failed to lookup address information"),
            FailureKind::Dns
        );
        assert_eq!(kind_from_message("error performing TLS handshake"), FailureKind::Tls);
        assert_eq!(kind_from_message("password authentication failed"), FailureKind::Auth);
        assert_eq!(kind_from_message("Connection refused (os error 111)"), FailureKind::Connect);
        assert_eq!(kind_from_message("something odd"), FailureKind::Other);
    }

    #[test]
    fn test_failure_from_local_errors() {
        let timeout = failure_from_error(&PgError::Timeout(7000));
        assert_eq!(timeout.kind, FailureKind::Timeout);
        assert_eq!(timeout.message, "operation timed out after 7000ms");

        let refused = failure_from_error(&PgError::Io(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "refused",
        )));
        assert_eq!(refused.kind, FailureKind::Connect);
        assert_eq!(refused.code.as_deref(), Some("ConnectionRefused"));

        assert_eq!(failure_from_error(&PgError::tls("bad ca")).kind, FailureKind::Tls);
    }

    #[tokio::test]
    async fn test_probe_closed_port_fails() {
        // Bind then drop to get a port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();

        let server = ServerConnection {
            host: "127.0.0.1".into(),
            port,
            database: "postgres".into(),
            user: "postgres".into(),
            password: None,
            schema: None,
            ssl: SslPolicy::Disabled,
            params: QueryParams::new(),
            connection_string: None,
            lookup: LookupStrategy::System,
        };
        let request = ProbeRequest {
            mode: CandidateMode::Direct,
            server: &server,
            timeout: Duration::from_secs(2),
        };

        let failure = PgProber.probe(&request).await.unwrap_err();
        assert!(matches!(failure.kind, FailureKind::Connect | FailureKind::Timeout));
    }
}
