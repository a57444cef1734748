//! The top-level connection resolver.

use std::path::PathBuf;
use std::sync::Arc;

use dbroute_config::{
    ConnectionDescriptor, DatabaseClient, EnvReader, EnvSource, LookupStrategy, Selection,
    StdEnvSource, mysql, sqlite,
};
use dbroute_postgres::{HostResolver, PgProber, Prober, SystemResolver};
use tracing::{debug, info, warn};

/// Resolves one [`ConnectionDescriptor`] from an environment.
///
/// Resolution never fails: missing values take defaults, and network
/// problems during probing or IPv4 lookup are recorded as warnings in the
/// descriptor's routing report.
///
/// # Example
///
/// ```rust
/// use dbroute::{MapEnvSource, Resolver};
///
/// # tokio_test_block(async {
/// let descriptor = Resolver::new(MapEnvSource::new())
///     .project_root("/srv/cms")
///     .resolve()
///     .await;
///
/// assert_eq!(descriptor.client, dbroute::DatabaseClient::Sqlite);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
pub struct Resolver<S> {
    source: S,
    project_root: PathBuf,
    prober: Arc<dyn Prober>,
    dns: Arc<dyn HostResolver>,
}

impl Resolver<StdEnvSource> {
    /// Resolver over the live process environment.
    pub fn from_env() -> Self {
        Self::new(StdEnvSource)
    }
}

impl<S: EnvSource> Resolver<S> {
    /// Create a resolver over an environment source.
    ///
    /// Probing uses a real PostgreSQL handshake and IPv4 lookups go through
    /// the operating system until replaced.
    pub fn new(source: S) -> Self {
        Self {
            source,
            project_root: PathBuf::from("."),
            prober: Arc::new(PgProber),
            dns: Arc::new(SystemResolver),
        }
    }

    /// Replace the prober.
    pub fn with_prober(mut self, prober: impl Prober + 'static) -> Self {
        self.prober = Arc::new(prober);
        self
    }

    /// Replace the IPv4 host resolver.
    pub fn with_dns(mut self, resolver: impl HostResolver + 'static) -> Self {
        self.dns = Arc::new(resolver);
        self
    }

    /// Base directory for the SQLite database file.
    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// The environment source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The client selected by `DATABASE_CLIENT`.
    ///
    /// Unknown values fall back to SQLite.
    pub fn client(&self) -> DatabaseClient {
        let env = EnvReader::new(&self.source);
        match env.string("DATABASE_CLIENT") {
            Some(raw) => DatabaseClient::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown DATABASE_CLIENT, using sqlite");
                DatabaseClient::Sqlite
            }),
            None => DatabaseClient::default(),
        }
    }

    /// Resolve the connection descriptor.
    pub async fn resolve(&self) -> ConnectionDescriptor {
        let env = EnvReader::new(&self.source);
        let client = self.client();
        debug!(client = %client, "Resolving database connection");

        let descriptor = match client {
            DatabaseClient::Sqlite => sqlite::descriptor(&env, &self.project_root),
            DatabaseClient::MySql => mysql::descriptor(&env),
            DatabaseClient::Postgres => {
                dbroute_postgres::descriptor(&env, self.prober.as_ref(), self.dns.as_ref()).await
            }
        };

        log_summary(&descriptor, env.bool("LOG_DB_CONNECTION_DETAILS", false));
        descriptor
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Resolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("source", &self.source)
            .field("project_root", &self.project_root)
            .finish_non_exhaustive()
    }
}

/// Resolve a descriptor from a source with the default prober and resolver.
pub async fn resolve<S: EnvSource>(source: S) -> ConnectionDescriptor {
    Resolver::new(source).resolve().await
}

macro_rules! summary {
    ($detailed:expr, $($arg:tt)+) => {
        if $detailed {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

fn log_summary(descriptor: &ConnectionDescriptor, detailed: bool) {
    match descriptor.server() {
        Some(server) => {
            let routing = descriptor.routing.as_ref();
            let selection = routing.map(|r| match r.selection {
                Selection::Static => "static".to_string(),
                Selection::Candidate(mode) => mode.to_string(),
            });
            let lookup = match server.lookup {
                LookupStrategy::System => "system".to_string(),
                LookupStrategy::Ipv4(addr) => format!("ipv4 {}", addr),
            };
            summary!(
                detailed,
                client = %descriptor.client,
                host = %server.host,
                port = server.port,
                database = %server.database,
                options = ?server.options(),
                sslmode = ?server.param("sslmode"),
                selection = ?selection,
                attempts = routing.map_or(0, |r| r.attempts.len()),
                lookup = %lookup,
                "Database connection resolved"
            );
        }
        None => {
            summary!(
                detailed,
                client = %descriptor.client,
                filename = ?descriptor.filename(),
                "Database connection resolved"
            );
        }
    }
}
