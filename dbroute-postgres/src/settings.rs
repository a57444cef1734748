//! PostgreSQL settings read from the environment.

use std::time::Duration;

use dbroute_config::{
    ConnectionMode, ConnectionUrl, EnvReader, EnvSource, PoolSettings, QueryParams, SslPolicy,
};
use tracing::warn;

/// Default probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 7_000;

/// Default port of the direct database host.
pub const DEFAULT_DIRECT_PORT: u16 = 5432;

/// Default port of the connection pooler.
pub const DEFAULT_POOLER_PORT: u16 = 6543;

/// Static PostgreSQL configuration, before any routing.
///
/// Credential precedence is explicit variable, then `DATABASE_URL`, then a
/// default. The defaults differ depending on whether a URL was given at all.
#[derive(Debug, Clone)]
pub struct PostgresSettings {
    /// Parsed `DATABASE_URL`, when present and well-formed.
    pub url: Option<ConnectionUrl>,
    /// Host.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Username.
    pub user: String,
    /// Password.
    pub password: Option<String>,
    /// Schema.
    pub schema: String,
    /// URL parameters with `DATABASE_OPTIONS`/`DATABASE_SSLMODE` applied.
    pub params: QueryParams,
    /// SSL policy.
    pub ssl: SslPolicy,
    /// Pool settings.
    pub pool: PoolSettings,
    /// Resolve the final host to an IPv4 address.
    pub force_ipv4: bool,
    /// Log the connection summary at info level.
    pub log_details: bool,
    /// Managed-provider routing settings.
    pub supabase: SupabaseSettings,
    /// Problems met while reading the environment.
    pub warnings: Vec<String>,
}

/// Routing settings for the managed provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    /// `SUPABASE_PROJECT_REF`, else `DATABASE_PROJECT`.
    pub project_ref: Option<String>,
    /// Requested topology.
    pub mode: ConnectionMode,
    /// Explicit pooler preference; `None` when unset.
    pub use_pooler: Option<bool>,
    /// Pooler host override.
    pub pooler_host: Option<String>,
    /// Pooler port override.
    pub pooler_port: Option<u16>,
    /// Direct host override.
    pub direct_host: Option<String>,
    /// Direct host port.
    pub direct_port: u16,
    /// Custom IPv4-reachable host.
    pub ipv4_host: Option<String>,
    /// Custom IPv4 host port.
    pub ipv4_port: u16,
    /// Probe candidates before choosing.
    pub enable_probe: bool,
    /// Per-attempt probe timeout.
    pub probe_timeout: Duration,
}

impl SupabaseSettings {
    /// Read from `SUPABASE_*` variables.
    pub fn from_env<S: EnvSource + ?Sized>(env: &EnvReader<'_, S>, warnings: &mut Vec<String>) -> Self {
        let mode = match env.string("SUPABASE_CONNECTION_MODE") {
            Some(raw) => ConnectionMode::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown SUPABASE_CONNECTION_MODE, using auto");
                warnings.push(format!("unknown SUPABASE_CONNECTION_MODE '{}', using auto", raw));
                ConnectionMode::Auto
            }),
            None => ConnectionMode::Auto,
        };

        Self {
            project_ref: env.first_of(&["SUPABASE_PROJECT_REF", "DATABASE_PROJECT"]),
            mode,
            use_pooler: env.bool_opt("SUPABASE_USE_POOLER"),
            pooler_host: env.string("SUPABASE_POOLER_HOST"),
            pooler_port: env.int_opt("SUPABASE_POOLER_PORT"),
            direct_host: env.string("SUPABASE_DIRECT_HOST"),
            direct_port: env.int("SUPABASE_DIRECT_PORT", DEFAULT_DIRECT_PORT),
            ipv4_host: env.string("SUPABASE_IPV4_HOST"),
            ipv4_port: env.int("SUPABASE_IPV4_PORT", DEFAULT_DIRECT_PORT),
            enable_probe: env.bool("SUPABASE_ENABLE_PROBE", false),
            probe_timeout: Duration::from_millis(
                env.int_opt::<u64>("SUPABASE_PROBE_TIMEOUT")
                    .filter(|&ms| ms > 0)
                    .unwrap_or(DEFAULT_PROBE_TIMEOUT_MS),
            ),
        }
    }
}

impl PostgresSettings {
    /// Read from the environment. Never fails; bad values fall back to
    /// defaults and are listed in `warnings`.
    pub fn from_env<S: EnvSource + ?Sized>(env: &EnvReader<'_, S>) -> Self {
        let mut warnings = Vec::new();

        let url = env.string("DATABASE_URL").and_then(|raw| {
            let parsed = ConnectionUrl::parse_lenient(&raw);
            if parsed.is_none() {
                warnings.push("DATABASE_URL is malformed and was ignored".to_string());
            }
            parsed
        });

        let (default_db, default_user, default_password) = if url.is_some() {
            ("postgres", "postgres", None)
        } else {
            ("strapi", "strapi", Some("strapi".to_string()))
        };

        let from_url = |pick: fn(&ConnectionUrl) -> Option<&String>| url.as_ref().and_then(pick).cloned();

        let host = env
            .string("DATABASE_HOST")
            .or_else(|| from_url(|u| u.host.as_ref()))
            .unwrap_or_else(|| "localhost".to_string());
        let port = env
            .int_opt("DATABASE_PORT")
            .or_else(|| url.as_ref().and_then(|u| u.port))
            .unwrap_or(DEFAULT_DIRECT_PORT);
        let database = env
            .string("DATABASE_NAME")
            .or_else(|| from_url(|u| u.database.as_ref()))
            .unwrap_or_else(|| default_db.to_string());
        let user = env
            .string("DATABASE_USERNAME")
            .or_else(|| from_url(|u| u.user.as_ref()))
            .unwrap_or_else(|| default_user.to_string());
        let password = env
            .raw("DATABASE_PASSWORD")
            .or_else(|| from_url(|u| u.password.as_ref()))
            .or(default_password);

        let mut params = url.as_ref().map(|u| u.params.clone()).unwrap_or_default();
        if let Some(options) = env.string("DATABASE_OPTIONS") {
            params.insert("options".to_string(), options);
        }
        if let Some(sslmode) = env.string("DATABASE_SSLMODE") {
            params.insert("sslmode".to_string(), sslmode);
        }

        let ssl = SslPolicy::from_env(env, true, false, &mut warnings);
        let supabase = SupabaseSettings::from_env(env, &mut warnings);

        Self {
            url,
            host,
            port,
            database,
            user,
            password,
            schema: env.string_or("DATABASE_SCHEMA", "public"),
            params,
            ssl,
            pool: PoolSettings::full_from_env(env),
            force_ipv4: env.bool("DATABASE_FORCE_IPV4", true),
            log_details: env.bool("LOG_DB_CONNECTION_DETAILS", false),
            supabase,
            warnings,
        }
    }

    /// The `options` parameter, after explicit overrides.
    pub fn options(&self) -> Option<&str> {
        self.params.get("options").map(String::as_str).filter(|o| !o.is_empty())
    }
}
