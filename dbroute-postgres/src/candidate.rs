//! Connection candidates.
//!
//! A candidate is one fully specified endpoint considered during routing.
//! Candidates are built fresh for every resolution and never persisted.

use std::collections::HashSet;

use dbroute_config::connection_url::render;
use dbroute_config::{CandidateMode, LookupStrategy, QueryParams, ServerConnection, SslPolicy};
use tracing::debug;

use crate::project::ProjectRef;
use crate::settings::{DEFAULT_DIRECT_PORT, DEFAULT_POOLER_PORT, PostgresSettings};

/// Parameters only the pooler understands.
pub const POOLER_ONLY_PARAMS: &[&str] = &["options", "pgbouncer", "connection_limit"];

/// One endpoint to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCandidate {
    /// Candidate kind.
    pub mode: CandidateMode,
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
    /// Query parameters.
    pub params: QueryParams,
    /// Human-readable description.
    pub description: &'static str,
}

impl ConnectionCandidate {
    /// Deduplication key.
    pub fn key(&self) -> (CandidateMode, String, u16) {
        (self.mode, self.host.to_lowercase(), self.port)
    }

    /// Get a query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Render as a `postgresql://` connection string.
    pub fn connection_string(&self) -> String {
        render(
            "postgresql",
            Some(&self.user),
            self.password.as_deref(),
            Some(&self.host),
            Some(self.port),
            Some(&self.database),
            &self.params,
        )
    }

    /// Turn into a server connection carrying the shared schema and SSL policy.
    pub fn to_server(&self, schema: &str, ssl: &SslPolicy) -> ServerConnection {
        ServerConnection {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            schema: Some(schema.to_string()),
            ssl: ssl.clone(),
            params: self.params.clone(),
            connection_string: Some(self.connection_string()),
            lookup: LookupStrategy::System,
        }
    }
}

/// Remove pooler-only parameters.
pub fn strip_pooler_params(params: &mut QueryParams) {
    for key in POOLER_ONLY_PARAMS {
        params.shift_remove(*key);
    }
}

/// Build the ordered, deduplicated candidate list for the configured mode.
///
/// The custom IPv4 candidate is appended last whenever it is configured,
/// except in manual mode.
pub fn plan(settings: &PostgresSettings, project: Option<&ProjectRef>) -> Vec<ConnectionCandidate> {
    let mode = settings.supabase.mode;
    let mut kinds: Vec<CandidateMode> = mode.attempt_order().to_vec();
    if !kinds.is_empty() && settings.supabase.ipv4_host.is_some() {
        kinds.push(CandidateMode::CustomIpv4);
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for kind in kinds {
        let Some(candidate) = build(kind, settings, project) else {
            debug!(mode = %kind, "Candidate not derivable");
            continue;
        };
        if seen.insert(candidate.key()) {
            candidates.push(candidate);
        }
    }

    debug!(mode = mode.name(), count = candidates.len(), "Planned connection candidates");
    candidates
}

/// Build one candidate, if the settings allow it.
pub fn build(
    kind: CandidateMode,
    settings: &PostgresSettings,
    project: Option<&ProjectRef>,
) -> Option<ConnectionCandidate> {
    let supabase = &settings.supabase;
    let mut params = base_params(settings);

    let (host, port, description) = match kind {
        CandidateMode::Direct => {
            let host = supabase
                .direct_host
                .clone()
                .or_else(|| project.map(ProjectRef::direct_host))?;
            strip_pooler_params(&mut params);
            (host, supabase.direct_port, "Supabase direct database host")
        }
        CandidateMode::Pooler => {
            let url = settings.url.as_ref();
            let host = supabase
                .pooler_host
                .clone()
                .or_else(|| url.and_then(|u| u.host.clone()))?;
            let port = supabase
                .pooler_port
                .or_else(|| url.and_then(|u| u.port))
                .unwrap_or(DEFAULT_POOLER_PORT);
            if let Some(project) = project {
                if params.get("options").is_none_or(|o| o.is_empty()) {
                    params.insert("options".to_string(), project.option_value());
                }
            }
            (host, port, "Supabase pooled host derived from DATABASE_URL")
        }
        CandidateMode::Url => {
            let url = settings.url.as_ref()?;
            let host = url.host.clone()?;
            return Some(ConnectionCandidate {
                mode: kind,
                host,
                port: url.port.unwrap_or(DEFAULT_DIRECT_PORT),
                database: url.database.clone().unwrap_or_else(|| settings.database.clone()),
                user: url.user.clone().unwrap_or_else(|| settings.user.clone()),
                password: url.password.clone().or_else(|| settings.password.clone()),
                params,
                description: "Original DATABASE_URL",
            });
        }
        CandidateMode::CustomIpv4 => {
            let host = supabase.ipv4_host.clone()?;
            params.shift_remove("options");
            (host, supabase.ipv4_port, "Custom IPv4 host provided via SUPABASE_IPV4_HOST")
        }
    };

    Some(ConnectionCandidate {
        mode: kind,
        host,
        port,
        database: settings.database.clone(),
        user: settings.user.clone(),
        password: settings.password.clone(),
        params,
        description,
    })
}

/// Static parameters with `sslmode=require` applied when absent.
fn base_params(settings: &PostgresSettings) -> QueryParams {
    let mut params = settings.params.clone();
    if params.get("sslmode").is_none_or(|v| v.is_empty()) {
        params.insert("sslmode".to_string(), "require".to_string());
    }
    params
}
