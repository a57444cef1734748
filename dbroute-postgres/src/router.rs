//! Endpoint routing.
//!
//! Turns [`PostgresSettings`] into one [`ServerConnection`]:
//!
//! 1. derive the project reference
//! 2. build the static endpoint and the candidate list
//! 3. probe candidates in order (when enabled), else apply an explicit mode
//! 4. rewrite a pooler host to the direct host when the pooler is refused
//! 5. pin the final host to an IPv4 address (when enabled)
//!
//! Nothing here fails outward. Every problem becomes a warning in the
//! returned [`RoutingReport`] and resolution falls back to static values.

use std::time::Instant;

use dbroute_config::connection_url::render;
use dbroute_config::{
    CandidateMode, ConnectionMode, LookupStrategy, ProbeAttempt, RoutingReport, Selection,
    ServerConnection,
};
use tracing::{debug, info, warn};

use crate::candidate::{self, ConnectionCandidate, strip_pooler_params};
use crate::dns::{HostResolver, resolve_ipv4};
use crate::probe::{ProbeRequest, Prober};
use crate::project::{self, ProjectRef};
use crate::settings::PostgresSettings;

/// Route to a single PostgreSQL endpoint.
pub async fn route<P, R>(
    settings: &PostgresSettings,
    prober: &P,
    resolver: &R,
) -> (ServerConnection, RoutingReport)
where
    P: Prober + ?Sized,
    R: HostResolver + ?Sized,
{
    let supabase = &settings.supabase;
    let mut report = RoutingReport::new(supabase.mode);
    report.warnings.extend(settings.warnings.iter().cloned());

    let project = derive_project(settings);
    if let Some(ref project) = project {
        debug!(project_ref = %project.value, source = ?project.source, "Project reference derived");
        report.project_ref = Some(project.value.clone());
        report.project_ref_source = Some(project.source);
    }

    let candidates = candidate::plan(settings, project.as_ref());
    let mut server = match select(settings, &candidates, prober, resolver, &mut report).await {
        Some(chosen) => chosen,
        None => static_server(settings, project.as_ref()),
    };

    if correct_pooler(settings, project.as_ref(), &mut server) {
        report.pooler_corrected = true;
    }

    if settings.force_ipv4 && server.lookup == LookupStrategy::System {
        pin_ipv4(resolver, &mut server, &mut report).await;
    }

    (server, report)
}

/// Derive the project reference from settings.
///
/// Hostnames are tried static host first, then the URL host.
pub fn derive_project(settings: &PostgresSettings) -> Option<ProjectRef> {
    let mut hosts: Vec<&str> = vec![settings.host.as_str()];
    if let Some(url_host) = settings.url.as_ref().and_then(|u| u.host.as_deref()) {
        hosts.push(url_host);
    }
    project::derive(
        settings.supabase.project_ref.as_deref(),
        settings.options(),
        &hosts,
    )
}

/// The statically configured endpoint.
///
/// Derived `options=project=<ref>` is added when no explicit value exists,
/// unless the pooler has been explicitly refused.
pub fn static_server(settings: &PostgresSettings, project: Option<&ProjectRef>) -> ServerConnection {
    let mut params = settings.params.clone();
    if let Some(project) = project {
        let has_options = settings.options().is_some();
        if !has_options && settings.supabase.use_pooler != Some(false) {
            params.insert("options".to_string(), project.option_value());
        }
    }

    let mut server = ServerConnection {
        host: settings.host.clone(),
        port: settings.port,
        database: settings.database.clone(),
        user: settings.user.clone(),
        password: settings.password.clone(),
        schema: Some(settings.schema.clone()),
        ssl: settings.ssl.clone(),
        params,
        connection_string: None,
        lookup: LookupStrategy::System,
    };
    if let Some(url) = &settings.url {
        server.connection_string = Some(connection_string(&url.scheme, &server));
    }
    server
}

async fn select<P, R>(
    settings: &PostgresSettings,
    candidates: &[ConnectionCandidate],
    prober: &P,
    resolver: &R,
    report: &mut RoutingReport,
) -> Option<ServerConnection>
where
    P: Prober + ?Sized,
    R: HostResolver + ?Sized,
{
    let supabase = &settings.supabase;
    let mode = supabase.mode;

    if supabase.enable_probe && !candidates.is_empty() {
        for candidate in candidates {
            let mut server = candidate.to_server(&settings.schema, &settings.ssl);
            if settings.force_ipv4 {
                if let Ok(Some(addr)) = resolve_ipv4(resolver, &server.host).await {
                    server.lookup = LookupStrategy::Ipv4(addr);
                }
            }

            let request = ProbeRequest {
                mode: candidate.mode,
                server: &server,
                timeout: supabase.probe_timeout,
            };
            let started = Instant::now();
            let result = prober.probe(&request).await;
            let duration = started.elapsed();

            let success = result.is_ok();
            match &result {
                Ok(()) => info!(
                    mode = %candidate.mode,
                    host = %candidate.host,
                    port = candidate.port,
                    duration_ms = duration.as_millis() as u64,
                    "Connection candidate reachable"
                ),
                Err(failure) => warn!(
                    mode = %candidate.mode,
                    host = %candidate.host,
                    port = candidate.port,
                    kind = ?failure.kind,
                    error = %failure.message,
                    "Connection candidate failed"
                ),
            }

            report.attempts.push(ProbeAttempt {
                mode: candidate.mode,
                host: candidate.host.clone(),
                port: candidate.port,
                description: candidate.description.to_string(),
                success,
                duration,
                error: result.err(),
            });

            if success {
                report.selection = Selection::Candidate(candidate.mode);
                return Some(server);
            }
        }

        warn!(
            attempts = report.attempts.len(),
            "All connection candidates failed, using static configuration"
        );
        report.warn(format!(
            "all {} connection candidates failed; using static configuration",
            report.attempts.len()
        ));
        return None;
    }

    if supabase.enable_probe {
        debug!("Probing enabled but no candidates could be derived");
    }

    let explicit = match mode {
        ConnectionMode::Direct => Some(CandidateMode::Direct),
        ConnectionMode::Pooler => Some(CandidateMode::Pooler),
        ConnectionMode::Url => Some(CandidateMode::Url),
        ConnectionMode::Auto | ConnectionMode::Manual => None,
    }?;

    match candidates.iter().find(|c| c.mode == explicit) {
        Some(candidate) => {
            debug!(mode = %explicit, host = %candidate.host, "Using explicitly requested candidate");
            report.selection = Selection::Candidate(explicit);
            Some(candidate.to_server(&settings.schema, &settings.ssl))
        }
        None => {
            warn!(mode = %explicit, "Requested connection mode could not be derived, using static configuration");
            report.warn(format!(
                "connection mode '{}' could not be derived; using static configuration",
                explicit
            ));
            None
        }
    }
}

/// Rewrite a pooler endpoint to the direct host.
///
/// Applies only when the host is a pooler, `SUPABASE_USE_POOLER=false` and a
/// project reference is known. Returns whether a rewrite happened.
pub fn correct_pooler(
    settings: &PostgresSettings,
    project: Option<&ProjectRef>,
    server: &mut ServerConnection,
) -> bool {
    let supabase = &settings.supabase;
    let Some(project) = project else {
        return false;
    };
    if supabase.use_pooler != Some(false) || !project::is_pooler_host(&server.host) {
        return false;
    }

    let direct_host = supabase
        .direct_host
        .clone()
        .unwrap_or_else(|| project.direct_host());
    info!(
        from = %server.host,
        to = %direct_host,
        "Pooler disabled, switching to direct host"
    );

    server.host = direct_host;
    server.port = supabase.direct_port;
    server.lookup = LookupStrategy::System;
    strip_pooler_params(&mut server.params);
    if server.connection_string.is_some() {
        let scheme = settings.url.as_ref().map_or("postgresql", |u| u.scheme.as_str());
        server.connection_string = Some(connection_string(scheme, server));
    }
    true
}

async fn pin_ipv4<R: HostResolver + ?Sized>(
    resolver: &R,
    server: &mut ServerConnection,
    report: &mut RoutingReport,
) {
    match resolve_ipv4(resolver, &server.host).await {
        Ok(Some(addr)) => {
            debug!(host = %server.host, address = %addr, "Pinned host to IPv4 address");
            server.lookup = LookupStrategy::Ipv4(addr);
        }
        Ok(None) => {
            warn!(host = %server.host, "No IPv4 address found, using system resolution");
            report.warn(format!("no IPv4 address found for {}", server.host));
        }
        Err(e) => {
            warn!(host = %server.host, error = %e, "IPv4 lookup failed, using system resolution");
            report.warn(format!("IPv4 lookup for {} failed: {}", server.host, e));
        }
    }
}

fn connection_string(scheme: &str, server: &ServerConnection) -> String {
    render(
        scheme,
        Some(&server.user),
        server.password.as_deref(),
        Some(&server.host),
        Some(server.port),
        Some(&server.database),
        &server.params,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::StaticResolver;
    use async_trait::async_trait;
    use dbroute_config::{AttemptFailure, EnvReader, FailureKind, MapEnvSource, ProjectRefSource};
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    const REF: &str = "abc123def456ghi789jk";
    const DIRECT_URL: &str = "postgresql://u:p@db.abc123def456ghi789jk.supabase.co:5432/mydb";
    const POOLER_URL: &str =
        "postgresql://postgres.abc123def456ghi789jk:pw@aws-0-us-east-1.pooler.supabase.com:6543/postgres";

    /// Succeeds only for the listed modes and records every call.
    struct ScriptedProber {
        reachable: Vec<CandidateMode>,
        calls: Mutex<Vec<CandidateMode>>,
    }

    impl ScriptedProber {
        fn new(reachable: &[CandidateMode]) -> Self {
            Self {
                reachable: reachable.to_vec(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<CandidateMode> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, request: &ProbeRequest<'_>) -> Result<(), AttemptFailure> {
            self.calls.lock().unwrap().push(request.mode);
            if self.reachable.contains(&request.mode) {
                Ok(())
            } else {
                Err(AttemptFailure {
                    kind: FailureKind::Connect,
                    message: "connection refused".into(),
                    code: Some("ConnectionRefused".into()),
                })
            }
        }
    }

    fn settings(source: MapEnvSource) -> PostgresSettings {
        PostgresSettings::from_env(&EnvReader::new(&source.set("DATABASE_FORCE_IPV4", "false")))
    }

    async fn run(source: MapEnvSource, prober: &ScriptedProber) -> (ServerConnection, RoutingReport) {
        route(&settings(source), prober, &StaticResolver::new()).await
    }

    #[tokio::test]
    async fn test_static_with_derived_options() {
        let prober = ScriptedProber::new(&[]);
        let (server, report) = run(MapEnvSource::new().set("DATABASE_URL", DIRECT_URL), &prober).await;

        assert_eq!(server.host, "db.abc123def456ghi789jk.supabase.co");
        assert_eq!(server.options(), Some("project=abc123def456ghi789jk"));
        assert_eq!(report.selection, Selection::Static);
        assert_eq!(report.project_ref.as_deref(), Some(REF));
        assert_eq!(report.project_ref_source, Some(ProjectRefSource::Hostname));
        assert!(prober.calls().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_options_win() {
        let prober = ScriptedProber::new(&[]);
        let (server, report) = run(
            MapEnvSource::new()
                .set("DATABASE_URL", DIRECT_URL)
                .set("DATABASE_OPTIONS", "project=mine"),
            &prober,
        )
        .await;

        assert_eq!(server.options(), Some("project=mine"));
        assert_eq!(report.project_ref.as_deref(), Some("mine"));
        assert_eq!(report.project_ref_source, Some(ProjectRefSource::Options));
    }

    #[tokio::test]
    async fn test_probe_short_circuits() {
        let prober = ScriptedProber::new(&[CandidateMode::Pooler]);
        let (server, report) = run(
            MapEnvSource::new()
                .set("DATABASE_URL", POOLER_URL)
                .set("SUPABASE_PROJECT_REF", REF)
                .set("SUPABASE_ENABLE_PROBE", "true"),
            &prober,
        )
        .await;

        assert_eq!(prober.calls(), vec![CandidateMode::Direct, CandidateMode::Pooler]);
        assert_eq!(report.attempts.len(), 2);
        assert!(!report.attempts[0].success);
        assert_eq!(report.attempts[0].error.as_ref().unwrap().kind, FailureKind::Connect);
        assert!(report.attempts[1].success);
        assert_eq!(report.selection, Selection::Candidate(CandidateMode::Pooler));
        assert_eq!(server.host, "aws-0-us-east-1.pooler.supabase.com");
        assert_eq!(server.port, 6543);
        assert_eq!(server.options(), Some("project=abc123def456ghi789jk"));
    }

    #[tokio::test]
    async fn test_probe_exhaustion_falls_back() {
        let prober = ScriptedProber::new(&[]);
        let (server, report) = run(
            MapEnvSource::new()
                .set("DATABASE_URL", POOLER_URL)
                .set("SUPABASE_PROJECT_REF", REF)
                .set("SUPABASE_ENABLE_PROBE", "true"),
            &prober,
        )
        .await;

        assert_eq!(report.attempts.len(), 3);
        assert_eq!(report.selection, Selection::Static);
        assert_eq!(server.host, "aws-0-us-east-1.pooler.supabase.com");
        assert_eq!(server.port, 6543);
        assert!(report.warnings.iter().any(|w| w.contains("all 3")));
    }

    #[tokio::test]
    async fn test_explicit_mode_without_probe() {
        let prober = ScriptedProber::new(&[]);
        let (server, report) = run(
            MapEnvSource::new()
                .set("DATABASE_URL", POOLER_URL)
                .set("SUPABASE_PROJECT_REF", REF)
                .set("SUPABASE_CONNECTION_MODE", "direct"),
            &prober,
        )
        .await;

        assert!(prober.calls().is_empty());
        assert_eq!(report.selection, Selection::Candidate(CandidateMode::Direct));
        assert_eq!(server.host, "db.abc123def456ghi789jk.supabase.co");
        assert_eq!(server.port, 5432);
        assert_eq!(server.options(), None);
    }

    #[tokio::test]
    async fn test_manual_mode_ignores_probe() {
        let prober = ScriptedProber::new(&[CandidateMode::Direct]);
        let (server, report) = run(
            MapEnvSource::new()
                .set("DATABASE_URL", POOLER_URL)
                .set("SUPABASE_CONNECTION_MODE", "manual")
                .set("SUPABASE_ENABLE_PROBE", "true"),
            &prober,
        )
        .await;

        assert!(prober.calls().is_empty());
        assert_eq!(report.selection, Selection::Static);
        assert_eq!(server.host, "aws-0-us-east-1.pooler.supabase.com");
    }

    #[tokio::test]
    async fn test_pooler_correction_is_a_fixed_point() {
        let prober = ScriptedProber::new(&[]);
        let (server, report) = run(
            MapEnvSource::new()
                .set("DATABASE_URL", POOLER_URL)
                .set("SUPABASE_PROJECT_REF", REF)
                .set("SUPABASE_USE_POOLER", "false"),
            &prober,
        )
        .await;

        assert!(report.pooler_corrected);
        assert_eq!(server.host, "db.abc123def456ghi789jk.supabase.co");
        assert_eq!(server.port, 5432);
        assert_eq!(server.options(), None);
        let corrected_url = server.connection_string.clone().unwrap();
        assert!(corrected_url.contains("@db.abc123def456ghi789jk.supabase.co:5432/"));

        let (again, report) = run(
            MapEnvSource::new()
                .set("DATABASE_URL", corrected_url)
                .set("SUPABASE_USE_POOLER", "false"),
            &prober,
        )
        .await;
        assert!(!report.pooler_corrected);
        assert_eq!(again.host, server.host);
        assert_eq!(again.port, server.port);
        assert_eq!(again.params, server.params);
        assert_eq!(again.connection_string, server.connection_string);
    }

    #[tokio::test]
    async fn test_ipv4_pinning() {
        let source = MapEnvSource::new().set("DATABASE_URL", DIRECT_URL);
        let settings = PostgresSettings::from_env(&EnvReader::new(&source));
        let resolver = StaticResolver::new().with(
            "db.abc123def456ghi789jk.supabase.co",
            Ipv4Addr::new(198, 51, 100, 7),
        );

        let (server, report) = route(&settings, &ScriptedProber::new(&[]), &resolver).await;
        assert_eq!(server.lookup, LookupStrategy::Ipv4(Ipv4Addr::new(198, 51, 100, 7)));
        assert!(report.warnings.is_empty());

        let (server, report) = route(&settings, &ScriptedProber::new(&[]), &StaticResolver::new()).await;
        assert_eq!(server.lookup, LookupStrategy::System);
        assert_eq!(server.host, "db.abc123def456ghi789jk.supabase.co");
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_probe_reuses_resolved_address() {
        let source = MapEnvSource::new()
            .set("DATABASE_URL", DIRECT_URL)
            .set("SUPABASE_ENABLE_PROBE", "true");
        let settings = PostgresSettings::from_env(&EnvReader::new(&source));
        let resolver = StaticResolver::new().with(
            "db.abc123def456ghi789jk.supabase.co",
            Ipv4Addr::new(198, 51, 100, 9),
        );

        let prober = ScriptedProber::new(&[CandidateMode::Direct]);
        let (server, report) = route(&settings, &prober, &resolver).await;
        assert_eq!(report.selection, Selection::Candidate(CandidateMode::Direct));
        assert_eq!(server.lookup, LookupStrategy::Ipv4(Ipv4Addr::new(198, 51, 100, 9)));
    }
}
