//! Routing modes and resolution diagnostics.

use std::time::Duration;

use serde::Serialize;

/// Requested topology, from `SUPABASE_CONNECTION_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Try direct, then pooler, then the raw URL.
    #[default]
    Auto,
    /// Use the static configuration only; never build candidates.
    Manual,
    /// Direct host only.
    Direct,
    /// Pooler host only.
    Pooler,
    /// Raw `DATABASE_URL` only.
    Url,
}

impl ConnectionMode {
    /// Parse a mode. `any` and `both` are aliases of `auto`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" | "any" | "both" => Some(Self::Auto),
            "manual" => Some(Self::Manual),
            "direct" => Some(Self::Direct),
            "pooler" => Some(Self::Pooler),
            "url" => Some(Self::Url),
            _ => None,
        }
    }

    /// Candidate kinds to build, in attempt order.
    ///
    /// The custom IPv4 candidate is appended separately whenever it is
    /// configured.
    pub fn attempt_order(&self) -> &'static [CandidateMode] {
        match self {
            Self::Auto => &[CandidateMode::Direct, CandidateMode::Pooler, CandidateMode::Url],
            Self::Direct => &[CandidateMode::Direct],
            Self::Pooler => &[CandidateMode::Pooler],
            Self::Url => &[CandidateMode::Url],
            Self::Manual => &[],
        }
    }

    /// Get the mode name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Direct => "direct",
            Self::Pooler => "pooler",
            Self::Url => "url",
        }
    }
}

/// Kind of connection candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateMode {
    /// The provider's direct database host.
    Direct,
    /// The provider's connection pooler.
    Pooler,
    /// `DATABASE_URL` as given.
    Url,
    /// A user-supplied IPv4-reachable host.
    CustomIpv4,
}

impl CandidateMode {
    /// Get the mode name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Pooler => "pooler",
            Self::Url => "url",
            Self::CustomIpv4 => "custom-ipv4",
        }
    }
}

impl std::fmt::Display for CandidateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where the winning endpoint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "mode", rename_all = "lowercase")]
pub enum Selection {
    /// Statically configured host/port (no candidate won).
    Static,
    /// A candidate, chosen by probe or by explicit mode.
    Candidate(CandidateMode),
}

/// Where the project reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRefSource {
    /// `SUPABASE_PROJECT_REF` or `DATABASE_PROJECT`.
    Explicit,
    /// An `options=project=<ref>` parameter.
    Options,
    /// Pattern-matched from a hostname.
    Hostname,
}

/// Broad class of a probe failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The attempt exceeded the probe timeout.
    Timeout,
    /// Name resolution failed.
    Dns,
    /// TCP connect failed.
    Connect,
    /// TLS setup or handshake failed.
    Tls,
    /// The server rejected the credentials or database.
    Auth,
    /// Anything else reported by the driver.
    Other,
}

/// Failure details of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    /// Failure class.
    pub kind: FailureKind,
    /// Human-readable message.
    pub message: String,
    /// SQLSTATE or OS error code, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// One probe attempt against a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeAttempt {
    /// Candidate kind.
    pub mode: CandidateMode,
    /// Candidate host.
    pub host: String,
    /// Candidate port.
    pub port: u16,
    /// Candidate description.
    pub description: String,
    /// Whether the handshake completed.
    pub success: bool,
    /// Wall time spent on the attempt.
    #[serde(rename = "duration_ms", serialize_with = "crate::pool::millis::duration")]
    pub duration: Duration,
    /// Failure details, when unsuccessful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AttemptFailure>,
}

/// How a PostgreSQL endpoint was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingReport {
    /// Requested topology.
    pub mode: ConnectionMode,
    /// Winning endpoint.
    pub selection: Selection,
    /// Project reference in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_ref: Option<String>,
    /// Source of the project reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_ref_source: Option<ProjectRefSource>,
    /// Whether a pooler host was rewritten to the direct host.
    pub pooler_corrected: bool,
    /// Probe attempts, in order.
    pub attempts: Vec<ProbeAttempt>,
    /// Non-fatal problems met during resolution.
    pub warnings: Vec<String>,
}

impl RoutingReport {
    /// Create an empty report for a mode.
    pub fn new(mode: ConnectionMode) -> Self {
        Self {
            mode,
            selection: Selection::Static,
            project_ref: None,
            project_ref_source: None,
            pooler_corrected: false,
            attempts: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// The successful attempt, if any.
    pub fn winning_attempt(&self) -> Option<&ProbeAttempt> {
        self.attempts.iter().find(|a| a.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_aliases() {
        assert_eq!(ConnectionMode::parse("both"), Some(ConnectionMode::Auto));
        assert_eq!(ConnectionMode::parse("ANY"), Some(ConnectionMode::Auto));
        assert_eq!(ConnectionMode::parse("manual"), Some(ConnectionMode::Manual));
        assert_eq!(ConnectionMode::parse("sideways"), None);
    }

    #[test]
    fn test_attempt_order() {
        assert_eq!(
            ConnectionMode::Auto.attempt_order(),
            &[CandidateMode::Direct, CandidateMode::Pooler, CandidateMode::Url]
        );
        assert_eq!(ConnectionMode::Pooler.attempt_order(), &[CandidateMode::Pooler]);
        assert!(ConnectionMode::Manual.attempt_order().is_empty());
    }

    #[test]
    fn test_selection_serialization() {
        let json = serde_json::to_string(&Selection::Candidate(CandidateMode::CustomIpv4)).unwrap();
        assert_eq!(json, r#"{"kind":"candidate","mode":"custom-ipv4"}"#);
        let json = serde_json::to_string(&Selection::Static).unwrap();
        assert_eq!(json, r#"{"kind":"static"}"#);
    }
}
