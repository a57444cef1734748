//! Project reference derivation.
//!
//! The managed provider encodes a tenant "project reference" in hostnames
//! (`db.<ref>.supabase.co`, `<ref>.<sub>.supabase.com`) and expects it in an
//! `options=project=<ref>` parameter when connecting through its pooler.

use std::sync::LazyLock;

use dbroute_config::ProjectRefSource;
use regex_lite::Regex;

static OPTIONS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)project\s*=\s*([a-z0-9-]+)").ok());

static DIRECT_HOST_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^db\.([^.]+)\.supabase\.(?:co|com|net)$").ok());

static SUBDOMAIN_HOST_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]{20,})\.(?:[a-z0-9-]+\.)*supabase\.(?:co|com|net)$").ok()
});

/// Domain fragment identifying pooler hosts.
pub const POOLER_DOMAIN_FRAGMENT: &str = "pooler.supabase";

/// A project reference and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    /// The reference.
    pub value: String,
    /// Where it came from.
    pub source: ProjectRefSource,
}

impl ProjectRef {
    /// The `options` value routing to this project.
    pub fn option_value(&self) -> String {
        project_option(&self.value)
    }

    /// The direct host of this project.
    pub fn direct_host(&self) -> String {
        direct_host_for(&self.value)
    }
}

/// Extract the reference from an `options` parameter value.
pub fn from_options(options: &str) -> Option<String> {
    let re = OPTIONS_RE.as_ref()?;
    re.captures(options)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the reference from a provider hostname.
///
/// ```rust
/// use dbroute_postgres::project::from_hostname;
///
/// assert_eq!(from_hostname("db.abc123.supabase.co").as_deref(), Some("abc123"));
/// assert_eq!(
///     from_hostname("abcdefghij0123456789.pooler.supabase.com").as_deref(),
///     Some("abcdefghij0123456789")
/// );
/// assert_eq!(from_hostname("aws-0-eu-west-1.pooler.supabase.com"), None);
/// ```
pub fn from_hostname(host: &str) -> Option<String> {
    let host = host.trim().to_lowercase();
    [&DIRECT_HOST_RE, &SUBDOMAIN_HOST_RE]
        .into_iter()
        .filter_map(|re| re.as_ref())
        .find_map(|re| re.captures(&host)?.get(1).map(|m| m.as_str().to_string()))
}

/// Derive the project reference.
///
/// Precedence is the explicit value, then the `options` parameter, then the
/// first hostname that matches a provider pattern.
pub fn derive(explicit: Option<&str>, options: Option<&str>, hosts: &[&str]) -> Option<ProjectRef> {
    if let Some(value) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(ProjectRef {
            value: value.to_string(),
            source: ProjectRefSource::Explicit,
        });
    }

    if let Some(value) = options.and_then(from_options) {
        return Some(ProjectRef {
            value,
            source: ProjectRefSource::Options,
        });
    }

    hosts.iter().find_map(|host| from_hostname(host)).map(|value| ProjectRef {
        value,
        source: ProjectRefSource::Hostname,
    })
}

/// Whether a host is one of the provider's poolers.
pub fn is_pooler_host(host: &str) -> bool {
    host.to_lowercase().contains(POOLER_DOMAIN_FRAGMENT)
}

/// Direct host name for a project.
pub fn direct_host_for(project_ref: &str) -> String {
    format!("db.{}.supabase.co", project_ref)
}

/// `options` value routing to a project.
pub fn project_option(project_ref: &str) -> String {
    format!("project={}", project_ref)
}
