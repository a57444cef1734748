//! IPv4 host resolution.
//!
//! Forcing IPv4 is expressed as an address handed to the driver
//! (`hostaddr`), never as a process-wide resolver preference.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{PgError, PgResult};

/// Resolves host names to IPv4 addresses.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// First IPv4 address of `host`, or `None` when it has none.
    async fn lookup_ipv4(&self, host: &str) -> PgResult<Option<Ipv4Addr>>;
}

/// Resolver backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup_ipv4(&self, host: &str) -> PgResult<Option<Ipv4Addr>> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| PgError::dns(format!("failed to resolve {}: {}", host, e)))?;

        let found = addrs.into_iter().find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        });
        debug!(host, address = ?found, "IPv4 lookup finished");
        Ok(found)
    }
}

/// Resolver answering from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    table: HashMap<String, Ipv4Addr>,
}

impl StaticResolver {
    /// Create an empty table; every lookup yields no address.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn with(mut self, host: impl Into<String>, addr: Ipv4Addr) -> Self {
        self.table.insert(host.into().to_lowercase(), addr);
        self
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn lookup_ipv4(&self, host: &str) -> PgResult<Option<Ipv4Addr>> {
        Ok(self.table.get(&host.to_lowercase()).copied())
    }
}

/// Resolve `host` to an IPv4 address.
///
/// Literal addresses are answered without a lookup: an IPv4 literal is
/// returned as is, an IPv6 literal has no IPv4 form.
pub async fn resolve_ipv4<R: HostResolver + ?Sized>(resolver: &R, host: &str) -> PgResult<Option<Ipv4Addr>> {
    match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ok(Some(v4)),
        Ok(IpAddr::V6(_)) => Ok(None),
        Err(_) => resolver.lookup_ipv4(host).await,
    }
}
