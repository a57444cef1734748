//! Connection pool settings.
//!
//! These are passed through to the driver's pool verbatim; nothing here is
//! computed from the resolved endpoint.

use std::time::Duration;

use serde::Serialize;

use crate::env::{EnvReader, EnvSource};

/// Pool limits and timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSettings {
    /// Minimum number of connections to keep open.
    pub min: u32,
    /// Maximum number of connections.
    pub max: u32,
    /// Time to wait for a connection from the pool.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "millis::serialize")]
    pub acquire_timeout: Option<Duration>,
    /// Time allowed to create a connection.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "millis::serialize")]
    pub create_timeout: Option<Duration>,
    /// Time allowed to destroy a connection.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "millis::serialize")]
    pub destroy_timeout: Option<Duration>,
    /// Idle time before a connection is reaped.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "millis::serialize")]
    pub idle_timeout: Option<Duration>,
    /// Interval between reap passes.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "millis::serialize")]
    pub reap_interval: Option<Duration>,
    /// Delay between connection creation retries.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "millis::serialize")]
    pub create_retry_interval: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min: 2,
            max: 10,
            acquire_timeout: None,
            create_timeout: None,
            destroy_timeout: None,
            idle_timeout: None,
            reap_interval: None,
            create_retry_interval: None,
        }
    }
}

impl PoolSettings {
    /// Only the size limits, read from `DATABASE_POOL_MIN`/`MAX`.
    pub fn limits_from_env<S: EnvSource + ?Sized>(env: &EnvReader<'_, S>) -> Self {
        let defaults = Self::default();
        Self {
            min: env.int("DATABASE_POOL_MIN", defaults.min),
            max: env.int("DATABASE_POOL_MAX", defaults.max),
            ..defaults
        }
    }

    /// Limits plus every timeout, as used for PostgreSQL.
    pub fn full_from_env<S: EnvSource + ?Sized>(env: &EnvReader<'_, S>) -> Self {
        Self {
            acquire_timeout: Some(env.millis("DATABASE_ACQUIRE_TIMEOUT", 60_000)),
            create_timeout: Some(env.millis("DATABASE_CREATE_TIMEOUT", 30_000)),
            destroy_timeout: Some(env.millis("DATABASE_DESTROY_TIMEOUT", 5_000)),
            idle_timeout: Some(env.millis("DATABASE_IDLE_TIMEOUT", 30_000)),
            reap_interval: Some(env.millis("DATABASE_REAP_INTERVAL", 1_000)),
            create_retry_interval: Some(env.millis("DATABASE_CREATE_RETRY_INTERVAL", 100)),
            ..Self::limits_from_env(env)
        }
    }
}

/// Serialize durations as whole milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_u64(d.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn duration<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvSource;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_defaults() {
        let source = MapEnvSource::new();
        let pool = PoolSettings::full_from_env(&EnvReader::new(&source));

        assert_eq!(pool.min, 2);
        assert_eq!(pool.max, 10);
        assert_eq!(pool.acquire_timeout, Some(Duration::from_secs(60)));
        assert_eq!(pool.create_timeout, Some(Duration::from_secs(30)));
        assert_eq!(pool.destroy_timeout, Some(Duration::from_secs(5)));
        assert_eq!(pool.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(pool.reap_interval, Some(Duration::from_secs(1)));
        assert_eq!(pool.create_retry_interval, Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_overrides() {
        let source = MapEnvSource::new()
            .set("DATABASE_POOL_MIN", "0")
            .set("DATABASE_POOL_MAX", "25")
            .set("DATABASE_IDLE_TIMEOUT", "1500");
        let pool = PoolSettings::full_from_env(&EnvReader::new(&source));

        assert_eq!(pool.min, 0);
        assert_eq!(pool.max, 25);
        assert_eq!(pool.idle_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_limits_only() {
        let source = MapEnvSource::new().set("DATABASE_POOL_MAX", "4");
        let pool = PoolSettings::limits_from_env(&EnvReader::new(&source));

        assert_eq!(pool.max, 4);
        assert_eq!(pool.acquire_timeout, None);
    }

    #[test]
    fn test_serializes_millis() {
        let source = MapEnvSource::new();
        let pool = PoolSettings::full_from_env(&EnvReader::new(&source));
        let json = serde_json::to_value(&pool).unwrap();

        assert_eq!(json["acquire_timeout"], 60_000);
        assert_eq!(json["create_retry_interval"], 100);
    }
}
