//! Logging bootstrap for dbroute.
//!
//! Library code logs through `tracing` macros. This module installs a
//! subscriber for applications that don't bring their own; it does nothing
//! unless the `tracing-subscriber` feature is enabled.
//!
//! # Environment Variables
//!
//! - `DBROUTE_DEBUG=true|1|yes` - Enable debug logging
//! - `DBROUTE_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `DBROUTE_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//! - `LOG_DB_CONNECTION_DETAILS=true` - Log at `info` when nothing else is set,
//!   so the resolved connection summary is shown
//!
//! # Usage
//!
//! ```rust,no_run
//! use dbroute::logging;
//!
//! // Call once at startup.
//! logging::init();
//!
//! // Or pick the level explicitly.
//! logging::init_with_level("debug");
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Whether `DBROUTE_DEBUG` asks for debug logging.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("DBROUTE_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Normalize a level name. Unknown names yield `None`.
pub fn parse_level(level: &str) -> Option<&'static str> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// The level from `DBROUTE_LOG_LEVEL`.
///
/// Defaults to `debug` when `DBROUTE_DEBUG` is on, otherwise `warn`.
pub fn get_log_level() -> &'static str {
    env::var("DBROUTE_LOG_LEVEL")
        .ok()
        .and_then(|l| parse_level(&l))
        .unwrap_or(if is_debug_enabled() { "debug" } else { "warn" })
}

/// The format from `DBROUTE_LOG_FORMAT`. Defaults to `json`.
pub fn get_log_format() -> &'static str {
    env::var("DBROUTE_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize logging from the environment.
///
/// Does nothing unless `DBROUTE_DEBUG`, `DBROUTE_LOG_LEVEL` or
/// `LOG_DB_CONNECTION_DETAILS` is set. Subsequent calls are no-ops.
pub fn init() {
    let level_var = env::var("DBROUTE_LOG_LEVEL").ok();
    if let Some(level) = startup_level(
        is_debug_enabled(),
        level_var.as_deref(),
        connection_details_enabled(),
    ) {
        install(level);
    }
}

/// Whether `LOG_DB_CONNECTION_DETAILS` asks for the connection summary.
pub fn connection_details_enabled() -> bool {
    env::var("LOG_DB_CONNECTION_DETAILS")
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(false)
}

/// The level `init` installs, or `None` to leave logging off.
fn startup_level(debug: bool, level: Option<&str>, details: bool) -> Option<&'static str> {
    if let Some(level) = level.and_then(parse_level) {
        return Some(level);
    }
    if debug {
        Some("debug")
    } else if details {
        Some("info")
    } else if level.is_some() {
        Some("warn")
    } else {
        None
    }
}

/// Initialize logging at a given level, ignoring `DBROUTE_LOG_LEVEL`.
///
/// Unknown level names fall back to `warn`.
pub fn init_with_level(level: &str) {
    install(parse_level(level).unwrap_or("warn"));
}

/// Initialize debug logging.
pub fn init_debug() {
    install("debug");
}

fn install(level: &'static str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!(
                "dbroute={level},dbroute_config={level},dbroute_postgres={level},dbroute_cli={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let writer = std::io::stderr;
            let result = match get_log_format() {
                "json" => registry.with(fmt::layer().json().with_writer(writer)).try_init(),
                "compact" => registry.with(fmt::layer().compact().with_writer(writer)).try_init(),
                _ => registry.with(fmt::layer().pretty().with_writer(writer)).try_init(),
            };

            if result.is_ok() {
                tracing::debug!(level, format = get_log_format(), "dbroute logging initialized");
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        {
            let _ = level;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some("debug"));
        assert_eq!(parse_level(" warning "), Some("warn"));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_with_level("error");
        init_with_level("trace");
        init();
    }

    #[test]
    fn test_startup_level() {
        assert_eq!(startup_level(false, None, false), None);
        assert_eq!(startup_level(false, None, true), Some("info"));
        assert_eq!(startup_level(true, None, true), Some("debug"));
        assert_eq!(startup_level(false, Some("error"), true), Some("error"));
        assert_eq!(startup_level(false, Some("loud"), false), Some("warn"));
        assert_eq!(startup_level(false, Some("loud"), true), Some("info"));
    }
}
