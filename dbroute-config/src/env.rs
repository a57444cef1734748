//! Environment variable sources and typed coercion.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ConfigResult;

/// Source for environment variables.
pub trait EnvSource: Send + Sync {
    /// Get an environment variable value.
    fn get(&self, name: &str) -> Option<String>;

    /// Check if a variable exists.
    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Default environment source using std::env.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Environment source backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapEnvSource {
    vars: HashMap<String, String>,
}

impl MapEnvSource {
    /// Create a new map-based environment source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Add a variable.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Add multiple variables.
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars.extend(vars);
        self
    }

    /// Insert or replace a variable in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Remove a variable.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    /// Layer a dotenv file underneath the current values.
    ///
    /// Variables already present win over the file, matching how a process
    /// environment shadows a `.env` file.
    pub fn merge_env_file(mut self, path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let mut loaded = 0usize;
        for item in dotenvy::from_path_iter(path)? {
            let (name, value) = item?;
            if !self.vars.contains_key(&name) {
                self.vars.insert(name, value);
                loaded += 1;
            }
        }
        debug!(path = %path.display(), loaded, "Merged environment file");
        Ok(self)
    }

    /// Number of variables held.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the source holds no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl EnvSource for MapEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<S: EnvSource + ?Sized> EnvSource for &S {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
}

/// Parse a boolean flag the way deployment dashboards write them.
///
/// Returns `None` for anything outside `1/true/yes/on` and `0/false/no/off`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Typed reader over an [`EnvSource`].
///
/// Every accessor takes an explicit default. Values that are empty or fail
/// to coerce fall back to it, so reading never fails.
#[derive(Debug, Clone, Copy)]
pub struct EnvReader<'a, S: EnvSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: EnvSource + ?Sized> EnvReader<'a, S> {
    /// Create a reader over a source.
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Trimmed, non-empty string value.
    pub fn string(&self, name: &str) -> Option<String> {
        self.source
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Raw value, untrimmed. Empty values are still treated as absent.
    pub fn raw(&self, name: &str) -> Option<String> {
        self.source.get(name).filter(|v| !v.is_empty())
    }

    /// String value with a default.
    pub fn string_or(&self, name: &str, default: &str) -> String {
        self.string(name).unwrap_or_else(|| default.to_string())
    }

    /// First present value among several names.
    pub fn first_of(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.string(name))
    }

    /// Optional boolean; unrecognized values count as absent.
    pub fn bool_opt(&self, name: &str) -> Option<bool> {
        let value = self.string(name)?;
        let parsed = parse_bool(&value);
        if parsed.is_none() {
            warn!(name, value = %value, "Ignoring unrecognized boolean value");
        }
        parsed
    }

    /// Boolean with a default.
    pub fn bool(&self, name: &str, default: bool) -> bool {
        self.bool_opt(name).unwrap_or(default)
    }

    /// Optional integer; unparsable values count as absent.
    pub fn int_opt<T: FromStr>(&self, name: &str) -> Option<T> {
        let value = self.string(name)?;
        match value.parse::<T>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(name, value = %value, "Ignoring unparsable integer value");
                None
            }
        }
    }

    /// Integer with a default.
    pub fn int<T: FromStr>(&self, name: &str, default: T) -> T {
        self.int_opt(name).unwrap_or(default)
    }

    /// Millisecond duration with a default.
    pub fn millis(&self, name: &str, default_ms: u64) -> Duration {
        Duration::from_millis(self.int(name, default_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_source() -> MapEnvSource {
        MapEnvSource::new()
            .set("HOST", "  db.internal  ")
            .set("PORT", "6543")
            .set("BAD_PORT", "sixty")
            .set("EMPTY", "")
            .set("FLAG_ON", "Yes")
            .set("FLAG_OFF", "off")
            .set("FLAG_ODD", "maybe")
    }

    #[test]
    fn test_parse_bool() {
        for v in ["1", "true", "TRUE", "yes", "on", " On "] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "false", "No", "off"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("enabled"), None);
    }

    #[test]
    fn test_string_trims_and_drops_empty() {
        let source = test_source();
        let env = EnvReader::new(&source);

        assert_eq!(env.string("HOST").as_deref(), Some("db.internal"));
        assert_eq!(env.string("EMPTY"), None);
        assert_eq!(env.string("MISSING"), None);
        assert_eq!(env.string_or("EMPTY", "fallback"), "fallback");
    }

    #[test]
    fn test_bool_with_default() {
        let source = test_source();
        let env = EnvReader::new(&source);

        assert!(env.bool("FLAG_ON", false));
        assert!(!env.bool("FLAG_OFF", true));
        assert!(env.bool("FLAG_ODD", true));
        assert!(!env.bool("MISSING", false));
        assert_eq!(env.bool_opt("FLAG_ODD"), None);
    }

    #[test]
    fn test_int_with_default() {
        let source = test_source();
        let env = EnvReader::new(&source);

        assert_eq!(env.int("PORT", 5432u16), 6543);
        assert_eq!(env.int("BAD_PORT", 5432u16), 5432);
        assert_eq!(env.int("MISSING", 10u32), 10);
        assert_eq!(env.millis("PORT", 1), Duration::from_millis(6543));
    }

    #[test]
    fn test_first_of() {
        let source = MapEnvSource::new().set("DATABASE_PROJECT", "second");
        let env = EnvReader::new(&source);

        assert_eq!(
            env.first_of(&["SUPABASE_PROJECT_REF", "DATABASE_PROJECT"])
                .as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_merge_env_file_keeps_existing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "DATABASE_CLIENT=postgres\nDATABASE_HOST=from-file\n").unwrap();

        let source = MapEnvSource::new()
            .set("DATABASE_HOST", "from-process")
            .merge_env_file(&path)
            .unwrap();

        assert_eq!(source.get("DATABASE_CLIENT").as_deref(), Some("postgres"));
        assert_eq!(source.get("DATABASE_HOST").as_deref(), Some("from-process"));
    }

    #[test]
    fn test_merge_missing_env_file_fails() {
        let result = MapEnvSource::new().merge_env_file("/nonexistent/dbroute/.env");
        assert!(result.is_err());
    }
}
