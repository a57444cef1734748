//! SSL/TLS policy and key material.
//!
//! Certificates, keys and CAs arrive through environment variables, either as
//! raw PEM (often with literal `\n` escapes from a dashboard) or as base64
//! encoded PEM. Both forms are normalized to PEM text here.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::env::{EnvReader, EnvSource};
use crate::error::{ConfigError, ConfigResult};

/// SSL/TLS mode carried in the `sslmode` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// Disable SSL.
    Disable,
    /// Allow SSL but don't require it.
    Allow,
    /// Prefer SSL but allow non-SSL.
    Prefer,
    /// Require SSL.
    #[default]
    Require,
    /// Require SSL and verify the server certificate.
    VerifyCa,
    /// Require SSL and verify the server certificate and hostname.
    VerifyFull,
}

impl SslMode {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "disable" | "false" | "0" => Some(Self::Disable),
            "allow" => Some(Self::Allow),
            "prefer" => Some(Self::Prefer),
            "require" | "true" | "1" => Some(Self::Require),
            "verify-ca" | "verify_ca" => Some(Self::VerifyCa),
            "verify-full" | "verify_full" => Some(Self::VerifyFull),
            _ => None,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Allow => "allow",
            Self::Prefer => "prefer",
            Self::Require => "require",
            Self::VerifyCa => "verify-ca",
            Self::VerifyFull => "verify-full",
        }
    }

    /// Whether the mode demands an encrypted channel.
    pub fn requires_tls(&self) -> bool {
        matches!(self, Self::Require | Self::VerifyCa | Self::VerifyFull)
    }
}

/// Normalized PEM text.
#[derive(Clone, PartialEq, Eq)]
pub struct PemValue(String);

impl PemValue {
    /// Normalize a raw PEM value.
    ///
    /// Trims surrounding whitespace and quotes and expands literal `\n`
    /// escapes into newlines.
    pub fn from_raw(value: &str) -> Self {
        let trimmed = value.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        Self(trimmed.replace("\\r\\n", "\n").replace("\\n", "\n"))
    }

    /// Decode a base64-encoded PEM value.
    ///
    /// Quotes and all whitespace are stripped before decoding. The decoded
    /// text is kept byte for byte, including the trailing newline.
    pub fn from_base64(name: &str, value: &str) -> ConfigResult<Self> {
        let compact: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '"' && *c != '\'')
            .collect();

        let bytes = STANDARD
            .decode(&compact)
            .or_else(|_| STANDARD_NO_PAD.decode(&compact))
            .map_err(|e| ConfigError::invalid_pem(name, e.to_string()))?;

        let text = String::from_utf8(bytes)
            .map_err(|_| ConfigError::invalid_pem(name, "decoded content is not UTF-8"))?;
        Ok(Self(text))
    }

    /// Accept either raw PEM or base64-encoded PEM.
    pub fn detect(name: &str, value: &str) -> ConfigResult<Self> {
        if value.contains("-----BEGIN") {
            Ok(Self::from_raw(value))
        } else {
            Self::from_base64(name, value)
        }
    }

    /// PEM text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// PEM bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for PemValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PemValue({} bytes)", self.0.len())
    }
}

impl Serialize for PemValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Key material and verification settings for an encrypted connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SslMaterial {
    /// CA certificate(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca: Option<PemValue>,
    /// Client certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<PemValue>,
    /// Client private key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<PemValue>,
    /// CA directory (passed through to drivers that support it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capath: Option<String>,
    /// Cipher list (passed through).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    /// Whether the server certificate must verify.
    pub reject_unauthorized: bool,
}

/// Whether and how to encrypt the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SslPolicy {
    /// Plaintext connection.
    Disabled,
    /// TLS with the given material.
    Enabled(SslMaterial),
}

impl SslPolicy {
    /// Read the policy from `DATABASE_SSL*` variables.
    ///
    /// Decoding problems are pushed onto `warnings` and the value is
    /// treated as absent.
    pub fn from_env<S: EnvSource + ?Sized>(
        env: &EnvReader<'_, S>,
        enabled_default: bool,
        reject_unauthorized_default: bool,
        warnings: &mut Vec<String>,
    ) -> Self {
        if !env.bool("DATABASE_SSL", enabled_default) {
            return Self::Disabled;
        }

        let ca = match env.raw("DATABASE_SSL_CA_BASE64") {
            Some(encoded) => match PemValue::from_base64("DATABASE_SSL_CA_BASE64", &encoded) {
                Ok(pem) => Some(pem),
                Err(e) => {
                    warn!(error = %e, "Falling back to DATABASE_SSL_CA");
                    warnings.push(e.to_string());
                    read_pem(env, "DATABASE_SSL_CA", warnings)
                }
            },
            None => read_pem(env, "DATABASE_SSL_CA", warnings),
        };
        let cert = read_pem(env, "DATABASE_SSL_CERT", warnings);
        let key = read_pem(env, "DATABASE_SSL_KEY", warnings);

        Self::Enabled(SslMaterial {
            ca,
            cert,
            key,
            capath: env.string("DATABASE_SSL_CAPATH"),
            cipher: env.string("DATABASE_SSL_CIPHER"),
            reject_unauthorized: env.bool(
                "DATABASE_SSL_REJECT_UNAUTHORIZED",
                reject_unauthorized_default,
            ),
        })
    }

    /// Whether TLS is enabled.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    /// Material, when enabled.
    pub fn material(&self) -> Option<&SslMaterial> {
        match self {
            Self::Enabled(material) => Some(material),
            Self::Disabled => None,
        }
    }
}

fn read_pem<S: EnvSource + ?Sized>(
    env: &EnvReader<'_, S>,
    name: &str,
    warnings: &mut Vec<String>,
) -> Option<PemValue> {
    let value = env.raw(name)?;
    match PemValue::detect(name, &value) {
        Ok(pem) => Some(pem),
        Err(e) => {
            warn!(error = %e, "Ignoring SSL material");
            warnings.push(e.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvSource;
    use pretty_assertions::assert_eq;

    const PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----";

    #[test]
    fn test_ssl_mode_parse() {
        assert_eq!(SslMode::parse("require"), Some(SslMode::Require));
        assert_eq!(SslMode::parse("VERIFY-FULL"), Some(SslMode::VerifyFull));
        assert_eq!(SslMode::parse("verify_ca"), Some(SslMode::VerifyCa));
        assert_eq!(SslMode::parse("bogus"), None);
        assert!(SslMode::Require.requires_tls());
        assert!(!SslMode::Prefer.requires_tls());
    }

    #[test]
    fn test_raw_pem_unescapes_newlines() {
        let escaped = format!("\"{}\"", PEM.replace('\n', "\\n"));
        assert_eq!(PemValue::from_raw(&escaped).as_str(), PEM);
    }

    #[test]
    fn test_base64_strips_quotes_and_whitespace() {
        let encoded = STANDARD.encode(PEM);
        let (head, tail) = encoded.split_at(12);
        let messy = format!("  \"{}\n  {}\"  ", head, tail);

        let decoded = PemValue::from_base64("DATABASE_SSL_CA_BASE64", &messy).unwrap();
        assert_eq!(decoded.as_str(), PEM);
    }

    #[test]
    fn test_base64_keeps_trailing_newline() {
        let pem = format!("{}\n", PEM);
        let encoded = STANDARD.encode(&pem);
        let messy = format!("  \"{}\"  ", encoded);

        let decoded = PemValue::from_base64("DATABASE_SSL_CA_BASE64", &messy).unwrap();
        assert_eq!(decoded.as_bytes(), pem.as_bytes());
        assert!(decoded.as_str().ends_with("-----END CERTIFICATE-----\n"));
    }

    #[test]
    fn test_base64_rejects_garbage() {
        let result = PemValue::from_base64("X", "!!!not base64!!!");
        assert!(matches!(result, Err(ConfigError::InvalidPem { .. })));
    }

    #[test]
    fn test_detect_prefers_raw_pem() {
        assert_eq!(PemValue::detect("X", PEM).unwrap().as_str(), PEM);
        let encoded = STANDARD.encode(PEM);
        assert_eq!(PemValue::detect("X", &encoded).unwrap().as_str(), PEM);
    }

    #[test]
    fn test_policy_disabled() {
        let source = MapEnvSource::new().set("DATABASE_SSL", "false");
        let mut warnings = Vec::new();
        let policy = SslPolicy::from_env(&EnvReader::new(&source), true, false, &mut warnings);
        assert_eq!(policy, SslPolicy::Disabled);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_policy_base64_ca_wins_over_raw() {
        let source = MapEnvSource::new()
            .set("DATABASE_SSL_CA", "-----BEGIN CERTIFICATE-----\nOTHER\n-----END CERTIFICATE-----")
            .set("DATABASE_SSL_CA_BASE64", STANDARD.encode(PEM))
            .set("DATABASE_SSL_REJECT_UNAUTHORIZED", "true");
        let mut warnings = Vec::new();
        let policy = SslPolicy::from_env(&EnvReader::new(&source), true, false, &mut warnings);

        let material = policy.material().unwrap();
        assert_eq!(material.ca.as_ref().unwrap().as_str(), PEM);
        assert!(material.reject_unauthorized);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_policy_bad_base64_falls_back_with_warning() {
        let source = MapEnvSource::new()
            .set("DATABASE_SSL_CA", PEM)
            .set("DATABASE_SSL_CA_BASE64", "%%%");
        let mut warnings = Vec::new();
        let policy = SslPolicy::from_env(&EnvReader::new(&source), true, false, &mut warnings);

        assert_eq!(policy.material().unwrap().ca.as_ref().unwrap().as_str(), PEM);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_pem_debug_hides_content() {
        let pem = PemValue::from_raw(PEM);
        assert!(!format!("{:?}", pem).contains("MIIB"));
    }
}
