//! TLS connector construction.
//!
//! Builds a rustls client configuration from the resolved [`SslMaterial`]:
//!
//! - `reject_unauthorized = false`: any server certificate is accepted
//! - a CA was supplied: only that CA is trusted
//! - otherwise: the webpki root store
//!
//! A client certificate is attached when both certificate and key are set.

use std::sync::Arc;

use dbroute_config::{PemValue, SslMaterial, SslPolicy};
use rustls::client::WantsClientCert;
use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, ConfigBuilder, RootCertStore};
use tokio_postgres_rustls::MakeRustlsConnect;

use crate::error::{PgError, PgResult};

/// Build the driver's TLS connector. `None` when TLS is disabled.
pub fn make_connector(policy: &SslPolicy) -> PgResult<Option<MakeRustlsConnect>> {
    match policy {
        SslPolicy::Disabled => Ok(None),
        SslPolicy::Enabled(material) => Ok(Some(MakeRustlsConnect::new(client_config(material)?))),
    }
}

/// Build a rustls client configuration.
pub fn client_config(material: &SslMaterial) -> PgResult<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(&[&rustls::version::TLS12, &rustls::version::TLS13])
        .map_err(|e| PgError::tls(format!("failed to set TLS versions: {}", e)))?;

    let builder = if !material.reject_unauthorized {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(danger::NoVerifier(provider)))
    } else {
        let mut roots = RootCertStore::empty();
        match &material.ca {
            Some(ca) => {
                for cert in parse_certs("CA", ca)? {
                    roots
                        .add(cert)
                        .map_err(|e| PgError::tls(format!("failed to add CA certificate: {}", e)))?;
                }
            }
            None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
        }
        builder.with_root_certificates(roots)
    };

    add_client_auth(builder, material)
}

fn add_client_auth(
    builder: ConfigBuilder<ClientConfig, WantsClientCert>,
    material: &SslMaterial,
) -> PgResult<ClientConfig> {
    let (Some(cert), Some(key)) = (&material.cert, &material.key) else {
        return Ok(builder.with_no_client_auth());
    };

    let certs = parse_certs("client", cert)?;
    let key = rustls_pemfile::private_key(&mut key.as_bytes())
        .map_err(|e| PgError::tls(format!("failed to parse client key: {}", e)))?
        .ok_or_else(|| PgError::tls("no private key found in DATABASE_SSL_KEY"))?;

    builder
        .with_client_auth_cert(certs, key)
        .map_err(|e| PgError::tls(format!("failed to configure client auth: {}", e)))
}

fn parse_certs(what: &str, pem: &PemValue) -> PgResult<Vec<CertificateDer<'static>>> {
    let certs = rustls_pemfile::certs(&mut pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PgError::tls(format!("failed to parse {} certificate: {}", what, e)))?;
    if certs.is_empty() {
        return Err(PgError::tls(format!("no {} certificates found", what)));
    }
    Ok(certs)
}

mod danger {
    use std::sync::Arc;

    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, Error, SignatureScheme};

    /// Accepts any server certificate; signatures are still checked.
    #[derive(Debug)]
    pub(super) struct NoVerifier(pub(super) Arc<CryptoProvider>);

    impl ServerCertVerifier for NoVerifier {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOT_A_CERT: &str = "-----BEGIN CERTIFICATE-----\nbm90IGEgY2VydA==\n-----END CERTIFICATE-----";

    #[test]
    fn test_disabled_has_no_connector() {
        assert!(make_connector(&SslPolicy::Disabled).unwrap().is_none());
    }

    #[test]
    fn test_no_verify_config() {
        let material = SslMaterial::default();
        assert!(!material.reject_unauthorized);
        assert!(make_connector(&SslPolicy::Enabled(material)).unwrap().is_some());
    }

    #[test]
    fn test_webpki_roots_when_no_ca() {
        let material = SslMaterial {
            reject_unauthorized: true,
            ..Default::default()
        };
        assert!(client_config(&material).is_ok());
    }

    #[test]
    fn test_ca_without_certificates_fails() {
        let material = SslMaterial {
            ca: Some(PemValue::from_raw("garbage")),
            reject_unauthorized: true,
            ..Default::default()
        };
        let err = client_config(&material).unwrap_err();
        assert!(err.is_tls());
    }

    #[test]
    fn test_invalid_ca_certificate_fails() {
        let material = SslMaterial {
            ca: Some(PemValue::from_raw(NOT_A_CERT)),
            reject_unauthorized: true,
            ..Default::default()
        };
        assert!(client_config(&material).is_err());
    }

    #[test]
    fn test_client_key_missing_fails() {
        let material = SslMaterial {
            cert: Some(PemValue::from_raw(NOT_A_CERT)),
            key: Some(PemValue::from_raw("not a key")),
            ..Default::default()
        };
        assert!(client_config(&material).unwrap_err().is_tls());
    }
}
