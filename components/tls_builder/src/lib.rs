//! tls_builder component
//!
//! Builds a rustls client configuration from the client's TLS options:
//! certificate verification toggle, extra CA roots, mutual-TLS client
//! credentials from a PEM path or in-memory PEM bytes, and the ALPN
//! protocol list driving HTTP/1.1 vs HTTP/2 selection.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

use httpr_errors::{Error, Result};
use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

/// TLS options as supplied at client construction
///
/// # Examples
///
/// ```
/// use httpr_tls::TlsSettings;
///
/// let settings = TlsSettings::default();
/// let config = settings.build().unwrap();
/// assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec(), b"h2".to_vec()]);
/// ```
#[derive(Debug, Clone)]
pub struct TlsSettings {
    /// Verify peer certificates; disabling trusts any peer (test/dev only)
    pub verify: bool,
    /// Additional PEM root bundle loaded next to the built-in webpki roots
    pub ca_cert_file: Option<PathBuf>,
    /// Path to a PEM holding the client certificate chain and private key
    pub client_pem: Option<PathBuf>,
    /// In-memory PEM bytes for the client credentials; wins over the path
    pub client_pem_data: Option<Vec<u8>>,
    /// Advertise only `h2` via ALPN instead of both protocols
    pub http2_only: bool,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            verify: true,
            ca_cert_file: None,
            client_pem: None,
            client_pem_data: None,
            http2_only: false,
        }
    }
}

impl TlsSettings {
    /// Build the rustls configuration
    ///
    /// # Errors
    ///
    /// `Error::Connect` when a PEM file cannot be read or contains no
    /// usable certificate/key material.
    pub fn build(&self) -> Result<Arc<ClientConfig>> {
        let client_auth = self.load_client_auth()?;

        let config = if self.verify {
            let roots = self.build_root_store()?;
            let builder = ClientConfig::builder().with_root_certificates(roots);
            match client_auth {
                Some((certs, key)) => builder.with_client_auth_cert(certs, key).map_err(|e| {
                    Error::Connect(format!("invalid client certificate: {}", e))
                })?,
                None => builder.with_no_client_auth(),
            }
        } else {
            tracing::warn!("certificate verification disabled; trusting any peer");
            let builder = ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert));
            match client_auth {
                Some((certs, key)) => builder.with_client_auth_cert(certs, key).map_err(|e| {
                    Error::Connect(format!("invalid client certificate: {}", e))
                })?,
                None => builder.with_no_client_auth(),
            }
        };

        let mut config = config;
        config.alpn_protocols = self.alpn_protocols();
        Ok(Arc::new(config))
    }

    /// ALPN list in preference order
    pub fn alpn_protocols(&self) -> Vec<Vec<u8>> {
        if self.http2_only {
            vec![b"h2".to_vec()]
        } else {
            vec![b"http/1.1".to_vec(), b"h2".to_vec()]
        }
    }

    /// Stable identity for pool keying: two settings with the same
    /// fingerprint produce interchangeable connections
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.verify.hash(&mut hasher);
        self.ca_cert_file.hash(&mut hasher);
        self.client_pem.hash(&mut hasher);
        self.client_pem_data.hash(&mut hasher);
        self.http2_only.hash(&mut hasher);
        hasher.finish()
    }

    fn build_root_store(&self) -> Result<RootCertStore> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        if let Some(path) = &self.ca_cert_file {
            let data = std::fs::read(path).map_err(|e| {
                Error::Connect(format!("cannot read CA bundle {}: {}", path.display(), e))
            })?;
            let certs = rustls_pemfile::certs(&mut data.as_slice())
                .collect::<std::io::Result<Vec<_>>>()
                .map_err(|e| {
                    Error::Connect(format!("cannot parse CA bundle {}: {}", path.display(), e))
                })?;
            let (added, ignored) = roots.add_parsable_certificates(certs);
            tracing::debug!(added, ignored, path = %path.display(), "loaded extra CA roots");
            if added == 0 {
                return Err(Error::Connect(format!(
                    "CA bundle {} contains no usable certificates",
                    path.display()
                )));
            }
        }
        Ok(roots)
    }

    /// Load the mTLS credentials from bytes or path; bytes win when both
    /// are supplied
    fn load_client_auth(
        &self,
    ) -> Result<Option<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)>> {
        let pem = match (&self.client_pem_data, &self.client_pem) {
            (Some(data), _) => data.clone(),
            (None, Some(path)) => std::fs::read(path).map_err(|e| {
                Error::Connect(format!("cannot read client PEM {}: {}", path.display(), e))
            })?,
            (None, None) => return Ok(None),
        };

        let certs = rustls_pemfile::certs(&mut pem.as_slice())
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| Error::Connect(format!("cannot parse client PEM: {}", e)))?;
        if certs.is_empty() {
            return Err(Error::Connect(
                "client PEM contains no certificates".to_string(),
            ));
        }

        let key = rustls_pemfile::private_key(&mut pem.as_slice())
            .map_err(|e| Error::Connect(format!("cannot parse client key: {}", e)))?
            .ok_or_else(|| Error::Connect("client PEM contains no private key".to_string()))?;

        Ok(Some((certs, key)))
    }
}

/// Verifier that accepts any peer certificate, installed when `verify=false`
#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
