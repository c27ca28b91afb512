//! Mutual-TLS material and peer identity.
//!
//! Loads the CA certificate and the node's own certificate/key pair from
//! PEM files and produces tonic TLS configurations for both sides of the
//! connection. The caller's identity is the subject common name of the
//! first certificate the client presented; the transport has already
//! verified that certificate against the CA before any handler runs.

use std::path::{Path, PathBuf};

use tokio::fs;
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};
use x509_parser::prelude::FromDer;

/// Error type for TLS configuration issues.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// The CA certificate file does not exist.
    #[error("CA certificate not found: {0}")]
    CaCertNotFound(PathBuf),

    /// The node certificate file does not exist.
    #[error("certificate not found: {0}")]
    CertNotFound(PathBuf),

    /// The private key file does not exist.
    #[error("private key not found: {0}")]
    KeyNotFound(PathBuf),

    /// Reading one of the files failed.
    #[error("failed to read TLS file: {0}")]
    Io(#[from] std::io::Error),
}

/// Loaded TLS materials ready for use with tonic.
///
/// Contains both this endpoint's identity (certificate + private key) and
/// the CA certificate used to verify the peer.
#[derive(Clone)]
pub struct TlsMaterial {
    identity: Identity,
    ca_cert: Certificate,
}

impl TlsMaterial {
    /// Loads TLS materials from PEM file paths.
    ///
    /// # Errors
    ///
    /// Returns an error if any file does not exist or cannot be read.
    pub async fn load(ca_path: &Path, cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        if !ca_path.exists() {
            return Err(TlsError::CaCertNotFound(ca_path.to_path_buf()));
        }
        if !cert_path.exists() {
            return Err(TlsError::CertNotFound(cert_path.to_path_buf()));
        }
        if !key_path.exists() {
            return Err(TlsError::KeyNotFound(key_path.to_path_buf()));
        }

        let ca_pem = fs::read(ca_path).await?;
        let cert_pem = fs::read(cert_path).await?;
        let key_pem = fs::read(key_path).await?;

        Ok(Self {
            identity: Identity::from_pem(cert_pem, key_pem),
            ca_cert: Certificate::from_pem(ca_pem),
        })
    }

    /// Creates the server-side TLS config.
    ///
    /// Presents this endpoint's certificate and requires clients to
    /// present one signed by the CA.
    #[must_use]
    pub fn server_tls_config(&self) -> ServerTlsConfig {
        ServerTlsConfig::new()
            .identity(self.identity.clone())
            .client_ca_root(self.ca_cert.clone())
    }

    /// Creates the client-side TLS config for dialing the server.
    ///
    /// `domain` must match the server certificate's subject name.
    #[must_use]
    pub fn client_tls_config(&self, domain: &str) -> ClientTlsConfig {
        ClientTlsConfig::new()
            .domain_name(domain)
            .ca_certificate(self.ca_cert.clone())
            .identity(self.identity.clone())
    }
}

/// Extracts the caller's identity from the request's client certificate.
///
/// Returns the subject common name of the first peer certificate, or
/// `None` when the request carries no parseable certificate.
#[must_use]
pub fn peer_identity<T>(request: &tonic::Request<T>) -> Option<String> {
    let certs = request.peer_certs()?;
    let cert = certs.first()?;
    subject_common_name(cert.as_ref())
}

/// Parses a DER certificate and returns its subject common name.
#[must_use]
pub fn subject_common_name(der: &[u8]) -> Option<String> {
    let (_, cert) = x509_parser::certificate::X509Certificate::from_der(der).ok()?;
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    // Self-signed certificate with subject CN=test-client.
    const CLIENT_CERT_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBgjCCASegAwIBAgIUA0H2I9Cp+kZDRVZcjLCCLewMFM4wCgYIKoZIzj0EAwIw
FjEUMBIGA1UEAwwLdGVzdC1jbGllbnQwHhcNMjYwODA1MDM1NzE1WhcNMzYwODAy
MDM1NzE1WjAWMRQwEgYDVQQDDAt0ZXN0LWNsaWVudDBZMBMGByqGSM49AgEGCCqG
SM49AwEHA0IABO6w2kehpqFaZG8Zm/TT1QuCqZXVVXcekML2mdVeCakcd1DeFcs7
k5jgSutm0sdsZmFK37u3jL13fosbKWyqqiyjUzBRMB0GA1UdDgQWBBQfOZKtTOEI
HE/oiAGFNamiygh/wjAfBgNVHSMEGDAWgBQfOZKtTOEIHE/oiAGFNamiygh/wjAP
BgNVHRMBAf8EBTADAQH/MAoGCCqGSM49BAMCA0kAMEYCIQDq/YVUZpVMntKkiDZp
c7NkTNU6QSj1LrrQc+/h25l/yAIhAMOUzFAR2aUic292BX3WWL6GvrFa4ItxV9cM
MczgCzJC
-----END CERTIFICATE-----
";

    #[test]
    fn subject_common_name_reads_the_cn() {
        let (_, pem) =
            x509_parser::pem::parse_x509_pem(CLIENT_CERT_PEM.as_bytes()).expect("parse pem");
        let cn = subject_common_name(&pem.contents).expect("common name");
        assert_eq!(cn, "test-client");
    }

    #[test]
    fn subject_common_name_rejects_garbage() {
        assert!(subject_common_name(b"not a certificate").is_none());
    }

    #[test]
    fn peer_identity_is_absent_without_a_tls_session() {
        let request = tonic::Request::new(());
        assert!(peer_identity(&request).is_none());
    }

    #[tokio::test]
    async fn load_reports_the_first_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ca = dir.path().join("ca.crt");
        let cert = dir.path().join("node.crt");
        let key = dir.path().join("node.key");

        let result = TlsMaterial::load(&ca, &cert, &key).await;
        assert!(matches!(result, Err(TlsError::CaCertNotFound(_))));

        std::fs::write(&ca, CLIENT_CERT_PEM).expect("write ca");
        let result = TlsMaterial::load(&ca, &cert, &key).await;
        assert!(matches!(result, Err(TlsError::CertNotFound(_))));

        std::fs::write(&cert, CLIENT_CERT_PEM).expect("write cert");
        let result = TlsMaterial::load(&ca, &cert, &key).await;
        assert!(matches!(result, Err(TlsError::KeyNotFound(_))));
    }
}
