//! TLS acceptor construction
//!
//! Loads PEM certificate/key material and, when configured, a CA bundle
//! for verifying client certificates.

use std::io::{BufReader, Cursor};
use std::sync::Arc;

use rustls_pemfile::{certs, pkcs8_private_keys};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;
use tracing::info;

use crate::config::{ClientAuth, TlsConfig};
use crate::error::AppError;

/// Build a TLS acceptor from the listener configuration
pub fn load_acceptor(config: &TlsConfig) -> Result<TlsAcceptor, AppError> {
    let cert_chain = load_certs(&config.cert_path)?;
    let key = load_key(&config.key_path)?;

    let builder = ServerConfig::builder();
    let tls_config = match config.client_auth {
        ClientAuth::None => builder
            .with_no_client_auth()
            .with_single_cert(cert_chain, key)?,
        mode => {
            let ca_path = config
                .ca_path
                .as_ref()
                .ok_or_else(|| AppError::Pem("ca_path required for client_auth".to_string()))?;

            let mut roots = RootCertStore::empty();
            for cert in load_certs(ca_path)? {
                roots.add(cert)?;
            }

            let verifier_builder = WebPkiClientVerifier::builder(Arc::new(roots));
            let verifier = if mode == ClientAuth::Optional {
                verifier_builder.allow_unauthenticated().build()?
            } else {
                verifier_builder.build()?
            };

            builder
                .with_client_cert_verifier(verifier)
                .with_single_cert(cert_chain, key)?
        }
    };

    info!(client_auth = ?config.client_auth, "TLS acceptor ready");
    Ok(TlsAcceptor::from(Arc::new(tls_config)))
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, AppError> {
    let data = std::fs::read(path)?;
    let reader = &mut BufReader::new(Cursor::new(data));
    let certs: Vec<CertificateDer<'static>> = certs(reader).collect::<Result<Vec<_>, _>>()?;

    if certs.is_empty() {
        return Err(AppError::Pem(format!("No certificates found in {path}")));
    }
    Ok(certs)
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>, AppError> {
    let data = std::fs::read(path)?;
    let reader = &mut BufReader::new(Cursor::new(data));
    let key = pkcs8_private_keys(reader)
        .next()
        .transpose()?
        .ok_or_else(|| AppError::Pem(format!("No private keys found in {path}")))?;
    Ok(PrivateKeyDer::from(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_rustls::rustls::pki_types::ServerName;
    use tokio_rustls::rustls::ClientConfig;
    use tokio_rustls::TlsConnector;

    fn pem_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    /// Self-signed "localhost" certificate with its cert and key written out
    struct TestCert {
        cert: rcgen::CertifiedKey,
        cert_file: NamedTempFile,
        key_file: NamedTempFile,
    }

    impl TestCert {
        fn generate() -> Self {
            let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
            let cert_file = pem_file(&cert.cert.pem());
            let key_file = pem_file(&cert.key_pair.serialize_pem());
            Self {
                cert,
                cert_file,
                key_file,
            }
        }

        fn config(&self, client_auth: ClientAuth, ca_path: Option<String>) -> TlsConfig {
            TlsConfig {
                cert_path: self.cert_file.path().to_str().unwrap().to_string(),
                key_path: self.key_file.path().to_str().unwrap().to_string(),
                client_auth,
                ca_path,
            }
        }

        fn connector(&self) -> TlsConnector {
            let mut roots = RootCertStore::empty();
            roots.add(self.cert.cert.der().clone()).unwrap();
            let config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            TlsConnector::from(Arc::new(config))
        }
    }

    #[tokio::test]
    async fn handshake_and_exchange_line() {
        let cert = TestCert::generate();
        let acceptor = load_acceptor(&cert.config(ClientAuth::None, None)).unwrap();
        let connector = cert.connector();
        let (client_io, server_io) = tokio::io::duplex(16 * 1024);

        let server = tokio::spawn(async move {
            let mut stream = acceptor.accept(server_io).await.unwrap();
            let mut buf = [0u8; 6];
            stream.read_exact(&mut buf).await.unwrap();
            stream.write_all(b"pong\n").await.unwrap();
            stream.flush().await.unwrap();
            buf
        });

        let name = ServerName::try_from("localhost").unwrap();
        let mut client = connector.connect(name, client_io).await.unwrap();
        client.write_all(b"/help\n").await.unwrap();
        client.flush().await.unwrap();
        let mut reply = [0u8; 5];
        client.read_exact(&mut reply).await.unwrap();

        assert_eq!(&reply, b"pong\n");
        assert_eq!(&server.await.unwrap(), b"/help\n");
    }

    #[tokio::test]
    async fn required_client_auth_rejects_anonymous_client() {
        let cert = TestCert::generate();
        let ca_path = cert.cert_file.path().to_str().unwrap().to_string();
        let acceptor = load_acceptor(&cert.config(ClientAuth::Required, Some(ca_path))).unwrap();
        let connector = cert.connector();
        let (client_io, server_io) = tokio::io::duplex(16 * 1024);

        let name = ServerName::try_from("localhost").unwrap();
        let (accepted, _connected) =
            tokio::join!(acceptor.accept(server_io), connector.connect(name, client_io));

        assert!(accepted.is_err());
    }

    #[test]
    fn client_auth_without_ca_path_is_rejected() {
        let cert = TestCert::generate();
        let result = load_acceptor(&cert.config(ClientAuth::Optional, None));
        assert!(matches!(result, Err(AppError::Pem(_))));
    }

    #[test]
    fn missing_cert_file_is_io_error() {
        let config = TlsConfig {
            cert_path: "/nonexistent/server.crt".to_string(),
            key_path: "/nonexistent/server.key".to_string(),
            client_auth: ClientAuth::None,
            ca_path: None,
        };
        assert!(matches!(load_acceptor(&config), Err(AppError::Io(_))));
    }

    #[test]
    fn pem_without_certificates_is_rejected() {
        let file = pem_file("not a certificate\n");
        let err = load_certs(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, AppError::Pem(_)));
    }

    #[test]
    fn pem_without_keys_is_rejected() {
        let file = pem_file("");
        let err = load_key(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, AppError::Pem(_)));
    }
}
