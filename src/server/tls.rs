//! TLS setup
//!
//! Builds the rustls acceptor from PEM files, or from a self-signed
//! certificate for `localhost` when none are configured.

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;
use crate::error::{Error, Result};

/// Build an acceptor for `config`, advertising `h2` over ALPN when HTTP/2 is on
pub fn build_acceptor(config: &TlsConfig) -> Result<TlsAcceptor> {
    let (certs, key) = match (&config.cert, &config.key) {
        (Some(cert), Some(key)) => (load_certs(cert)?, load_key(key)?),
        (None, None) => self_signed()?,
        _ => {
            return Err(Error::Tls(
                "both a certificate and a key are required".to_string(),
            ))
        }
    };

    let mut server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::Tls(e.to_string()))?;

    server_config.alpn_protocols = if config.http2 {
        vec![b"h2".to_vec(), b"http/1.1".to_vec()]
    } else {
        vec![b"http/1.1".to_vec()]
    };

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| Error::Tls(format!("{path}: {e}")))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("{path}: {e}")))?;

    if certs.is_empty() {
        return Err(Error::Tls(format!("{path}: no certificates found")));
    }
    Ok(certs)
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| Error::Tls(format!("{path}: {e}")))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| Error::Tls(format!("{path}: {e}")))?
        .ok_or_else(|| Error::Tls(format!("{path}: no private key found")))
}

/// Throwaway certificate for local development
fn self_signed() -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let names = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    let certified = rcgen::generate_simple_self_signed(names)
        .map_err(|e| Error::Tls(format!("self-signed certificate: {e}")))?;

    tracing::warn!("No certificate configured, using a self-signed one for localhost");

    let key = PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der());
    Ok((vec![certified.cert.der().clone()], PrivateKeyDer::Pkcs8(key)))
}
