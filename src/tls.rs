use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::server::AllowAnyAuthenticatedClient;
use rustls::{Certificate, PrivateKey, RootCertStore, ServerConfig};
use rustls_pemfile::{certs, pkcs8_private_keys, rsa_private_keys};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("Failed to read {0}: {1}")]
    Io(PathBuf, #[source] io::Error),
    #[error("No certificates found in {0}")]
    NoCertificates(PathBuf),
    #[error("No PKCS#8 or RSA private key found in {0}")]
    NoPrivateKey(PathBuf),
    #[error("Invalid client CA certificate: {0}")]
    InvalidCa(String),
    #[error("Invalid server certificate or key: {0}")]
    Rustls(#[from] rustls::Error),
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| TlsError::Io(path.to_path_buf(), e))
}

pub fn load_certs(path: &Path) -> Result<Vec<Certificate>, TlsError> {
    let mut reader = open(path)?;
    let certs: Vec<Certificate> = certs(&mut reader)
        .map_err(|e| TlsError::Io(path.to_path_buf(), e))?
        .into_iter()
        .map(Certificate)
        .collect();
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

/// First PKCS#8 key in the file, falling back to PKCS#1 (RSA) keys.
pub fn load_private_key(path: &Path) -> Result<PrivateKey, TlsError> {
    let mut reader = open(path)?;
    let mut keys = pkcs8_private_keys(&mut reader).map_err(|e| TlsError::Io(path.to_path_buf(), e))?;
    if keys.is_empty() {
        let mut reader = open(path)?;
        keys = rsa_private_keys(&mut reader).map_err(|e| TlsError::Io(path.to_path_buf(), e))?;
    }
    keys.into_iter()
        .next()
        .map(PrivateKey)
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

/// Server config that only accepts clients presenting a certificate signed
/// by the CA in `client_ca_path`.
pub fn make_server_config(
    cert_path: &Path,
    key_path: &Path,
    client_ca_path: &Path,
) -> Result<Arc<ServerConfig>, TlsError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let mut root_store = RootCertStore::empty();
    for cert in load_certs(client_ca_path)? {
        root_store
            .add(&cert)
            .map_err(|e| TlsError::InvalidCa(e.to_string()))?;
    }
    let verifier = AllowAnyAuthenticatedClient::new(root_store);

    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_client_cert_verifier(Arc::new(verifier))
        .with_single_cert(certs, key)?;

    Ok(Arc::new(config))
}
