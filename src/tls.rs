//! TLS configuration with an optional pinned CA root certificate.
//!
//! Restaurants running the order service on a private network usually sign
//! it with their own CA. When `EXPO_CA_CERT` points at a PEM bundle, both
//! the REST client and the order channel trust only those roots; otherwise
//! the default webpki roots are used.

use std::path::Path;

use rustls::ClientConfig;

use crate::Result;

/// Builds a [`ClientConfig`] whose root store contains only the
/// certificates found in the PEM file at `ca_path`.
///
/// # Errors
///
/// Returns [`ExpoError::Io`](crate::ExpoError::Io) if the file cannot be
/// read and [`ExpoError::Tls`](crate::ExpoError::Tls) if it holds no
/// usable certificate.
pub fn build_tls_config(ca_path: &Path) -> Result<ClientConfig> {
    let pem = std::fs::read(ca_path)?;

    let certs: Vec<_> = rustls_pemfile::certs(&mut &pem[..])
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| crate::ExpoError::Tls(format!("failed to parse CA PEM: {e}")))?;

    let mut root_store = rustls::RootCertStore::empty();
    let (added, _ignored) = root_store.add_parsable_certificates(certs);
    if added == 0 {
        return Err(crate::ExpoError::Tls(format!(
            "no certificates found in {}",
            ca_path.display()
        )));
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}
