use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;

use crate::device::Credentials;

/// Builds the TLS acceptor from PEM material. A CA certificate, when given,
/// is appended to the served chain.
pub fn acceptor(creds: &Credentials) -> Result<TlsAcceptor> {
    let mut chain = rustls_pemfile::certs(&mut creds.server_cert.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to register public certificate")?;
    if let Some(ca) = &creds.ca_cert {
        let ca = rustls_pemfile::certs(&mut ca.as_slice())
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to register ca certificate")?;
        chain.extend(ca);
    }
    let key = rustls_pemfile::private_key(&mut creds.private_key.as_slice())
        .context("Failed to register private key")?
        .context("no private key in PEM data")?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .context("building TLS server config")?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}
