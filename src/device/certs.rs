//! Certificate material for the HTTPS variant.

use anyhow::{Context, Result};

use crate::config::TlsConfig;

/// PEM encoded CA certificate, server certificate and private key.
#[derive(Clone)]
pub struct Credentials {
    pub ca_cert: Option<Vec<u8>>,
    pub server_cert: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl Credentials {
    pub fn load(cfg: &TlsConfig) -> Result<Self> {
        let ca_cert = cfg
            .ca_cert
            .as_ref()
            .map(|path| {
                std::fs::read(path)
                    .with_context(|| format!("reading CA certificate {}", path.display()))
            })
            .transpose()?;
        let server_cert = std::fs::read(&cfg.server_cert)
            .with_context(|| format!("reading server certificate {}", cfg.server_cert.display()))?;
        let private_key = std::fs::read(&cfg.private_key)
            .with_context(|| format!("reading private key {}", cfg.private_key.display()))?;
        Ok(Self {
            ca_cert,
            server_cert,
            private_key,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("ca_cert", &self.ca_cert.as_ref().map(Vec::len))
            .field("server_cert", &self.server_cert.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}
