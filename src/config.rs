//! Runtime configuration.
//!
//! Configuration is read from a YAML document. Every section has defaults, so
//! an empty file (or no file at all) yields a server on port 80 with three
//! worker slots listening on IPv4.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "ONBOARD_CONFIG";

/// Environment variable overriding the listening port.
pub const PORT_ENV: &str = "LISTEN_PORT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: Limits,
    pub portal: PortalConfig,
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port. When unset, 80 for plaintext or 443 when `tls` is present.
    pub port: Option<u16>,
    pub ipv4: bool,
    pub ipv6: bool,
    pub bind_v4: String,
    pub bind_v6: String,
    /// Number of worker slots shared by all listeners.
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: None,
            ipv4: true,
            ipv6: false,
            bind_v4: "0.0.0.0".to_string(),
            bind_v6: "::".to_string(),
            workers: 3,
        }
    }
}

/// Buffer bounds for request parsing and response building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Hard cap on the rendered navigation menu.
    pub menu_capacity: usize,
    /// Hard cap on a composed `200 OK` header (status line through menu).
    pub header_capacity: usize,
    /// Largest slice handed to a single write call.
    pub send_chunk: usize,
    /// Request header bytes accepted before the blank line.
    pub max_header_bytes: usize,
    /// Largest `Content-Length` accepted on a POST.
    pub max_body_bytes: usize,
    /// Registry capacity.
    pub max_pages: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            menu_capacity: 256,
            header_capacity: 1024,
            send_chunk: 1024,
            max_header_bytes: 2048,
            max_body_bytes: 1024,
            max_pages: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Heading shown above the navigation menu.
    pub banner: String,
    /// Start with the local access point up (captive portal mode).
    pub access_point: bool,
    pub hostname: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            banner: "Onboarding".to_string(),
            access_point: true,
            hostname: "onboard".to_string(),
        }
    }
}

/// PEM files for the HTTPS variant.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub ca_cert: Option<PathBuf>,
    pub server_cert: PathBuf,
    pub private_key: PathBuf,
}

impl Config {
    /// Loads the file named by `ONBOARD_CONFIG`, falling back to defaults,
    /// then applies the `LISTEN_PORT` override.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {path}"))?;
                Self::from_yaml(&text).with_context(|| format!("parsing config file {path}"))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(port) = std::env::var(PORT_ENV) {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("{PORT_ENV} is not a valid port: {port}"))?;
            cfg.server.port = Some(port);
        }

        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(text)?;
        if cfg.server.workers == 0 {
            anyhow::bail!("server.workers must be at least 1");
        }
        if !cfg.server.ipv4 && !cfg.server.ipv6 {
            anyhow::bail!("at least one of server.ipv4 / server.ipv6 must be enabled");
        }
        Ok(cfg)
    }

    pub fn port(&self) -> u16 {
        self.server
            .port
            .unwrap_or(if self.tls.is_some() { 443 } else { 80 })
    }
}
