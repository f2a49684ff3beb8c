//! WiFi manager interface: scanning, station connect, and the local access point.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::info;

use crate::device::BoxFuture;
use crate::device::store::{DOMAIN_WIFI, ID_WIFI_PSK, ID_WIFI_SSID, KeyValueStore, StoreError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WifiError {
    #[error("no credentials stored")]
    NotConfigured,
    #[error("scan failed: {0}")]
    Scan(String),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

pub trait WifiManager: Send + Sync {
    /// Scans for networks and returns the SSIDs found.
    fn scan(&self) -> BoxFuture<'_, Result<Vec<String>, WifiError>>;

    /// Joins the network whose credentials are stored.
    fn connect(&self) -> Result<(), WifiError>;

    fn enable_ap(&self);

    fn disable_ap(&self);

    /// True while the device runs its own access point.
    fn has_ap(&self) -> bool;
}

/// WiFi stand-in answering scans from a fixed network list.
pub struct SimulatedWifi {
    networks: Vec<String>,
    store: Arc<dyn KeyValueStore>,
    ap: AtomicBool,
    connected: AtomicBool,
}

impl SimulatedWifi {
    pub fn new(networks: Vec<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            networks,
            store,
            ap: AtomicBool::new(false),
            connected: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl WifiManager for SimulatedWifi {
    fn scan(&self) -> BoxFuture<'_, Result<Vec<String>, WifiError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            info!(found = self.networks.len(), "Wifi scan done");
            Ok(self.networks.clone())
        })
    }

    fn connect(&self) -> Result<(), WifiError> {
        let ssid = self.store.read(DOMAIN_WIFI, ID_WIFI_SSID)?;
        let psk = self.store.read(DOMAIN_WIFI, ID_WIFI_PSK)?;
        match (ssid, psk) {
            (Some(ssid), Some(_)) => {
                info!(ssid = %String::from_utf8_lossy(&ssid), "connected");
                self.connected.store(true, Ordering::Release);
                Ok(())
            }
            _ => Err(WifiError::NotConfigured),
        }
    }

    fn enable_ap(&self) {
        info!("access point enabled");
        self.ap.store(true, Ordering::Release);
    }

    fn disable_ap(&self) {
        info!("access point disabled");
        self.ap.store(false, Ordering::Release);
    }

    fn has_ap(&self) -> bool {
        self.ap.load(Ordering::Acquire)
    }
}
