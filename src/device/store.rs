//! Non-volatile key/value storage, addressed by (domain, id).

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use thiserror::Error;
use tracing::{debug, info};

pub const DOMAIN_WIFI: u8 = 1;
pub const ID_WIFI_SSID: u8 = 0;
pub const ID_WIFI_PSK: u8 = 1;
pub const ID_WIFI_HOSTNAME: u8 = 2;
/// Number of ids in the WiFi domain.
pub const WIFI_ID_COUNT: u8 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("domain {0} is not registered")]
    UnknownDomain(u8),
    #[error("id {id} is out of range for domain {domain}")]
    UnknownId { domain: u8, id: u8 },
    #[error("store unavailable")]
    Unavailable,
}

pub trait KeyValueStore: Send + Sync {
    fn read(&self, domain: u8, id: u8) -> Result<Option<Vec<u8>>, StoreError>;

    fn write(&self, domain: u8, id: u8, value: &[u8]) -> Result<(), StoreError>;

    /// Erases every record.
    fn factory_reset(&self) -> Result<(), StoreError>;
}

type WriteObserver = Box<dyn Fn(u8, u8, &[u8]) + Send + Sync>;

/// Store kept in memory. Domains must be registered with their id count
/// before use, like the flash-backed store.
#[derive(Default)]
pub struct MemoryStore {
    domains: RwLock<HashMap<u8, u8>>,
    records: RwLock<HashMap<(u8, u8), Vec<u8>>>,
    observer: Mutex<Option<WriteObserver>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the WiFi domain registered.
    pub fn with_wifi_domain() -> Self {
        let store = Self::new();
        // A fresh store has no lock holders, so this cannot fail.
        let _ = store.register_domain(DOMAIN_WIFI, WIFI_ID_COUNT);
        store
    }

    pub fn register_domain(&self, domain: u8, num_ids: u8) -> Result<(), StoreError> {
        self.domains
            .write()
            .map_err(|_| StoreError::Unavailable)?
            .insert(domain, num_ids);
        Ok(())
    }

    /// Installs a callback invoked after every successful write.
    pub fn set_write_observer(&self, observer: impl Fn(u8, u8, &[u8]) + Send + Sync + 'static) {
        if let Ok(mut slot) = self.observer.lock() {
            *slot = Some(Box::new(observer));
        }
    }

    fn check(&self, domain: u8, id: u8) -> Result<(), StoreError> {
        let domains = self.domains.read().map_err(|_| StoreError::Unavailable)?;
        match domains.get(&domain) {
            None => Err(StoreError::UnknownDomain(domain)),
            Some(&num) if id >= num => Err(StoreError::UnknownId { domain, id }),
            Some(_) => Ok(()),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, domain: u8, id: u8) -> Result<Option<Vec<u8>>, StoreError> {
        self.check(domain, id)?;
        let records = self.records.read().map_err(|_| StoreError::Unavailable)?;
        Ok(records.get(&(domain, id)).cloned())
    }

    fn write(&self, domain: u8, id: u8, value: &[u8]) -> Result<(), StoreError> {
        self.check(domain, id)?;
        self.records
            .write()
            .map_err(|_| StoreError::Unavailable)?
            .insert((domain, id), value.to_vec());
        debug!(domain, id, len = value.len(), "record written");

        if let Ok(observer) = self.observer.lock() {
            if let Some(observer) = observer.as_ref() {
                observer(domain, id, value);
            }
        }
        Ok(())
    }

    fn factory_reset(&self) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::Unavailable)?
            .clear();
        info!("factory reset");
        Ok(())
    }
}
