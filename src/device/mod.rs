//! Interfaces to the device subsystems page handlers talk to.
//!
//! The web server itself never calls these; pages do. Each interface comes
//! with an in-memory implementation used by the binary and the tests.

pub mod certs;
pub mod reboot;
pub mod store;
pub mod wifi;

use std::future::Future;
use std::pin::Pin;

pub use certs::Credentials;
pub use reboot::{Reboot, RebootSignal};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use wifi::{SimulatedWifi, WifiError, WifiManager};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
