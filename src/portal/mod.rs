//! Pages served by the onboarding firmware: the WiFi setup form shown as the
//! captive portal, and the home page shown once the device is on a network.

pub mod home;
pub mod wifi_setup;

use std::sync::Arc;

use crate::device::{KeyValueStore, Reboot, WifiManager};
use crate::pages::{PageFlags, PageRegistry, RegistryError};

pub use home::{HOME_PATH, HOME_TITLE, HomePage};
pub use wifi_setup::{WIFI_SETUP_PATH, WIFI_SETUP_TITLE, WifiSetupPage};

/// Registers the home page and the captive portal.
pub fn register_pages(
    registry: &mut PageRegistry,
    hostname: &str,
    wifi: Arc<dyn WifiManager>,
    store: Arc<dyn KeyValueStore>,
    reboot: Arc<dyn Reboot>,
) -> Result<(), RegistryError> {
    registry.register(
        HOME_PATH,
        HOME_TITLE,
        Arc::new(HomePage::new(hostname, Arc::clone(&store))),
        PageFlags::HOME,
    )?;
    registry.register(
        WIFI_SETUP_PATH,
        WIFI_SETUP_TITLE,
        Arc::new(WifiSetupPage::new(wifi, store, reboot)),
        PageFlags::CAPTIVE_PORTAL,
    )
}

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
