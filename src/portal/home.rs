use std::sync::Arc;

use crate::device::KeyValueStore;
use crate::device::store::{DOMAIN_WIFI, ID_WIFI_HOSTNAME, ID_WIFI_SSID, StoreError};
use crate::http::request::Method;
use crate::pages::{HandlerFuture, PageHandler, RequestContext};
use crate::portal::escape_html;

pub const HOME_PATH: &str = "/index.html";
pub const HOME_TITLE: &str = "Home";

/// Device status page. A hostname stored on the device overrides the
/// configured one.
pub struct HomePage {
    hostname: String,
    store: Arc<dyn KeyValueStore>,
}

impl HomePage {
    pub fn new(hostname: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            hostname: hostname.into(),
            store,
        }
    }

    fn stored(&self, id: u8) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .read(DOMAIN_WIFI, id)?
            .map(|raw| String::from_utf8_lossy(&raw).into_owned()))
    }

    pub fn render(hostname: &str, ssid: Option<&str>) -> String {
        let network = match ssid {
            Some(ssid) => escape_html(ssid),
            None => "not configured".to_string(),
        };
        format!(
            "<p>Device: {}</p><p>WiFi network: {}</p></body></html>",
            escape_html(hostname),
            network
        )
    }
}

impl PageHandler for HomePage {
    fn supports(&self, method: Method) -> bool {
        method == Method::GET
    }

    fn handle_get<'a>(&'a self, cx: &'a mut RequestContext<'_>) -> HandlerFuture<'a> {
        Box::pin(async move {
            let hostname = self.stored(ID_WIFI_HOSTNAME)?;
            let ssid = self.stored(ID_WIFI_SSID)?;
            let body = Self::render(hostname.as_deref().unwrap_or(&self.hostname), ssid.as_deref());
            cx.send_page(&body).await
        })
    }
}
