use std::fmt::Write;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::device::store::{DOMAIN_WIFI, ID_WIFI_PSK, ID_WIFI_SSID};
use crate::device::{KeyValueStore, Reboot, WifiManager};
use crate::http::form::Attribute;
use crate::http::request::Method;
use crate::pages::{HandlerError, HandlerFuture, HandlerResult, PageHandler, RequestContext};
use crate::portal::escape_html;

pub const WIFI_SETUP_PATH: &str = "/setwifi.html";
pub const WIFI_SETUP_TITLE: &str = "Wifi setup";

const FORM_START: &str = "<form method=\"post\" enctype=\"text/plain\" action=\"/setwifi.html\"><div><label for=\"ssid\">Select a SSID:</label><select name=\"ssid\" id=\"ssid\">";
const FORM_END: &str = "</select></div><div><label for=\"pass\">Password (8 characters minimum):</label><input type=\"password\" id=\"pass\" name=\"password\" minlength=\"8\" required /></div><input type=\"submit\" value=\"Configure\" /></form></body></html>";

const ATTR_SSID: usize = 0;
const ATTR_PASSWORD: usize = 1;

/// Captive portal: lists scanned networks and stores the credentials posted back.
pub struct WifiSetupPage {
    wifi: Arc<dyn WifiManager>,
    store: Arc<dyn KeyValueStore>,
    reboot: Arc<dyn Reboot>,
}

impl WifiSetupPage {
    pub fn new(
        wifi: Arc<dyn WifiManager>,
        store: Arc<dyn KeyValueStore>,
        reboot: Arc<dyn Reboot>,
    ) -> Self {
        Self {
            wifi,
            store,
            reboot,
        }
    }

    fn attributes() -> [Attribute; 2] {
        [Attribute::new("ssid", 4), Attribute::new("password", 8)]
    }

    async fn save(&self, cx: &mut RequestContext<'_>) -> HandlerResult {
        let mut attrs = Self::attributes();
        cx.read_form(&mut attrs).await?;

        if let Some(short) = attrs.iter().find(|a| !a.meets_min_length()) {
            return Err(HandlerError::Invalid(format!(
                "{} must be at least {} characters",
                short.name(),
                short.min_length()
            )));
        }

        let ssid = attrs[ATTR_SSID].value();
        self.store
            .write(DOMAIN_WIFI, ID_WIFI_SSID, ssid.as_bytes())
            .inspect_err(|e| error!(error = %e, "Unable to save SSID"))?;
        self.store
            .write(DOMAIN_WIFI, ID_WIFI_PSK, attrs[ATTR_PASSWORD].value().as_bytes())
            .inspect_err(|e| error!(error = %e, "Unable to save PSK"))?;
        info!(ssid, "credentials saved");
        Ok(())
    }
}

pub fn render_form(ssids: &[String]) -> String {
    let mut body = String::from(FORM_START);
    for ssid in ssids {
        let ssid = escape_html(ssid);
        let _ = write!(body, "<option value=\"{ssid}\">{ssid}</option>");
    }
    body.push_str(FORM_END);
    body
}

impl PageHandler for WifiSetupPage {
    fn supports(&self, method: Method) -> bool {
        matches!(method, Method::GET | Method::POST)
    }

    fn handle_get<'a>(&'a self, cx: &'a mut RequestContext<'_>) -> HandlerFuture<'a> {
        Box::pin(async move {
            debug!("Wifi Setup");
            let ssids = self.wifi.scan().await?;
            cx.send_page(&render_form(&ssids)).await
        })
    }

    /// Stores the posted credentials, answers with the home page, then
    /// leaves AP mode and reboots. Nothing is changed if the form was bad.
    /// A home page that cannot be rendered is reported as an error even when
    /// the credentials were saved.
    fn handle_post<'a>(&'a self, cx: &'a mut RequestContext<'_>) -> HandlerFuture<'a> {
        Box::pin(async move {
            let rc = self.save(cx).await;
            if let Err(e) = &rc {
                error!(error = %e, "processing post failed");
            }

            let shown = cx.display_home().await;
            if let Err(e) = &shown {
                error!(error = %e, "home page not shown");
            }

            rc?;
            self.wifi.disable_ap();
            self.reboot.request_reboot();
            // The dispatcher answers 500 if the home page wrote nothing.
            shown
        })
    }
}
