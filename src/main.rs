use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use onboard::config::Config;
use onboard::device::{
    Credentials, KeyValueStore, MemoryStore, RebootSignal, SimulatedWifi, WifiManager,
};
use onboard::pages::PageRegistry;
use onboard::portal;
use onboard::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_wifi_domain());
    let wifi: Arc<dyn WifiManager> = Arc::new(SimulatedWifi::new(
        vec!["HomeNet".to_string(), "Office".to_string()],
        Arc::clone(&store),
    ));
    if cfg.portal.access_point {
        wifi.enable_ap();
    } else if let Err(e) = wifi.connect() {
        tracing::warn!(error = %e, "no usable WiFi credentials, starting access point");
        wifi.enable_ap();
    }
    let reboot = Arc::new(RebootSignal::new());

    let mut registry = PageRegistry::new(cfg.portal.banner.clone(), cfg.limits.max_pages);
    portal::register_pages(
        &mut registry,
        &cfg.portal.hostname,
        Arc::clone(&wifi),
        Arc::clone(&store),
        reboot.clone(),
    )
    .context("registering pages")?;

    let mut server = Server::new(cfg.clone(), registry, wifi);
    if let Some(tls) = &cfg.tls {
        server = server.with_credentials(Credentials::load(tls)?);
    }
    server
        .run_until(async {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                }

                _ = reboot.requested() => {
                    tracing::info!("Rebooting into station mode");
                }
            }
        })
        .await
}
