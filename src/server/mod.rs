//! Listeners and the worker pool.
//!
//! One accept loop runs per enabled address family. Accepted connections
//! claim a slot from a pool shared by all listeners and are served on their
//! own task; when no slot is free the connection is closed immediately.

pub mod listener;
pub mod pool;
#[cfg(feature = "https")]
pub mod tls;

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::device::{Credentials, WifiManager};
use crate::pages::PageRegistry;
use crate::server::listener::Shared;
use crate::server::pool::WorkerPool;

pub use pool::SlotHandle;

pub struct Server {
    config: Config,
    registry: PageRegistry,
    wifi: Arc<dyn WifiManager>,
    credentials: Option<Credentials>,
}

impl Server {
    /// All pages must be registered in `registry` before the server starts.
    pub fn new(config: Config, registry: PageRegistry, wifi: Arc<dyn WifiManager>) -> Self {
        Self {
            config,
            registry,
            wifi,
            credentials: None,
        }
    }

    /// Serves HTTPS with the given certificate material.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Binds every enabled listener and starts accepting.
    pub async fn start(self) -> Result<ServerHandle> {
        let port = self.config.port();
        let pool = WorkerPool::new(self.config.server.workers);

        #[cfg(feature = "https")]
        let tls = self.credentials.as_ref().map(tls::acceptor).transpose()?;
        #[cfg(not(feature = "https"))]
        anyhow::ensure!(
            self.credentials.is_none(),
            "TLS credentials supplied but the `https` feature is not enabled"
        );

        let shared = Arc::new(Shared {
            registry: Arc::new(self.registry),
            wifi: self.wifi,
            limits: self.config.limits,
            pool: pool.clone(),
            #[cfg(feature = "https")]
            tls,
        });

        let mut binds = Vec::new();
        if self.config.server.ipv6 {
            binds.push(&self.config.server.bind_v6);
        }
        if self.config.server.ipv4 {
            binds.push(&self.config.server.bind_v4);
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut addrs = Vec::new();
        let mut tasks = Vec::new();
        for bind in binds {
            let ip: IpAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address {bind}"))?;
            let listener = match TcpListener::bind(SocketAddr::new(ip, port)).await {
                Ok(listener) => listener,
                // A dual-stack IPv6 socket already owns the IPv4 port.
                Err(e)
                    if ip.is_ipv4()
                        && !addrs.is_empty()
                        && e.kind() == std::io::ErrorKind::AddrInUse =>
                {
                    warn!(%ip, port, "IPv4 port already served by the IPv6 listener");
                    continue;
                }
                Err(e) => return Err(e).with_context(|| format!("binding {ip} port {port}")),
            };
            addrs.push(listener.local_addr()?);
            tasks.push(tokio::spawn(listener::run(
                listener,
                Arc::clone(&shared),
                Arc::clone(&shutdown),
            )));
        }

        info!(?addrs, workers = pool.capacity(), "web server started");
        Ok(ServerHandle {
            addrs,
            pool,
            shutdown,
            tasks,
        })
    }

    /// Serves until `shutdown` resolves, then stops.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handle = self.start().await?;
        shutdown.await;
        handle.stop();
        Ok(())
    }
}

/// A running server.
pub struct ServerHandle {
    addrs: Vec<SocketAddr>,
    pool: WorkerPool,
    shutdown: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Bound listener addresses, IPv6 first when enabled.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Stops accepting. Listener tasks are aborted; connections already being
    /// served are not drained.
    pub fn stop(self) {
        info!("Stop web server");
        self.shutdown.store(true, Ordering::Release);
        for task in &self.tasks {
            task.abort();
        }
    }
}
