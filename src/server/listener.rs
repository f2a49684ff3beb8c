use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::Limits;
use crate::device::WifiManager;
use crate::http::connection::Connection;
use crate::pages::PageRegistry;
use crate::server::pool::{SlotHandle, WorkerPool};

/// State shared by every listener of one server.
pub struct Shared {
    pub registry: Arc<PageRegistry>,
    pub wifi: Arc<dyn WifiManager>,
    pub limits: Limits,
    pub pool: WorkerPool,
    #[cfg(feature = "https")]
    pub tls: Option<tokio_rustls::TlsAcceptor>,
}

/// Accept loop for one address family. Runs until `shutdown` is set or the
/// task is aborted.
pub async fn run(listener: TcpListener, shared: Arc<Shared>, shutdown: Arc<AtomicBool>) {
    let local = listener.local_addr().ok();
    info!(addr = ?local, "Waiting for HTTP connections");

    while !shutdown.load(Ordering::Acquire) {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Error in accept");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let Some(slot) = shared.pool.try_acquire() else {
            warn!(%peer, "Cannot accept more connections");
            drop(socket);
            continue;
        };

        debug!(%peer, slot = slot.index(), "accepted");
        let span = info_span!("conn", %peer, slot = slot.index());
        tokio::spawn(serve(socket, slot, Arc::clone(&shared)).instrument(span));
    }

    info!(addr = ?local, "listener stopped");
}

// The slot is held until the connection is fully closed.
#[cfg(not(feature = "https"))]
async fn serve(socket: TcpStream, _slot: SlotHandle, shared: Arc<Shared>) {
    handle(BufReader::new(socket), &shared).await;
}

#[cfg(feature = "https")]
async fn serve(socket: TcpStream, _slot: SlotHandle, shared: Arc<Shared>) {
    match shared.tls.clone() {
        Some(acceptor) => match acceptor.accept(socket).await {
            Ok(stream) => handle(BufReader::new(stream), &shared).await,
            Err(e) => warn!(error = %e, "TLS handshake failed"),
        },
        None => handle(BufReader::new(socket), &shared).await,
    }
}

async fn handle<S>(stream: S, shared: &Shared)
where
    S: crate::http::connection::Transport + 'static,
{
    let conn = Connection::new(
        stream,
        Arc::clone(&shared.registry),
        Arc::clone(&shared.wifi),
        shared.limits,
    );
    let disposition = conn.run().await;
    debug!(?disposition, "connection closed");
}
