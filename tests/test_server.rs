use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use onboard::config::Config;
use onboard::device::{MemoryStore, SimulatedWifi};
use onboard::http::request::Method;
use onboard::pages::{HandlerFuture, PageFlags, PageHandler, PageRegistry, RequestContext};
use onboard::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::timeout;

/// Blocks every request until the test hands out a permit.
struct Gate {
    entered: mpsc::UnboundedSender<()>,
    permits: Arc<Semaphore>,
}

impl PageHandler for Gate {
    fn supports(&self, method: Method) -> bool {
        method == Method::GET
    }

    fn handle_get<'a>(&'a self, cx: &'a mut RequestContext<'_>) -> HandlerFuture<'a> {
        Box::pin(async move {
            let _ = self.entered.send(());
            if let Ok(permit) = self.permits.acquire().await {
                permit.forget();
            }
            cx.send_page("<p>done</p></body></html>").await
        })
    }
}

fn test_config(workers: usize) -> Config {
    let mut config = Config::default();
    config.server.port = Some(0);
    config.server.bind_v4 = "127.0.0.1".to_string();
    config.server.workers = workers;
    config
}

fn wifi() -> Arc<SimulatedWifi> {
    Arc::new(SimulatedWifi::new(
        Vec::new(),
        Arc::new(MemoryStore::with_wifi_domain()),
    ))
}

async fn get(addr: SocketAddr, path: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("GET {path} HTTP/1.1\r\nHost: test\r\n\r\n").as_bytes())
        .await
        .unwrap();
    stream
}

async fn read_response(mut stream: TcpStream) -> String {
    let mut buf = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .unwrap()
        .unwrap();
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn test_server_serves_page() {
    let mut registry = PageRegistry::new("Onboarding", 16);
    let (entered, _rx) = mpsc::unbounded_channel();
    let permits = Arc::new(Semaphore::new(Semaphore::MAX_PERMITS));
    registry
        .register("/page", "Page", Arc::new(Gate { entered, permits }), PageFlags::NONE)
        .unwrap();

    let handle = Server::new(test_config(3), registry, wifi())
        .start()
        .await
        .unwrap();
    let addr = handle.local_addrs()[0];
    assert!(addr.is_ipv4());

    let response = read_response(get(addr, "/page").await).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("<p>done</p></body></html>"));

    let response = read_response(get(addr, "/nope").await).await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));

    handle.stop();
}

#[tokio::test]
async fn test_server_drops_connections_when_pool_is_full() {
    let mut registry = PageRegistry::new("Onboarding", 16);
    let (entered, mut entered_rx) = mpsc::unbounded_channel();
    let permits = Arc::new(Semaphore::new(0));
    registry
        .register(
            "/slow",
            "Slow",
            Arc::new(Gate {
                entered,
                permits: permits.clone(),
            }),
            PageFlags::NONE,
        )
        .unwrap();

    let handle = Server::new(test_config(2), registry, wifi())
        .start()
        .await
        .unwrap();
    let addr = handle.local_addrs()[0];

    let first = get(addr, "/slow").await;
    let second = get(addr, "/slow").await;
    for _ in 0..2 {
        timeout(Duration::from_secs(5), entered_rx.recv())
            .await
            .unwrap()
            .unwrap();
    }
    assert_eq!(handle.pool().in_use(), 2);

    // No free slot: the third connection is closed without a response.
    let mut third = TcpStream::connect(addr).await.unwrap();
    let mut buf = Vec::new();
    let _ = timeout(Duration::from_secs(5), third.read_to_end(&mut buf))
        .await
        .unwrap();
    assert!(buf.is_empty());

    permits.add_permits(2);
    for stream in [first, second] {
        let response = read_response(stream).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    timeout(Duration::from_secs(5), async {
        while handle.pool().in_use() != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    permits.add_permits(1);
    let response = read_response(get(addr, "/slow").await).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));

    handle.stop();
}

#[tokio::test]
async fn test_server_rejects_credentials_without_tls_support() {
    if cfg!(feature = "https") {
        return;
    }
    let credentials = onboard::device::Credentials {
        ca_cert: None,
        server_cert: b"cert".to_vec(),
        private_key: b"key".to_vec(),
    };

    let result = Server::new(test_config(1), PageRegistry::new("Onboarding", 16), wifi())
        .with_credentials(credentials)
        .start()
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_server_run_until_returns_after_shutdown() {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = Server::new(test_config(1), PageRegistry::new("Onboarding", 16), wifi());

    let task = tokio::spawn(server.run_until(async {
        let _ = rx.await;
    }));
    tx.send(()).unwrap();

    timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
