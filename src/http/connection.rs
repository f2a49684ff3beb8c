use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::config::Limits;
use crate::device::WifiManager;
use crate::http::parser::{ParseError, read_request};
use crate::http::request::{Method, Request};
use crate::http::response;
use crate::http::writer::send_all;
use crate::pages::{PageRegistry, RequestContext};

/// A byte stream a connection can be served over: plain TCP, TLS, or an
/// in-memory pipe in tests.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> Transport for T {}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A page handler ran and succeeded
    Served,
    /// No page serves the target; 404 sent
    NotFound,
    /// The handler failed; 500 sent unless it had already written a response
    HandlerFailed,
    /// The header could not be parsed; 400 sent
    BadRequest,
    /// The client went away before the header was complete
    PeerClosed,
    /// A transport error ended the connection
    Failed,
}

pub enum ConnectionState {
    Parsing,
    Dispatching(Request),
    Responded(Disposition),
    Closed(Disposition),
}

/// One accepted connection: parse a single request, dispatch it to its page,
/// then close. There is no keep-alive.
pub struct Connection<S> {
    stream: S,
    registry: Arc<PageRegistry>,
    wifi: Arc<dyn WifiManager>,
    limits: Limits,
    state: ConnectionState,
}

impl<S: Transport + 'static> Connection<S> {
    pub fn new(
        stream: S,
        registry: Arc<PageRegistry>,
        wifi: Arc<dyn WifiManager>,
        limits: Limits,
    ) -> Self {
        Self {
            stream,
            registry,
            wifi,
            limits,
            state: ConnectionState::Parsing,
        }
    }

    /// Drives the connection to completion. The stream is shut down on every
    /// path, including parse failures.
    pub async fn run(mut self) -> Disposition {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Parsing) {
                ConnectionState::Parsing => {
                    self.state = match read_request(&mut self.stream, &self.limits).await {
                        Ok(request) => ConnectionState::Dispatching(request),
                        Err(ParseError::PeerClosed) => {
                            debug!("Connection closed by peer");
                            ConnectionState::Closed(Disposition::PeerClosed)
                        }
                        Err(e) if e.is_malformed() => {
                            warn!(error = %e, "rejecting request");
                            self.send_fixed(response::bad_request()).await;
                            ConnectionState::Responded(Disposition::BadRequest)
                        }
                        Err(e) => {
                            error!(error = %e, "Connection error");
                            ConnectionState::Closed(Disposition::Failed)
                        }
                    };
                }

                ConnectionState::Dispatching(request) => {
                    let disposition = self.dispatch(&request).await;
                    self.state = ConnectionState::Responded(disposition);
                }

                ConnectionState::Responded(disposition) => {
                    if let Err(e) = self.stream.shutdown().await {
                        debug!(error = %e, "shutdown failed");
                    }
                    self.state = ConnectionState::Closed(disposition);
                }

                ConnectionState::Closed(disposition) => {
                    return disposition;
                }
            }
        }
    }

    async fn dispatch(&mut self, request: &Request) -> Disposition {
        info!(method = %request.method, path = %request.path, "request");

        let registry = Arc::clone(&self.registry);
        let page = match request.method {
            Method::GET if request.is_root() => {
                let ap_active = self.wifi.has_ap();
                debug!(ap_active, "Searching for home");
                registry.find_home_or_portal(ap_active)
            }
            Method::GET | Method::POST => registry.find_by_path(&request.path),
            Method::UNKNOWN => {
                warn!("unsupported method");
                self.send_fixed(response::bad_request()).await;
                return Disposition::BadRequest;
            }
        };

        let Some(page) = page.filter(|p| p.handler().supports(request.method)) else {
            debug!(path = %request.path, "no page");
            self.send_fixed(response::not_found()).await;
            return Disposition::NotFound;
        };

        debug!(page = page.path(), "dispatching");
        let mut cx = RequestContext::new(&mut self.stream, request, page, &registry, &self.limits);
        let handler = page.handler();
        let rc = match request.method {
            Method::POST => handler.handle_post(&mut cx).await,
            _ => handler.handle_get(&mut cx).await,
        };
        let responded = cx.responded();

        match rc {
            Ok(()) => Disposition::Served,
            Err(e) => {
                error!(page = page.path(), error = %e, "page handler failed");
                if !responded {
                    self.send_fixed(response::internal_error()).await;
                }
                Disposition::HandlerFailed
            }
        }
    }

    async fn send_fixed(&mut self, buf: &[u8]) {
        if let Err(e) = send_all(&mut self.stream, buf, self.limits.send_chunk).await {
            error!(error = %e, "response send failed");
        }
    }
}
