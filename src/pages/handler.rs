use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::config::Limits;
use crate::device::{StoreError, WifiError};
use crate::http::connection::Transport;
use crate::http::form::{self, Attribute, FormError};
use crate::http::request::{Method, Request};
use crate::http::response::{self, ResponseError};
use crate::http::writer;
use crate::pages::registry::{Page, PageRegistry};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("send failed: {0}")]
    Io(#[from] io::Error),
    #[error("form: {0}")]
    Form(#[from] FormError),
    #[error("response: {0}")]
    Response(#[from] ResponseError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("wifi: {0}")]
    Wifi(#[from] WifiError),
    #[error("{0} is not supported by this page")]
    MethodNotSupported(Method),
    #[error("no home page registered")]
    NoHomePage,
    #[error("{0}")]
    Invalid(String),
}

pub type HandlerResult = Result<(), HandlerError>;

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'a>>;

/// Behaviour behind a registered page.
///
/// A handler writes its whole response through the [`RequestContext`]. When
/// it returns an error before writing anything, the server answers `500`.
pub trait PageHandler: Send + Sync {
    /// Whether the page answers `method`. Unsupported methods get a 404.
    fn supports(&self, method: Method) -> bool;

    fn handle_get<'a>(&'a self, _cx: &'a mut RequestContext<'_>) -> HandlerFuture<'a> {
        Box::pin(async { Err(HandlerError::MethodNotSupported(Method::GET)) })
    }

    fn handle_post<'a>(&'a self, _cx: &'a mut RequestContext<'_>) -> HandlerFuture<'a> {
        Box::pin(async { Err(HandlerError::MethodNotSupported(Method::POST)) })
    }
}

/// Per-connection state handed to a page handler.
///
/// Owns nothing: it borrows the connection, the parsed request and the
/// shared registry for the duration of one dispatch.
pub struct RequestContext<'a> {
    stream: &'a mut (dyn Transport + 'static),
    request: &'a Request,
    page: &'a Page,
    registry: &'a PageRegistry,
    limits: &'a Limits,
    responded: bool,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        stream: &'a mut (dyn Transport + 'static),
        request: &'a Request,
        page: &'a Page,
        registry: &'a PageRegistry,
        limits: &'a Limits,
    ) -> Self {
        Self {
            stream,
            request,
            page,
            registry,
            limits,
            responded: false,
        }
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn page(&self) -> &Page {
        self.page
    }

    /// Declared body length of this request.
    pub fn content_length(&self) -> usize {
        self.request.content_length
    }

    /// Whether any response bytes have been written on this connection.
    pub fn responded(&self) -> bool {
        self.responded
    }

    /// Writes raw response bytes.
    pub async fn send_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.responded = true;
        writer::send_all(&mut *self.stream, buf, self.limits.send_chunk).await
    }

    /// Builds the `200 OK` head, HTML title and menu for a body of `body_len` bytes.
    pub fn header_200(&self, body_len: usize, title: &str) -> Result<Bytes, ResponseError> {
        let menu = self.registry.render_menu(self.limits.menu_capacity)?;
        response::build_200_header(body_len, title, &menu, self.limits.header_capacity)
    }

    /// Sends a complete page titled with this page's title.
    pub async fn send_page(&mut self, body: &str) -> HandlerResult {
        let header = self.header_200(body.len(), self.page.title())?;
        self.send_all(&header).await?;
        self.send_all(body.as_bytes()).await?;
        Ok(())
    }

    /// Reads the request body into `attrs`.
    pub async fn read_form(&mut self, attrs: &mut [Attribute]) -> Result<(), FormError> {
        form::read_form(&mut *self.stream, self.request.content_length, attrs).await
    }

    /// Renders the home page on this connection, or a 404 if there is none.
    pub async fn display_home(&mut self) -> HandlerResult {
        let registry = self.registry;
        match registry.home_page() {
            Some(home) if home.handler().supports(Method::GET) => {
                let mut cx = RequestContext {
                    stream: &mut *self.stream,
                    request: self.request,
                    page: home,
                    registry,
                    limits: self.limits,
                    responded: self.responded,
                };
                let rc = home.handler().handle_get(&mut cx).await;
                self.responded |= cx.responded;
                rc
            }
            _ => {
                debug!("No Home Page");
                self.send_all(response::not_found()).await?;
                Err(HandlerError::NoHomePage)
            }
        }
    }
}
