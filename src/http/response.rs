use std::sync::LazyLock;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// HTTP status codes the server emits.
///
/// - `Ok` (200): a page was rendered
/// - `BadRequest` (400): the request header could not be parsed
/// - `NotFound` (404): no registered page serves the target
/// - `InternalServerError` (500): the page handler failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use onboard::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    pub fn status_line(&self) -> String {
        format!(
            "{} {} {}\r\n",
            HTTP_VERSION,
            self.as_u16(),
            self.reason_phrase()
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("menu does not fit in {0} bytes")]
    MenuTooLarge(usize),
    #[error("response header of {needed} bytes does not fit in {capacity} bytes")]
    HeaderTooLarge { needed: usize, capacity: usize },
}

const HTTP_VERSION: &str = "HTTP/1.1";

const CONTENT_TYPE: &str = "Content-Type: text/html; charset=UTF-8\r\n";
const HEAD_START: &str = "<html>\n<head>\n<title>";
const HEAD_END: &str = "</title>\n</head>\n<body>\n";

/// Composes the `200 OK` response head for a page: status line, headers,
/// the HTML head carrying `title`, and the navigation `menu`.
///
/// `body_len` is the length of the page body the caller sends afterwards;
/// the advertised `Content-Length` covers the HTML head and menu as well.
/// Fails instead of truncating when the result would exceed `capacity`.
pub fn build_200_header(
    body_len: usize,
    title: &str,
    menu: &str,
    capacity: usize,
) -> Result<Bytes, ResponseError> {
    let content_length = body_len + HEAD_START.len() + title.len() + HEAD_END.len() + menu.len();
    let status = StatusCode::Ok.status_line();
    let length_line = format!("Content-Length: {content_length}\r\n");

    let needed = status.len()
        + length_line.len()
        + CONTENT_TYPE.len()
        + 2
        + HEAD_START.len()
        + title.len()
        + HEAD_END.len()
        + menu.len();
    if needed > capacity {
        return Err(ResponseError::HeaderTooLarge { needed, capacity });
    }

    let mut buf = BytesMut::with_capacity(needed);
    buf.put_slice(status.as_bytes());
    buf.put_slice(length_line.as_bytes());
    buf.put_slice(CONTENT_TYPE.as_bytes());
    buf.put_slice(b"\r\n");
    buf.put_slice(HEAD_START.as_bytes());
    buf.put_slice(title.as_bytes());
    buf.put_slice(HEAD_END.as_bytes());
    buf.put_slice(menu.as_bytes());
    Ok(buf.freeze())
}

fn fixed_response(status: StatusCode) -> Vec<u8> {
    let code = status.as_u16();
    let reason = status.reason_phrase();
    let body = format!(
        "<html><head><title>{code} {reason}</title></head>\n<body><center><h1>{code} {reason}</h1></center></body></html>"
    );
    format!(
        "{}Content-Length: {}\r\n{}Connection: close\r\n\r\n{}",
        status.status_line(),
        body.len(),
        CONTENT_TYPE,
        body
    )
    .into_bytes()
}

static BAD_REQUEST: LazyLock<Vec<u8>> = LazyLock::new(|| fixed_response(StatusCode::BadRequest));
static NOT_FOUND: LazyLock<Vec<u8>> = LazyLock::new(|| fixed_response(StatusCode::NotFound));
static INTERNAL_ERROR: LazyLock<Vec<u8>> =
    LazyLock::new(|| fixed_response(StatusCode::InternalServerError));

/// The fixed `400 Bad Request` response.
pub fn bad_request() -> &'static [u8] {
    &BAD_REQUEST
}

/// The fixed `404 Not Found` response.
pub fn not_found() -> &'static [u8] {
    &NOT_FOUND
}

/// The fixed `500 Internal Server Error` response.
pub fn internal_error() -> &'static [u8] {
    &INTERNAL_ERROR
}
