/// Request methods the server distinguishes.
///
/// Only GET and POST are served. Anything else parses as `UNKNOWN` and is
/// answered with `400 Bad Request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// GET - Render a page
    GET,
    /// POST - Submit a form to a page
    POST,
    /// Request line did not start with `GET ` or `POST `
    #[default]
    UNKNOWN,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::UNKNOWN => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the parser extracted from one request header.
///
/// The body is not part of the request: it stays on the connection and is
/// consumed by the page's POST handler through the form extractor, using
/// `content_length` as the byte count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// The request method
    pub method: Method,
    /// Request target, at most [`MAX_PATH_LEN`] bytes
    pub path: String,
    /// Declared body length, 0 when no `Content-Length` header was sent
    pub content_length: usize,
}

/// Longest request target accepted (a 32 byte buffer with its terminator).
pub const MAX_PATH_LEN: usize = 31;

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            content_length: 0,
        }
    }

    pub fn with_content_length(mut self, content_length: usize) -> Self {
        self.content_length = content_length;
        self
    }

    /// A single-character target is the site root.
    pub fn is_root(&self) -> bool {
        self.path.len() == 1
    }
}
