use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::config::Limits;
use crate::http::request::{MAX_PATH_LEN, Method, Request};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("connection closed by peer")]
    PeerClosed,
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error("header terminator not seen yet")]
    Incomplete,
    #[error("request target longer than {MAX_PATH_LEN} bytes")]
    PathTooLong,
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("invalid Content-Length header")]
    InvalidContentLength,
    #[error("request header exceeds {0} bytes")]
    HeaderTooLarge(usize),
    #[error("declared body exceeds {0} bytes")]
    BodyTooLarge(usize),
}

impl ParseError {
    /// True when the client sent bytes we refuse, as opposed to the transport failing.
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            ParseError::PeerClosed | ParseError::Io(_) | ParseError::Incomplete
        )
    }
}

/// Matched case-insensitively. The leading CRLF anchors it to the start of a header line.
const CONTENT_LENGTH: &[u8] = b"\r\ncontent-length: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathState {
    Pending,
    Reading,
    Done,
}

/// Incremental request header parser fed one byte at a time.
///
/// Four scanners run over every byte:
///
/// - method detection on the first five bytes (`GET ` / `POST `)
/// - target extraction from the end of the method up to the next space
/// - a `Content-Length: ` matcher followed by a decimal accumulator
/// - the `\r\n\r\n` terminator, which ends the header
///
/// Every buffer is bounded; exceeding a bound is an error, never a truncation.
#[derive(Debug)]
pub struct RequestParser {
    index: usize,
    method_buf: [u8; 5],
    method: Method,
    path: Vec<u8>,
    path_state: PathState,
    cl_matched: usize,
    cl_reading: bool,
    cl_digits: usize,
    cl_trailing: bool,
    cl_seen: bool,
    content_length: usize,
    terminator: u8,
    max_header_bytes: usize,
    max_body_bytes: usize,
}

impl RequestParser {
    pub fn new(limits: &Limits) -> Self {
        Self {
            index: 0,
            method_buf: [0; 5],
            method: Method::UNKNOWN,
            path: Vec::with_capacity(MAX_PATH_LEN),
            path_state: PathState::Pending,
            cl_matched: 0,
            cl_reading: false,
            cl_digits: 0,
            cl_trailing: false,
            cl_seen: false,
            content_length: 0,
            terminator: 0,
            max_header_bytes: limits.max_header_bytes,
            max_body_bytes: limits.max_body_bytes,
        }
    }

    /// Consumes one byte. Returns `Ok(true)` once the blank line ending the
    /// header has been seen; the caller then calls [`finish`](Self::finish).
    pub fn push(&mut self, c: u8) -> Result<bool, ParseError> {
        if self.index >= self.max_header_bytes {
            return Err(ParseError::HeaderTooLarge(self.max_header_bytes));
        }

        if self.index < self.method_buf.len() {
            self.method_buf[self.index] = c;
        }
        if self.path_state == PathState::Pending {
            if self.index == 4 && &self.method_buf[..4] == b"GET " {
                self.method = Method::GET;
                self.path_state = PathState::Reading;
            } else if self.index == 5 && &self.method_buf == b"POST " {
                self.method = Method::POST;
                self.path_state = PathState::Reading;
            }
        }
        if self.path_state == PathState::Reading {
            self.push_path(c)?;
        }

        self.scan_content_length(c)?;

        self.index += 1;
        Ok(self.scan_terminator(c))
    }

    fn push_path(&mut self, c: u8) -> Result<(), ParseError> {
        match c {
            b' ' => {
                self.path_state = PathState::Done;
                debug!(path = %String::from_utf8_lossy(&self.path), "request target");
            }
            b'\r' | b'\n' => return Err(ParseError::MalformedRequestLine),
            _ => {
                if self.path.len() == MAX_PATH_LEN {
                    return Err(ParseError::PathTooLong);
                }
                self.path.push(c);
            }
        }
        Ok(())
    }

    fn scan_content_length(&mut self, c: u8) -> Result<(), ParseError> {
        if self.cl_reading {
            match c {
                b'\r' => {
                    if self.cl_digits == 0 {
                        return Err(ParseError::InvalidContentLength);
                    }
                    self.cl_reading = false;
                    debug!(content_length = self.content_length, "content length");
                }
                b'0'..=b'9' => {
                    if self.cl_trailing {
                        return Err(ParseError::InvalidContentLength);
                    }
                    self.cl_digits += 1;
                    self.content_length = self
                        .content_length
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(usize::from(c - b'0')))
                        .ok_or(ParseError::InvalidContentLength)?;
                    if self.content_length > self.max_body_bytes {
                        return Err(ParseError::BodyTooLarge(self.max_body_bytes));
                    }
                }
                // Whitespace may only surround the digits.
                b' ' | b'\t' => self.cl_trailing = self.cl_digits > 0,
                _ => return Err(ParseError::InvalidContentLength),
            }
        }

        if c.eq_ignore_ascii_case(&CONTENT_LENGTH[self.cl_matched]) {
            self.cl_matched += 1;
            if self.cl_matched == CONTENT_LENGTH.len() {
                if self.cl_seen {
                    return Err(ParseError::InvalidContentLength);
                }
                self.cl_seen = true;
                self.cl_reading = true;
                self.cl_matched = 0;
            }
        } else {
            // '\r' only occurs at the head of the literal, so it is the only restart point.
            self.cl_matched = usize::from(c == b'\r');
        }
        Ok(())
    }

    fn scan_terminator(&mut self, c: u8) -> bool {
        self.terminator = match (self.terminator, c) {
            (0, b'\r') => 1,
            (1, b'\n') => 2,
            (2, b'\r') => 3,
            (3, b'\n') => return true,
            _ => 0,
        };
        false
    }

    /// Builds the request once the terminator was seen.
    pub fn finish(self) -> Result<Request, ParseError> {
        if self.method != Method::UNKNOWN && self.path_state != PathState::Done {
            return Err(ParseError::MalformedRequestLine);
        }
        let path = String::from_utf8(self.path).map_err(|_| ParseError::MalformedRequestLine)?;
        Ok(Request {
            method: self.method,
            path,
            content_length: self.content_length,
        })
    }
}

/// Parses a complete header held in memory.
///
/// Returns the request and the number of bytes consumed, i.e. the offset of
/// the first body byte.
pub fn parse_header(buf: &[u8], limits: &Limits) -> Result<(Request, usize), ParseError> {
    let mut parser = RequestParser::new(limits);
    for (i, &c) in buf.iter().enumerate() {
        if parser.push(c)? {
            return Ok((parser.finish()?, i + 1));
        }
    }
    Err(ParseError::Incomplete)
}

/// Reads a request header from the connection one byte at a time.
///
/// Bytes after the header terminator are left unread on the stream.
pub async fn read_request<S>(stream: &mut S, limits: &Limits) -> Result<Request, ParseError>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut parser = RequestParser::new(limits);
    loop {
        let c = recv_byte(stream).await?.ok_or(ParseError::PeerClosed)?;
        if parser.push(c)? {
            return parser.finish();
        }
    }
}

/// Receives a single byte, retrying transient errors. `None` means the peer closed.
pub(crate) async fn recv_byte<S>(stream: &mut S) -> io::Result<Option<u8>>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut byte = [0u8; 1];
    loop {
        match stream.read(&mut byte).await {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if is_transient(&e) => {
                debug!(error = %e, "try again");
            }
            Err(e) => return Err(e),
        }
    }
}

pub(crate) fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_header(req, &Limits::default()).unwrap();

        assert_eq!(parsed.method, Method::GET);
        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.content_length, 0);
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn content_length_matcher_restarts_after_partial_match() {
        let req = b"POST /x HTTP/1.1\r\nContent-Type: text/plain\r\nContent-Length: 12\r\n\r\n";

        let (parsed, _) = parse_header(req, &Limits::default()).unwrap();

        assert_eq!(parsed.content_length, 12);
    }

    #[test]
    fn terminator_requires_strict_sequence() {
        let mut parser = RequestParser::new(&Limits::default());
        for &c in b"GET / HTTP/1.1\r\n\r\r\n" {
            assert!(!parser.push(c).unwrap());
        }
        for &c in b"\r\n\r" {
            assert!(!parser.push(c).unwrap());
        }
        assert!(parser.push(b'\n').unwrap());
    }
}
