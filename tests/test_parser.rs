use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use onboard::config::Limits;
use onboard::http::parser::{ParseError, parse_header, read_request};
use onboard::http::request::Method;
use tokio::io::{AsyncRead, ReadBuf};

#[test]
fn test_parse_simple_get_request() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let (parsed, consumed) = parse_header(req, &Limits::default()).unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.path, "/");
    assert_eq!(parsed.content_length, 0);
    assert_eq!(consumed, req.len());
}

#[test]
fn test_parse_post_request_leaves_body() {
    let req = b"POST /setwifi.html HTTP/1.1\r\nHost: 192.168.1.1\r\nContent-Length: 5\r\n\r\nhello";
    let (parsed, consumed) = parse_header(req, &Limits::default()).unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.path, "/setwifi.html");
    assert_eq!(parsed.content_length, 5);
    assert_eq!(&req[consumed..], b"hello");
}

#[test]
fn test_parse_content_length_header_case_insensitive() {
    let req = b"POST /a HTTP/1.1\r\ncontent-length: 42\r\n\r\n";
    let (parsed, _) = parse_header(req, &Limits::default()).unwrap();

    assert_eq!(parsed.content_length, 42);
}

#[test]
fn test_parse_content_length_only_at_line_start() {
    let req = b"POST /a HTTP/1.1\r\nX-Content-Length: 9\r\n\r\n";
    let (parsed, _) = parse_header(req, &Limits::default()).unwrap();

    assert_eq!(parsed.content_length, 0);
}

#[test]
fn test_parse_request_with_path_and_query_string() {
    let req = b"GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let (parsed, _) = parse_header(req, &Limits::default()).unwrap();

    assert_eq!(parsed.path, "/search?q=rust");
}

#[test]
fn test_parse_incomplete_request_missing_blank_line() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n";
    let result = parse_header(req, &Limits::default());

    assert!(matches!(result, Err(ParseError::Incomplete)));
}

#[test]
fn test_parse_unknown_method() {
    let req = b"PUT /x HTTP/1.1\r\n\r\n";
    let (parsed, _) = parse_header(req, &Limits::default()).unwrap();

    assert_eq!(parsed.method, Method::UNKNOWN);
    assert_eq!(parsed.path, "");
}

#[test]
fn test_parse_path_at_limit() {
    let path = format!("/{}", "a".repeat(30));
    let req = format!("GET {path} HTTP/1.1\r\n\r\n");
    let (parsed, _) = parse_header(req.as_bytes(), &Limits::default()).unwrap();

    assert_eq!(parsed.path, path);
}

#[test]
fn test_parse_path_too_long_is_rejected() {
    let req = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(31));
    let result = parse_header(req.as_bytes(), &Limits::default());

    assert!(matches!(result, Err(ParseError::PathTooLong)));
}

#[test]
fn test_parse_request_line_without_version() {
    let result = parse_header(b"GET /abc\r\n\r\n", &Limits::default());

    assert!(matches!(result, Err(ParseError::MalformedRequestLine)));
}

#[test]
fn test_parse_invalid_content_length() {
    let limits = Limits::default();

    for req in [
        &b"POST /a HTTP/1.1\r\nContent-Length: 1x\r\n\r\n"[..],
        &b"POST /a HTTP/1.1\r\nContent-Length: \r\n\r\n"[..],
        &b"POST /a HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n"[..],
        &b"POST /a HTTP/1.1\r\nContent-Length: 1 2\r\n\r\n"[..],
        &b"POST /a HTTP/1.1\r\nContent-Length: 1\t2\r\n\r\n"[..],
    ] {
        assert!(matches!(
            parse_header(req, &limits),
            Err(ParseError::InvalidContentLength)
        ));
    }
}

#[test]
fn test_parse_content_length_surrounding_whitespace() {
    let req = b"POST /a HTTP/1.1\r\nContent-Length:  12 \t\r\n\r\n";

    let (parsed, _) = parse_header(req, &Limits::default()).unwrap();

    assert_eq!(parsed.content_length, 12);
}

#[test]
fn test_parse_body_over_limit() {
    let limits = Limits {
        max_body_bytes: 100,
        ..Limits::default()
    };
    let result = parse_header(b"POST /a HTTP/1.1\r\nContent-Length: 101\r\n\r\n", &limits);

    assert!(matches!(result, Err(ParseError::BodyTooLarge(100))));
}

#[test]
fn test_parse_header_over_limit() {
    let limits = Limits {
        max_header_bytes: 32,
        ..Limits::default()
    };
    let req = b"GET / HTTP/1.1\r\nHost: a-rather-long-host.example\r\n\r\n";
    let result = parse_header(req, &limits);

    assert!(matches!(result, Err(ParseError::HeaderTooLarge(32))));
}

#[test]
fn test_malformed_classification() {
    assert!(ParseError::PathTooLong.is_malformed());
    assert!(ParseError::InvalidContentLength.is_malformed());
    assert!(!ParseError::PeerClosed.is_malformed());
    assert!(!ParseError::Io(io::ErrorKind::ConnectionReset.into()).is_malformed());
}

#[tokio::test]
async fn test_read_request_stops_at_header_end() {
    let mut input: &[u8] = b"POST /setwifi.html HTTP/1.1\r\nContent-Length: 6\r\n\r\nssid=x";
    let parsed = read_request(&mut input, &Limits::default()).await.unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.content_length, 6);
    assert_eq!(input, b"ssid=x");
}

#[tokio::test]
async fn test_read_request_peer_closed() {
    let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\n";
    let result = read_request(&mut input, &Limits::default()).await;

    assert!(matches!(result, Err(ParseError::PeerClosed)));
}

/// Yields `Interrupted` once, then `WouldBlock`-free reads from `data`.
struct FlakyReader {
    data: &'static [u8],
    interrupted: bool,
}

impl AsyncRead for FlakyReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.interrupted {
            self.interrupted = true;
            return Poll::Ready(Err(io::ErrorKind::Interrupted.into()));
        }
        let n = buf.remaining().min(self.data.len());
        let (head, tail) = self.data.split_at(n);
        buf.put_slice(head);
        self.data = tail;
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_read_request_retries_interrupted_receive() {
    let mut reader = FlakyReader {
        data: b"GET /index.html HTTP/1.1\r\n\r\n",
        interrupted: false,
    };
    let parsed = read_request(&mut reader, &Limits::default()).await.unwrap();

    assert_eq!(parsed.path, "/index.html");
}

#[tokio::test]
async fn test_read_request_propagates_fatal_error() {
    struct Broken;
    impl AsyncRead for Broken {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::ErrorKind::ConnectionReset.into()))
        }
    }

    let result = read_request(&mut Broken, &Limits::default()).await;

    assert!(matches!(result, Err(ParseError::Io(e)) if e.kind() == io::ErrorKind::ConnectionReset));
}
