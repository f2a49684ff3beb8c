//! HTTP protocol implementation.
//!
//! A deliberately small HTTP/1.1 subset: GET and POST only, `Content-Length`
//! is the only header interpreted, and every connection carries exactly one
//! request. No chunked encoding, no keep-alive.
//!
//! # Architecture
//!
//! - **`connection`**: per-connection state machine; parses one request and dispatches it to a page
//! - **`parser`**: byte-at-a-time request header parser
//! - **`request`**: the parsed request (method, target, body length)
//! - **`form`**: extracts `name=value` fields from a POST body
//! - **`response`**: status codes, the `200 OK` page head, fixed error pages
//! - **`writer`**: chunked `send_all`
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Parsing   │ ← Read header bytes until \r\n\r\n
//!        └──────┬──────┘
//!               │ Request parsed          (malformed → 400, peer gone → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Resolve page, run its GET / POST handler
//!        └──────┬───────────┘
//!               │ 200 from handler, 404 no page, 500 handler error
//!               ▼
//!        ┌──────────────────┐
//!        │    Responded     │ ← Shut the stream down
//!        └──────┬───────────┘
//!               ▼
//!             Closed
//! ```

pub mod connection;
pub mod form;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
