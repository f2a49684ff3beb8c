//! Page registry and the handler abstraction pages implement.
//!
//! Collaborators register pages at startup. Each page has a unique path, a
//! title used in the navigation menu, optional home / captive-portal roles,
//! and a [`PageHandler`] that renders GET requests and consumes POSTed forms.

pub mod handler;
pub mod registry;

pub use handler::{HandlerError, HandlerFuture, HandlerResult, PageHandler, RequestContext};
pub use registry::{Page, PageFlags, PageRegistry, RegistryError};
