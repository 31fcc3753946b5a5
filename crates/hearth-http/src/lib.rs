//! # Hearth HTTP
//!
//! Request/response types and the handler/middleware abstractions that the
//! rest of Hearth plugs into.
//!
//! A request travels through a [`MiddlewareChain`] before reaching the
//! final [`Handler`]. Middleware that needs to hand per-request state to the
//! handler (the session layer, for instance) stores it in
//! [`Request::extensions`].

pub mod extensions;
pub mod middleware;
pub mod request;
pub mod response;

pub use extensions::Extensions;
pub use middleware::{FnHandler, Handler, Middleware, MiddlewareChain, handler_fn};
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export error types from hearth-core for consistency across the framework
pub use hearth_core::exception::{Error, Result};
