//! # Hearth
//!
//! Server-side session lifecycle management for async Rust web stacks.
//!
//! Hearth decides, for every request, whether a session must be created or
//! loaded from a store, and afterwards whether it must be saved, touched or
//! destroyed. Unmodified sessions cost no store writes.
//!
//! ## Feature Flags
//!
//! - `sessions` (default) - Session middleware, stores and transports
//!
//! ## Crates
//!
//! - [`core`]: framework-wide error type
//! - [`http`]: request, response and middleware traits
//! - [`sessions`]: the session lifecycle engine
//!
//! ## Quick Example
//!
//! ```rust
//! use hearth::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let sessions = SessionMiddleware::new(
//!     SessionConfig::new()
//!         .secret("keyboard cat")
//!         .resave(false)
//!         .save_uninitialized(false),
//!     store,
//! )
//! .unwrap();
//!
//! let app = MiddlewareChain::new(Arc::new(handler_fn(|request: Request| async move {
//!     let user = request
//!         .session()
//!         .and_then(|session| session.get::<String>("user"))
//!         .unwrap_or_else(|| "anonymous".to_string());
//!     Ok(Response::ok().with_body(user))
//! })))
//! .with_middleware(Arc::new(sessions));
//! # let _ = app;
//! ```

pub use hearth_core as core;
pub use hearth_http as http;

#[cfg(feature = "sessions")]
pub use hearth_sessions as sessions;

pub use hearth_core::exception::{Error, Result};
pub use hearth_http::{Handler, Middleware, MiddlewareChain, Request, Response, handler_fn};

#[cfg(feature = "sessions")]
pub use hearth_sessions::{
	MemoryStore, RequestSessionExt, SessionConfig, SessionHandle, SessionMiddleware,
	SessionStore, UnsetPolicy,
};

/// Commonly used types
pub mod prelude {
	pub use crate::{Error, Handler, Middleware, MiddlewareChain, Request, Response, Result, handler_fn};

	#[cfg(feature = "sessions")]
	pub use crate::sessions::{
		HeaderTransport, MemoryStore, RequestSessionExt, SessionConfig, SessionHandle,
		SessionMiddleware, SessionSettings, SessionStore, SignedCookieTransport, UnsetPolicy,
	};
}
