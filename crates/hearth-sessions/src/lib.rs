//! # Hearth Sessions
//!
//! Server-side session lifecycle management for `hearth-http` middleware
//! stacks.
//!
//! [`SessionMiddleware`] decides per request whether to create a session or
//! load one from a [`SessionStore`], and afterwards whether to save, touch or
//! destroy it. Change detection compares fingerprints of the session data,
//! so an untouched session costs no store writes.
//!
//! ## Quick Start
//!
//! ```rust
//! use hearth_http::{MiddlewareChain, Request, Response, handler_fn};
//! use hearth_sessions::{MemoryStore, RequestSessionExt, SessionConfig, SessionMiddleware};
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
//!     let views = match request.session() {
//!         Some(session) => {
//!             let views = session.get::<u64>("views").unwrap_or(0) + 1;
//!             session.insert("views", views).expect("serializable");
//!             views
//!         }
//!         None => 0,
//!     };
//!     Ok(Response::ok().with_body(views.to_string()))
//! })))
//! .with_middleware(Arc::new(sessions));
//! # let _ = app;
//! ```
//!
//! ## Modules
//!
//! - [`store`]: the store contract and readiness events
//! - [`backends`]: bundled stores
//! - [`transport`]: how ids reach the client
//! - [`lifecycle`]: end-of-request decisions
//! - [`settings`]: TOML-backed configuration

pub mod backends;
pub mod config;
pub mod cookie;
pub mod error;
pub mod handle;
pub mod hash;
pub mod id;
pub mod lifecycle;
pub mod middleware;
pub mod session;
pub mod settings;
pub mod signature;
pub mod store;
pub mod transport;

pub use backends::MemoryStore;
pub use config::{IdGenerator, SessionConfig, UnsetPolicy};
pub use cookie::SessionCookie;
pub use error::{ConfigError, SessionError, SessionResult, StoreError};
pub use handle::{RequestSessionExt, SessionHandle};
pub use hash::{Fingerprint, fingerprint};
pub use id::{generate_session_id, is_well_formed_id};
pub use lifecycle::{Action, Decision, Policy, Tracker};
pub use middleware::{Resolution, SessionMiddleware};
pub use session::{Session, SessionRecord};
pub use settings::{SecretSetting, SessionSettings};
pub use store::{ListenerId, SessionStore, SessionStoreRef, StoreEvent, StoreEvents};
pub use transport::{HeaderTransport, RequestSecret, SessionTransport, SignedCookieTransport};
