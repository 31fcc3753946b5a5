//! Session lifecycle middleware
//!
//! For each request [`SessionMiddleware`]:
//!
//! 1. resolves a session, either generated under a fresh id or inflated
//!    from the store under the id the client presented,
//! 2. attaches a [`SessionHandle`] to the request extensions and runs the
//!    rest of the chain,
//! 3. decides whether the session must be destroyed, saved, touched or
//!    left alone, and performs that store call.
//!
//! Step 3 runs even when the handler fails, in a spawned task so that store
//! calls complete if the request future is dropped.
//!
//! While the store reports itself disconnected the middleware attaches no
//! session at all and handlers must cope with `request.session()` being
//! `None`.

use async_trait::async_trait;
use hearth_core::exception::{Error, Result};
use hearth_http::{Handler, Middleware, Request, Response};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::{IdGenerator, SessionConfig};
use crate::cookie::SessionCookie;
use crate::error::{ConfigError, SessionError, SessionResult};
use crate::handle::SessionHandle;
use crate::lifecycle::{Action, Policy, Tracker, decide};
use crate::session::{Session, SessionRecord};
use crate::store::{ListenerId, SessionStore, SessionStoreRef, StoreEvent};
use crate::transport::{RequestSecret, SessionTransport};

const PRODUCTION_WARNING: &str = "connect.session() MemoryStore is not designed for a production environment, as it will leak memory, and will not scale past a single process.";

/// Outcome of session resolution at request entry
pub enum Resolution {
	/// A session is available for this request
	Attached {
		handle: SessionHandle,
		secrets: Vec<String>,
	},
	/// Run the request without session handling
	Bypass,
}

impl fmt::Debug for Resolution {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Attached { handle, .. } => f.debug_tuple("Attached").field(handle).finish(),
			Self::Bypass => f.write_str("Bypass"),
		}
	}
}

/// What the transport must do to the response once the store work is done
#[derive(Debug, Clone, PartialEq)]
enum IdUpdate {
	Set { id: String, cookie: SessionCookie },
	Clear,
	Unchanged,
}

/// Session middleware
///
/// # Examples
///
/// ```
/// use hearth_http::{Handler, MiddlewareChain, Request, Response, handler_fn};
/// use hearth_sessions::{MemoryStore, RequestSessionExt, SessionConfig, SessionMiddleware, SessionStore};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let store = Arc::new(MemoryStore::new());
/// let config = SessionConfig::new()
///     .secret("keyboard cat")
///     .resave(false)
///     .save_uninitialized(false);
/// let sessions = SessionMiddleware::new(config, store.clone()).unwrap();
///
/// let app = MiddlewareChain::new(Arc::new(handler_fn(|request: Request| async move {
///     if let Some(session) = request.session() {
///         session.insert("user", "alice").expect("serializable");
///     }
///     Ok(Response::ok())
/// })))
/// .with_middleware(Arc::new(sessions));
///
/// let response = app.handle(Request::builder().build().unwrap()).await.unwrap();
/// let id = response.header("x-session").unwrap();
/// assert!(store.get(id).await.unwrap().is_some());
/// # });
/// ```
pub struct SessionMiddleware {
	store: Arc<dyn SessionStore>,
	transport: Arc<dyn SessionTransport>,
	generate_id: IdGenerator,
	secrets: Option<Vec<String>>,
	policy: Policy,
	max_age: Option<Duration>,
	store_touch: bool,
	ready: Arc<AtomicBool>,
	readiness_listener: ListenerId,
}

impl SessionMiddleware {
	/// Validate `config` and subscribe to the store's readiness events
	///
	/// # Errors
	///
	/// Any [`ConfigError`] from [`SessionConfig::validate`].
	pub fn new(config: SessionConfig, store: Arc<dyn SessionStore>) -> std::result::Result<Self, ConfigError> {
		config.validate()?;

		if store.is_memory_store()
			&& config.resolved_environment().as_deref() == Some("production")
		{
			warn!("{}", PRODUCTION_WARNING);
		}

		let ready = Arc::new(AtomicBool::new(true));
		let flag = ready.clone();
		let readiness_listener = store.events().on(move |event| {
			flag.store(event == StoreEvent::Connect, Ordering::Release);
		});

		Ok(Self {
			store_touch: store.supports_touch(),
			transport: config.session_transport(),
			generate_id: config.id_generator(),
			secrets: config.configured_secrets().map(<[String]>::to_vec),
			policy: Policy::from_config(&config),
			max_age: config.max_age(),
			store,
			ready,
			readiness_listener,
		})
	}

	/// Whether the store last reported itself connected
	pub fn is_ready(&self) -> bool {
		self.ready.load(Ordering::Acquire)
	}

	pub fn policy(&self) -> Policy {
		self.policy
	}

	fn request_secrets(&self, request: &Request) -> Vec<String> {
		match &self.secrets {
			Some(secrets) => secrets.clone(),
			None => request
				.extensions
				.get::<RequestSecret>()
				.map(|secret| vec![secret.0])
				.unwrap_or_default(),
		}
	}

	/// Find or create the session for `request`
	///
	/// # Errors
	///
	/// [`SessionError::MissingSecret`] if the transport signs ids and no
	/// secret is available, or the store error if fetching fails for any
	/// reason other than "not found".
	pub async fn resolve(&self, request: &Request) -> SessionResult<Resolution> {
		if request.extensions.contains::<SessionHandle>() {
			return Ok(Resolution::Bypass);
		}

		if !self.is_ready() {
			debug!("store is disconnected");
			return Ok(Resolution::Bypass);
		}

		let secrets = self.request_secrets(request);
		if secrets.is_empty() && self.transport.requires_secret() {
			return Err(SessionError::MissingSecret);
		}

		let Some(incoming) = self.transport.read_id(request, &secrets) else {
			debug!("no SID sent, generating session");
			let handle = self.generate(request, None)?;
			return Ok(Resolution::Attached { handle, secrets });
		};

		debug!(session_id = %incoming, "fetching session");
		let handle = match self.store.get(&incoming).await {
			Ok(Some(record)) => {
				debug!(session_id = %incoming, "session found");
				self.inflate(request, incoming, record)?
			}
			Ok(None) => {
				debug!(session_id = %incoming, "no session found");
				self.generate(request, Some(incoming))?
			}
			Err(e) if e.is_not_found() => {
				debug!(session_id = %incoming, "no session found");
				self.generate(request, Some(incoming))?
			}
			Err(e) => {
				debug!(session_id = %incoming, error = %e, "session fetch failed");
				return Err(e.into());
			}
		};

		Ok(Resolution::Attached { handle, secrets })
	}

	fn generate(&self, request: &Request, incoming: Option<String>) -> SessionResult<SessionHandle> {
		let id = (self.generate_id)(request);
		let session = Session::new(id, SessionCookie::new(self.max_age));
		let tracker = Tracker::new(&session, incoming)?;
		Ok(self.handle(session, tracker, request))
	}

	fn inflate(&self, request: &Request, id: String, record: SessionRecord) -> SessionResult<SessionHandle> {
		let session = self.store.create_session(&id, record);
		let mut tracker = Tracker::new(&session, Some(id))?;
		if !self.policy.resave {
			tracker.assume_saved();
		}
		Ok(self.handle(session, tracker, request))
	}

	fn handle(&self, session: Session, tracker: Tracker, request: &Request) -> SessionHandle {
		SessionHandle::new(
			session,
			tracker,
			self.store.clone(),
			self.generate_id.clone(),
			request,
			self.max_age,
		)
	}
}

impl fmt::Debug for SessionMiddleware {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionMiddleware")
			.field("policy", &self.policy)
			.field("max_age", &self.max_age)
			.field("store_touch", &self.store_touch)
			.field("ready", &self.is_ready())
			.finish_non_exhaustive()
	}
}

impl Drop for SessionMiddleware {
	fn drop(&mut self) {
		self.store.events().off(self.readiness_listener);
	}
}

/// End-of-request store work, detached from the request future
struct Finalizer {
	store: Arc<dyn SessionStore>,
	policy: Policy,
	store_touch: bool,
}

impl Finalizer {
	async fn run(self, handle: SessionHandle) -> SessionResult<IdUpdate> {
		let state = handle.snapshot();
		let decision = decide(
			&state.tracker,
			&self.policy,
			Some(state.session_id.as_str()),
			state.session.as_ref(),
		)?;

		let Some(mut session) = state.session else {
			if decision.action == Action::Destroy {
				if !state.destroyed {
					debug!(session_id = %state.session_id, "destroying session");
					self.store.destroy(&state.session_id).await?;
				}
				return Ok(IdUpdate::Clear);
			}
			return Ok(IdUpdate::Unchanged);
		};

		if matches!(decision.action, Action::Save | Action::Touch) || decision.set_id {
			session.touch();
			handle.store_cookie(session.cookie.clone());
		}

		match decision.action {
			Action::Save => {
				debug!(session_id = %session.id(), "saving session");
				self.store.set(session.id(), &session.to_record()).await?;
				handle.mark_saved(&session)?;
			}
			Action::Touch if self.store_touch => {
				debug!(session_id = %session.id(), "touching session");
				self.store.touch(session.id(), &session.to_record()).await?;
			}
			Action::Touch => {
				debug!(session_id = %session.id(), "store lacks touch, saving session");
				self.store.set(session.id(), &session.to_record()).await?;
			}
			Action::Destroy | Action::Skip => {}
		}

		if decision.set_id {
			Ok(IdUpdate::Set {
				id: session.id().to_string(),
				cookie: session.cookie,
			})
		} else {
			Ok(IdUpdate::Unchanged)
		}
	}
}

#[async_trait]
impl Middleware for SessionMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let (handle, secrets) = match self.resolve(&request).await? {
			Resolution::Bypass => return next.handle(request).await,
			Resolution::Attached { handle, secrets } => (handle, secrets),
		};

		request
			.extensions
			.insert(SessionStoreRef(self.store.clone()));
		request.extensions.insert(handle.clone());

		let result = next.handle(request).await;

		let finalizer = Finalizer {
			store: self.store.clone(),
			policy: self.policy,
			store_touch: self.store_touch,
		};
		let finalized = tokio::spawn(finalizer.run(handle))
			.await
			.map_err(|e| Error::Internal(format!("session finalization aborted: {}", e)))
			.and_then(|outcome| outcome.map_err(Error::from));

		match (result, finalized) {
			(Ok(mut response), Ok(update)) => {
				match update {
					IdUpdate::Set { id, cookie } => {
						self.transport.write_id(&mut response, &id, &cookie, &secrets)
					}
					IdUpdate::Clear => self.transport.clear_id(&mut response),
					IdUpdate::Unchanged => {}
				}
				Ok(response)
			}
			(Ok(_), Err(e)) | (Err(e), Ok(_)) => Err(e),
			(Err(e), Err(finalize_error)) => {
				error!(error = %finalize_error, "session finalization failed after handler error");
				Err(e)
			}
		}
	}
}
