//! The session as request handlers see it
//!
//! Handlers never hold a bare [`Session`]. They get a [`SessionHandle`] from
//! the request extensions, which wraps the session together with the
//! per-request [`Tracker`] and the store. Because `save` and `reload` go
//! through the handle, the middleware always knows what was explicitly
//! persisted, even after `reload` swaps the whole session object.

use hearth_http::Request;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::IdGenerator;
use crate::cookie::SessionCookie;
use crate::error::{SessionError, SessionResult};
use crate::hash::fingerprint;
use crate::lifecycle::Tracker;
use crate::session::Session;
use crate::store::{SessionStore, SessionStoreRef};

#[derive(Debug, Clone)]
pub(crate) struct HandleState {
	/// Id the request is working with; survives `unset` and `destroy`
	pub(crate) session_id: String,
	pub(crate) session: Option<Session>,
	/// The application already removed this id from the store
	pub(crate) destroyed: bool,
	pub(crate) tracker: Tracker,
}

struct HandleInner {
	state: Mutex<HandleState>,
	store: Arc<dyn SessionStore>,
	generate_id: IdGenerator,
	request_head: Request,
	max_age: Option<Duration>,
}

/// Request-scoped access to the current session
///
/// Cloning is cheap and every clone sees the same session.
///
/// # Examples
///
/// ```
/// use hearth_http::{Request, Response, handler_fn};
/// use hearth_sessions::RequestSessionExt;
///
/// let counter = handler_fn(|request: Request| async move {
///     let Some(session) = request.session() else {
///         return Ok(Response::ok().with_body("no session"));
///     };
///     let views = session.get::<u64>("views").unwrap_or(0) + 1;
///     session.insert("views", views).expect("serializable");
///     Ok(Response::ok().with_body(views.to_string()))
/// });
/// # let _ = counter;
/// ```
#[derive(Clone)]
pub struct SessionHandle {
	inner: Arc<HandleInner>,
}

impl SessionHandle {
	pub(crate) fn new(
		session: Session,
		tracker: Tracker,
		store: Arc<dyn SessionStore>,
		generate_id: IdGenerator,
		request: &Request,
		max_age: Option<Duration>,
	) -> Self {
		Self {
			inner: Arc::new(HandleInner {
				state: Mutex::new(HandleState {
					session_id: session.id().to_string(),
					session: Some(session),
					destroyed: false,
					tracker,
				}),
				store,
				generate_id,
				request_head: request.head_only(),
				max_age,
			}),
		}
	}

	/// Current session id
	pub fn id(&self) -> String {
		self.inner.state.lock().session_id.clone()
	}

	/// Whether a session is still attached (not unset or destroyed)
	pub fn is_attached(&self) -> bool {
		self.inner.state.lock().session.is_some()
	}

	pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		self.read(|session| session.get(key)).flatten()
	}

	/// # Errors
	///
	/// [`SessionError::Detached`] once the session was unset or destroyed,
	/// [`SessionError::Serialization`] if `value` is not representable as JSON.
	pub fn insert<T: Serialize>(&self, key: impl Into<String>, value: T) -> SessionResult<()> {
		self.write(|session| session.insert(key, value))
			.ok_or(SessionError::Detached)?
	}

	pub fn remove(&self, key: &str) -> Option<Value> {
		self.write(|session| session.remove(key)).flatten()
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.read(|session| session.contains_key(key)).unwrap_or(false)
	}

	/// Drop all data but keep the session itself
	pub fn clear(&self) {
		self.write(Session::clear);
	}

	pub fn cookie(&self) -> Option<SessionCookie> {
		self.read(|session| session.cookie.clone())
	}

	/// Read access to a snapshot of the attached session
	///
	/// `f` runs after the handle's lock is released, so it may call back
	/// into the handle.
	pub fn with<R>(&self, f: impl FnOnce(&Session) -> R) -> Option<R> {
		let snapshot = self.inner.state.lock().session.clone();
		snapshot.as_ref().map(f)
	}

	/// Write access to the attached session
	///
	/// `f` edits a copy outside the lock and the copy replaces the session
	/// afterwards. Changes made through the handle from inside `f` are
	/// overwritten. Nothing is written back if the session was detached or
	/// regenerated meanwhile.
	pub fn with_mut<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
		let mut working = self.inner.state.lock().session.clone()?;
		let result = f(&mut working);

		let mut state = self.inner.state.lock();
		if let Some(session) = state.session.as_mut() {
			if session.id() == working.id() {
				*session = working;
			}
		}
		Some(result)
	}

	fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> Option<R> {
		self.inner.state.lock().session.as_ref().map(f)
	}

	fn write<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
		self.inner.state.lock().session.as_mut().map(f)
	}

	/// Refresh the session's expiry
	pub fn touch(&self) -> SessionResult<()> {
		self.write(Session::touch).ok_or(SessionError::Detached)
	}

	/// Persist the session now
	///
	/// The state being written is remembered, so the end-of-request pass
	/// will not write it again unless it changes afterwards.
	pub async fn save(&self) -> SessionResult<()> {
		let (id, record) = {
			let mut state = self.inner.state.lock();
			let session = state.session.as_ref().ok_or(SessionError::Detached)?;
			let current = fingerprint(session)?;
			let snapshot = (session.id().to_string(), session.to_record());
			state.tracker.mark_saved(current);
			snapshot
		};

		debug!(session_id = %id, "saving session");
		self.inner.store.set(&id, &record).await?;
		Ok(())
	}

	/// Replace the session with what the store currently holds
	///
	/// # Errors
	///
	/// [`SessionError::NotFound`] if nothing is stored under the current id.
	pub async fn reload(&self) -> SessionResult<()> {
		let id = self.id();
		debug!(session_id = %id, "reloading session");

		let record = self
			.inner
			.store
			.get(&id)
			.await?
			.ok_or_else(|| SessionError::NotFound(id.clone()))?;
		let session = self.inner.store.create_session(&id, record);

		let mut state = self.inner.state.lock();
		state.session = Some(session);
		state.destroyed = false;
		Ok(())
	}

	/// Destroy the current session and start a new one under a fresh id
	pub async fn regenerate(&self) -> SessionResult<()> {
		let old_id = self.id();
		self.inner.store.destroy(&old_id).await?;

		let new_id = (self.inner.generate_id)(&self.inner.request_head);
		debug!(old_id = %old_id, session_id = %new_id, "regenerated session");

		let mut state = self.inner.state.lock();
		state.session = Some(Session::new(
			new_id.clone(),
			SessionCookie::new(self.inner.max_age),
		));
		state.session_id = new_id;
		state.destroyed = false;
		Ok(())
	}

	/// Delete the session from the store and detach it from the request
	pub async fn destroy(&self) -> SessionResult<()> {
		let id = self.id();
		debug!(session_id = %id, "destroying session");
		self.inner.store.destroy(&id).await?;

		let mut state = self.inner.state.lock();
		state.session = None;
		state.destroyed = true;
		Ok(())
	}

	/// Detach the session without any store I/O
	///
	/// What happens to the stored copy at the end of the request depends on
	/// the configured [`UnsetPolicy`](crate::UnsetPolicy).
	pub fn unset(&self) {
		self.inner.state.lock().session = None;
	}

	pub(crate) fn snapshot(&self) -> HandleState {
		self.inner.state.lock().clone()
	}

	pub(crate) fn mark_saved(&self, session: &Session) -> SessionResult<()> {
		let current = fingerprint(session)?;
		self.inner.state.lock().tracker.mark_saved(current);
		Ok(())
	}

	/// Write back the expiry refreshed during finalization
	pub(crate) fn store_cookie(&self, cookie: SessionCookie) {
		if let Some(session) = self.inner.state.lock().session.as_mut() {
			session.cookie = cookie;
		}
	}
}

impl fmt::Debug for SessionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("SessionHandle")
			.field("session_id", &state.session_id)
			.field("attached", &state.session.is_some())
			.field("destroyed", &state.destroyed)
			.finish()
	}
}

/// Session access on [`Request`]
pub trait RequestSessionExt {
	/// The session attached by [`SessionMiddleware`](crate::SessionMiddleware), if any
	fn session(&self) -> Option<SessionHandle>;

	/// The store backing the attached session
	fn session_store(&self) -> Option<SessionStoreRef>;
}

impl RequestSessionExt for Request {
	fn session(&self) -> Option<SessionHandle> {
		self.extensions.get::<SessionHandle>()
	}

	fn session_store(&self) -> Option<SessionStoreRef> {
		self.extensions.get::<SessionStoreRef>()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::MemoryStore;
	use crate::id::generate_session_id;
	use rstest::{fixture, rstest};
	use serde_json::json;

	struct Setup {
		store: Arc<MemoryStore>,
		handle: SessionHandle,
	}

	#[fixture]
	fn setup() -> Setup {
		let store = Arc::new(MemoryStore::new());
		let mut session = Session::new("abc123", SessionCookie::default());
		session.insert("views", 1).unwrap();
		let tracker = Tracker::new(&session, Some("abc123".to_string())).unwrap();
		let request = Request::builder().build().unwrap();
		let generator: IdGenerator = Arc::new(|_: &Request| generate_session_id());
		let handle = SessionHandle::new(session, tracker, store.clone(), generator, &request, None);
		Setup { store, handle }
	}

	#[rstest]
	#[tokio::test]
	async fn test_save_records_fingerprint_and_writes(setup: Setup) {
		// Arrange
		setup.handle.insert("views", 2).unwrap();

		// Act
		setup.handle.save().await.unwrap();

		// Assert
		let state = setup.handle.snapshot();
		let session = state.session.unwrap();
		assert!(state.tracker.is_saved(&session).unwrap());
		let stored = setup.store.get("abc123").await.unwrap().unwrap();
		assert_eq!(stored.data["views"], json!(2));
	}

	#[rstest]
	#[tokio::test]
	async fn test_reload_replaces_session_and_keeps_tracking(setup: Setup) {
		// Arrange
		let mut record = crate::SessionRecord::default();
		record.data.insert("views".into(), json!(10));
		setup.store.set("abc123", &record).await.unwrap();
		setup.handle.insert("views", 3).unwrap();

		// Act
		setup.handle.reload().await.unwrap();
		setup.handle.insert("views", 11).unwrap();
		setup.handle.save().await.unwrap();

		// Assert
		assert_eq!(setup.handle.get::<u32>("views"), Some(11));
		let state = setup.handle.snapshot();
		assert!(state.tracker.is_saved(state.session.as_ref().unwrap()).unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_reload_missing_session_fails(setup: Setup) {
		let result = setup.handle.reload().await;

		assert!(matches!(result, Err(SessionError::NotFound(id)) if id == "abc123"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_regenerate_replaces_id_and_data(setup: Setup) {
		setup.store.set("abc123", &crate::SessionRecord::default()).await.unwrap();

		setup.handle.regenerate().await.unwrap();

		assert_ne!(setup.handle.id(), "abc123");
		assert_eq!(setup.handle.id().len(), 32);
		assert!(!setup.handle.contains_key("views"));
		assert!(setup.store.get("abc123").await.unwrap().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_destroy_detaches(setup: Setup) {
		setup.handle.destroy().await.unwrap();

		assert!(!setup.handle.is_attached());
		assert!(setup.handle.snapshot().destroyed);
		assert_eq!(setup.handle.id(), "abc123");
		assert!(matches!(setup.handle.insert("a", 1), Err(SessionError::Detached)));
		assert!(matches!(setup.handle.save().await, Err(SessionError::Detached)));
	}

	#[rstest]
	fn test_unset_keeps_id(setup: Setup) {
		setup.handle.unset();

		assert!(!setup.handle.is_attached());
		assert!(!setup.handle.snapshot().destroyed);
		assert_eq!(setup.handle.get::<u32>("views"), None);
	}

	#[rstest]
	fn test_clones_share_state(setup: Setup) {
		let other = setup.handle.clone();

		other.insert("user", "alice").unwrap();

		assert_eq!(setup.handle.get::<String>("user").as_deref(), Some("alice"));
	}

	#[rstest]
	fn test_request_extension_lookup(setup: Setup) {
		let request = Request::builder().build().unwrap();
		assert!(request.session().is_none());

		request.extensions.insert(setup.handle.clone());
		request
			.extensions
			.insert(SessionStoreRef(setup.store.clone()));

		assert_eq!(request.session().map(|h| h.id()).as_deref(), Some("abc123"));
		assert!(request.session_store().is_some());
	}

	#[rstest]
	fn test_with_allows_calls_back_into_handle(setup: Setup) {
		// Act
		let seen = setup.handle.with(|session| {
			(
				session.id().to_string(),
				setup.handle.id(),
				setup.handle.get::<u32>("views"),
			)
		});

		// Assert
		assert_eq!(
			seen,
			Some(("abc123".to_string(), "abc123".to_string(), Some(1)))
		);
	}

	#[rstest]
	fn test_with_mut_applies_edit_and_allows_reentry(setup: Setup) {
		// Act
		let inside = setup.handle.with_mut(|session| {
			session.insert("views", 5).unwrap();
			setup.handle.contains_key("views")
		});

		// Assert
		assert_eq!(inside, Some(true));
		assert_eq!(setup.handle.get::<u32>("views"), Some(5));
	}

	#[rstest]
	fn test_with_mut_on_detached_session_is_none(setup: Setup) {
		setup.handle.unset();

		assert_eq!(setup.handle.with_mut(|session| session.clear()), None);
		assert!(!setup.handle.is_attached());
	}
}
