//! Store contract
//!
//! A [`SessionStore`] persists [`SessionRecord`]s by id and reports its own
//! readiness through [`StoreEvents`]. Backends live under
//! [`backends`](crate::backends).
//!
//! ## Readiness
//!
//! Stores that talk to a remote service emit [`StoreEvent::Disconnect`] when
//! the connection drops and [`StoreEvent::Connect`] when it comes back. The
//! session middleware stops attaching sessions while a store is
//! disconnected.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::StoreError;
use crate::session::{Session, SessionRecord};

/// Readiness transitions a store can announce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
	Connect,
	Disconnect,
}

type Listener = Arc<dyn Fn(StoreEvent) + Send + Sync>;

/// Handle returned by [`StoreEvents::on`], used to unregister the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener registry for [`StoreEvent`]s
///
/// # Examples
///
/// ```
/// use hearth_sessions::{StoreEvent, StoreEvents};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let events = StoreEvents::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = seen.clone();
/// events.on(move |_| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// events.emit(StoreEvent::Disconnect);
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct StoreEvents {
	listeners: RwLock<Vec<(ListenerId, Listener)>>,
	next_id: AtomicU64,
}

impl StoreEvents {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a listener for every future event
	pub fn on<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(StoreEvent) + Send + Sync + 'static,
	{
		let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.listeners.write().push((id, Arc::new(listener)));
		id
	}

	/// Unregister a listener; false if it was already gone
	pub fn off(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.write();
		let before = listeners.len();
		listeners.retain(|(listener_id, _)| *listener_id != id);
		listeners.len() != before
	}

	/// Deliver `event` to all listeners
	pub fn emit(&self, event: StoreEvent) {
		// Snapshot so listeners may register others without deadlocking
		let listeners: Vec<Listener> = self
			.listeners
			.read()
			.iter()
			.map(|(_, listener)| listener.clone())
			.collect();
		for listener in listeners {
			listener(event);
		}
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.read().len()
	}
}

impl fmt::Debug for StoreEvents {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StoreEvents")
			.field("listeners", &self.listener_count())
			.finish()
	}
}

/// Session storage backend
///
/// `get` returning `Ok(None)` or [`StoreError::NotFound`] both mean "no
/// session under this id"; any other error fails the request.
///
/// # Examples
///
/// ```
/// use hearth_sessions::{MemoryStore, SessionRecord, SessionStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store.set("abc123", &SessionRecord::default()).await.unwrap();
///
/// let record = store.get("abc123").await.unwrap();
/// assert!(record.is_some());
/// # });
/// ```
#[async_trait]
pub trait SessionStore: Send + Sync {
	/// Fetch the record stored under `id`
	async fn get(&self, id: &str) -> Result<Option<SessionRecord>, StoreError>;

	/// Persist `record` under `id`, replacing whatever was there
	async fn set(&self, id: &str, record: &SessionRecord) -> Result<(), StoreError>;

	/// Remove the session stored under `id`; absent ids are not an error
	async fn destroy(&self, id: &str) -> Result<(), StoreError>;

	/// Readiness event emitter
	fn events(&self) -> &StoreEvents;

	/// Rebuild an in-memory session from a fetched record
	fn create_session(&self, id: &str, record: SessionRecord) -> Session {
		Session::from_record(id, record)
	}

	/// Refresh expiry of the session under `id` without rewriting its data
	async fn touch(&self, _id: &str, _record: &SessionRecord) -> Result<(), StoreError> {
		Err(StoreError::Unsupported("touch"))
	}

	/// Whether [`touch`](Self::touch) is implemented
	fn supports_touch(&self) -> bool {
		false
	}

	/// Every live session keyed by id
	async fn all(&self) -> Result<HashMap<String, SessionRecord>, StoreError> {
		Err(StoreError::Unsupported("all"))
	}

	/// Number of live sessions
	async fn length(&self) -> Result<usize, StoreError> {
		Err(StoreError::Unsupported("length"))
	}

	/// Remove every session
	async fn clear(&self) -> Result<(), StoreError> {
		Err(StoreError::Unsupported("clear"))
	}

	/// Process-local stores are not meant for production deployments
	fn is_memory_store(&self) -> bool {
		false
	}
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
	async fn get(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
		(**self).get(id).await
	}

	async fn set(&self, id: &str, record: &SessionRecord) -> Result<(), StoreError> {
		(**self).set(id, record).await
	}

	async fn destroy(&self, id: &str) -> Result<(), StoreError> {
		(**self).destroy(id).await
	}

	fn events(&self) -> &StoreEvents {
		(**self).events()
	}

	fn create_session(&self, id: &str, record: SessionRecord) -> Session {
		(**self).create_session(id, record)
	}

	async fn touch(&self, id: &str, record: &SessionRecord) -> Result<(), StoreError> {
		(**self).touch(id, record).await
	}

	fn supports_touch(&self) -> bool {
		(**self).supports_touch()
	}

	async fn all(&self) -> Result<HashMap<String, SessionRecord>, StoreError> {
		(**self).all().await
	}

	async fn length(&self) -> Result<usize, StoreError> {
		(**self).length().await
	}

	async fn clear(&self) -> Result<(), StoreError> {
		(**self).clear().await
	}

	fn is_memory_store(&self) -> bool {
		(**self).is_memory_store()
	}
}

/// The store backing the current request, placed in request extensions
#[derive(Clone)]
pub struct SessionStoreRef(pub Arc<dyn SessionStore>);

impl fmt::Debug for SessionStoreRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SessionStoreRef").finish()
	}
}
