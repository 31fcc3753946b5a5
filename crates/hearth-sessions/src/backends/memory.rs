//! In-process session store
//!
//! Records are kept as JSON strings so every read hands out an independent
//! copy, the same as a remote store would. Expired sessions are dropped
//! lazily when read or enumerated.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::StoreError;
use crate::session::SessionRecord;
use crate::store::{SessionStore, StoreEvent, StoreEvents};

/// In-memory session store for testing and development
///
/// Sessions live only as long as the process and are not shared between
/// processes.
///
/// # Examples
///
/// ```
/// use hearth_sessions::{MemoryStore, SessionRecord, SessionStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store.set("abc123", &SessionRecord::default()).await.unwrap();
/// assert_eq!(store.length().await.unwrap(), 1);
///
/// store.destroy("abc123").await.unwrap();
/// assert!(store.get("abc123").await.unwrap().is_none());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
	sessions: Arc<RwLock<HashMap<String, String>>>,
	events: StoreEvents,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Announce that the store is ready
	pub fn connect(&self) {
		self.events.emit(StoreEvent::Connect);
	}

	/// Announce that the store is unavailable
	pub fn disconnect(&self) {
		self.events.emit(StoreEvent::Disconnect);
	}

	/// Decode a stored record, removing it if it has expired
	fn live_record(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
		let raw = match self.sessions.read().get(id) {
			Some(raw) => raw.clone(),
			None => return Ok(None),
		};

		let record: SessionRecord = serde_json::from_str(&raw)?;
		if record.cookie.is_expired() {
			self.remove_if_unchanged(id, &raw);
			return Ok(None);
		}
		Ok(Some(record))
	}

	/// Drop `id` only if it still holds `raw`; a concurrent `set` wins
	fn remove_if_unchanged(&self, id: &str, raw: &str) {
		let mut sessions = self.sessions.write();
		if sessions.get(id).is_some_and(|current| current == raw) {
			sessions.remove(id);
		}
	}

	fn purge_expired(&self) -> Result<HashMap<String, SessionRecord>, StoreError> {
		let mut live = HashMap::new();
		let mut sessions = self.sessions.write();
		let mut expired = Vec::new();

		for (id, raw) in sessions.iter() {
			let record: SessionRecord = serde_json::from_str(raw)?;
			if record.cookie.is_expired() {
				expired.push(id.clone());
			} else {
				live.insert(id.clone(), record);
			}
		}
		for id in expired {
			sessions.remove(&id);
		}
		Ok(live)
	}
}

#[async_trait]
impl SessionStore for MemoryStore {
	async fn get(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
		self.live_record(id)
	}

	async fn set(&self, id: &str, record: &SessionRecord) -> Result<(), StoreError> {
		let raw = serde_json::to_string(record)?;
		self.sessions.write().insert(id.to_string(), raw);
		Ok(())
	}

	async fn destroy(&self, id: &str) -> Result<(), StoreError> {
		self.sessions.write().remove(id);
		Ok(())
	}

	fn events(&self) -> &StoreEvents {
		&self.events
	}

	/// Replace only the stored cookie, keeping stored data as is
	async fn touch(&self, id: &str, record: &SessionRecord) -> Result<(), StoreError> {
		let Some(mut current) = self.live_record(id)? else {
			return Ok(());
		};
		current.cookie = record.cookie.clone();
		let raw = serde_json::to_string(&current)?;
		self.sessions.write().insert(id.to_string(), raw);
		Ok(())
	}

	fn supports_touch(&self) -> bool {
		true
	}

	async fn all(&self) -> Result<HashMap<String, SessionRecord>, StoreError> {
		self.purge_expired()
	}

	async fn length(&self) -> Result<usize, StoreError> {
		Ok(self.purge_expired()?.len())
	}

	async fn clear(&self) -> Result<(), StoreError> {
		self.sessions.write().clear();
		Ok(())
	}

	fn is_memory_store(&self) -> bool {
		true
	}
}
