//! The session entity
//!
//! A [`Session`] is the in-memory form of one user's server-side state: an
//! immutable identifier, a JSON data map, and expiry metadata. What a store
//! persists is the id-less [`SessionRecord`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cookie::SessionCookie;
use crate::error::SessionResult;

/// Serialized form of a session as held by a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
	#[serde(default)]
	pub cookie: SessionCookie,
	#[serde(default)]
	pub data: Map<String, Value>,
}

/// Per-user session state
///
/// The id is fixed for the life of the value; changing identity means
/// building a new `Session` (see [`SessionHandle::regenerate`](crate::SessionHandle::regenerate)).
///
/// # Examples
///
/// ```
/// use hearth_sessions::{Session, SessionCookie};
///
/// let mut session = Session::new("abc123", SessionCookie::default());
/// session.insert("user", "alice").unwrap();
/// assert_eq!(session.get::<String>("user").as_deref(), Some("alice"));
/// assert_eq!(session.id(), "abc123");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
	id: String,
	data: Map<String, Value>,
	/// Expiry metadata, excluded from change detection
	pub cookie: SessionCookie,
}

impl Session {
	/// Create an empty session
	pub fn new(id: impl Into<String>, cookie: SessionCookie) -> Self {
		Self {
			id: id.into(),
			data: Map::new(),
			cookie,
		}
	}

	/// Rebuild a session from what a store returned
	pub fn from_record(id: impl Into<String>, record: SessionRecord) -> Self {
		Self {
			id: id.into(),
			data: record.data,
			cookie: record.cookie,
		}
	}

	/// Snapshot suitable for handing to a store
	pub fn to_record(&self) -> SessionRecord {
		SessionRecord {
			cookie: self.cookie.clone(),
			data: self.data.clone(),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	/// Application data
	pub fn data(&self) -> &Map<String, Value> {
		&self.data
	}

	pub fn data_mut(&mut self) -> &mut Map<String, Value> {
		&mut self.data
	}

	/// Typed read; `None` when missing or of a different shape
	pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		self.data
			.get(key)
			.and_then(|v| serde_json::from_value(v.clone()).ok())
	}

	/// Store a serializable value under `key`
	///
	/// # Errors
	///
	/// Returns [`SessionError::Serialization`](crate::SessionError::Serialization)
	/// if `value` cannot be represented as JSON (e.g. a map with non-string keys).
	pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> SessionResult<()> {
		let value = serde_json::to_value(value)?;
		self.data.insert(key.into(), value);
		Ok(())
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.data.remove(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.data.contains_key(key)
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Remove all application data, keeping id and expiry
	pub fn clear(&mut self) {
		self.data.clear();
	}

	/// Renew expiry metadata without touching data
	pub fn touch(&mut self) {
		self.cookie.reset_max_age();
	}
}
