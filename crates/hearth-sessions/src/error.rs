//! Session error types
//!
//! Three layers, matching when each can happen:
//!
//! - [`ConfigError`]: raised while building a [`SessionMiddleware`](crate::SessionMiddleware),
//!   never during request handling.
//! - [`StoreError`]: returned by [`SessionStore`](crate::SessionStore) implementations.
//! - [`SessionError`]: everything the lifecycle engine and
//!   [`SessionHandle`](crate::SessionHandle) can report for a single request.

use thiserror::Error;

/// Construction-time configuration errors
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("unset option must be \"destroy\" or \"keep\", got \"{0}\"")]
	InvalidUnset(String),

	#[error("secret option array must contain one or more strings")]
	EmptySecret,

	#[error("invalid session settings: {0}")]
	Parse(String),

	#[error("cookie max age of {0:?} is out of range")]
	MaxAgeOutOfRange(std::time::Duration),

	#[error("invalid session header name \"{0}\"")]
	InvalidHeaderName(String),
}

/// Errors reported by session stores
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
	/// No session is stored under this id; treated like "no data"
	#[error("session not found: {0}")]
	NotFound(String),

	#[error("store backend error: {0}")]
	Backend(String),

	#[error("store serialization error: {0}")]
	Serialization(String),

	#[error("store does not support {0}")]
	Unsupported(&'static str),
}

impl StoreError {
	/// Whether this error means "nothing stored" rather than a failure
	pub fn is_not_found(&self) -> bool {
		matches!(self, StoreError::NotFound(_))
	}
}

impl From<serde_json::Error> for StoreError {
	fn from(error: serde_json::Error) -> Self {
		StoreError::Serialization(error.to_string())
	}
}

/// Per-request session errors
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Store(#[from] StoreError),

	/// Session data could not be serialized for fingerprinting or storage
	#[error("session serialization failed: {0}")]
	Serialization(String),

	/// `reload` found nothing stored for the current id
	#[error("failed to load session {0}")]
	NotFound(String),

	/// The operation needs a session but the application cleared or destroyed it
	#[error("session is no longer attached to the request")]
	Detached,

	/// A transport that signs identifiers was used without any secret
	#[error("secret option required for sessions")]
	MissingSecret,
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<serde_json::Error> for SessionError {
	fn from(error: serde_json::Error) -> Self {
		SessionError::Serialization(error.to_string())
	}
}

impl From<SessionError> for hearth_core::exception::Error {
	fn from(error: SessionError) -> Self {
		use hearth_core::exception::Error;
		match error {
			SessionError::Config(e) => Error::ImproperlyConfigured(e.to_string()),
			SessionError::MissingSecret => {
				Error::ImproperlyConfigured(SessionError::MissingSecret.to_string())
			}
			SessionError::Serialization(msg) => Error::Serialization(msg),
			SessionError::NotFound(id) => Error::NotFound(format!("session {}", id)),
			SessionError::Store(StoreError::Serialization(msg)) => Error::Serialization(msg),
			other => Error::Internal(other.to_string()),
		}
	}
}
