//! Framework-wide error type
//!
//! Every handler and middleware in a Hearth stack returns [`Result`], so
//! errors raised deep inside a middleware (a failed session store write, a
//! malformed configuration) travel back to the server through the same
//! channel as handler errors.

use thiserror::Error;

/// Result alias used by handlers and middleware
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced through the request pipeline
///
/// # Examples
///
/// ```
/// use hearth_core::exception::Error;
///
/// let error = Error::NotFound("session abc".to_string());
/// assert_eq!(error.to_string(), "Not found: session abc");
/// assert_eq!(error.status_code(), 404);
/// ```
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
	#[error("HTTP error: {0}")]
	Http(String),

	#[error("Bad request: {0}")]
	BadRequest(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Serialization error: {0}")]
	Serialization(String),

	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Improperly configured: {0}")]
	ImproperlyConfigured(String),

	#[error("Internal error: {0}")]
	Internal(String),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl Error {
	/// HTTP status code a server should answer with for this error
	pub fn status_code(&self) -> u16 {
		match self {
			Error::BadRequest(_) => 400,
			Error::NotFound(_) => 404,
			Error::Http(_)
			| Error::Serialization(_)
			| Error::Configuration(_)
			| Error::ImproperlyConfigured(_)
			| Error::Internal(_)
			| Error::Other(_) => 500,
		}
	}
}
