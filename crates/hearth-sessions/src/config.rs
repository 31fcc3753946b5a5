//! Session middleware configuration
//!
//! [`SessionConfig`] is a builder. Nothing is checked until the config is
//! handed to [`SessionMiddleware::new`](crate::SessionMiddleware::new), which
//! calls [`SessionConfig::validate`] and fails fast on invalid options.

use hearth_http::Request;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::cookie::SessionCookie;
use crate::error::ConfigError;
use crate::id::generate_session_id;
use crate::transport::{HeaderTransport, SessionTransport};

/// Environment variable consulted when no environment is configured
pub const ENVIRONMENT_VAR: &str = "HEARTH_ENV";

/// Produces a new session id for a request
pub type IdGenerator = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// What happens to a stored session when the application clears it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnsetPolicy {
	/// Delete it from the store and clear the client's id
	Destroy,
	/// Leave the store untouched
	#[default]
	Keep,
}

impl FromStr for UnsetPolicy {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"destroy" => Ok(Self::Destroy),
			"keep" => Ok(Self::Keep),
			other => Err(ConfigError::InvalidUnset(other.to_string())),
		}
	}
}

impl fmt::Display for UnsetPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Destroy => f.write_str("destroy"),
			Self::Keep => f.write_str("keep"),
		}
	}
}

/// Options for [`SessionMiddleware`](crate::SessionMiddleware)
///
/// # Examples
///
/// ```
/// use hearth_sessions::{SessionConfig, UnsetPolicy};
/// use std::time::Duration;
///
/// let config = SessionConfig::new()
///     .secret("keyboard cat")
///     .resave(false)
///     .save_uninitialized(false)
///     .rolling(true)
///     .unset(UnsetPolicy::Destroy)
///     .cookie_max_age(Duration::from_secs(3600));
///
/// assert!(config.validate().is_ok());
/// assert!(!config.resave_enabled());
/// ```
#[derive(Clone)]
pub struct SessionConfig {
	generate_id: IdGenerator,
	save_uninitialized: Option<bool>,
	resave: Option<bool>,
	rolling: bool,
	unset: UnsetPolicy,
	secrets: Option<Vec<String>>,
	cookie_max_age: Option<Duration>,
	transport: Arc<dyn SessionTransport>,
	environment: Option<String>,
}

impl SessionConfig {
	pub fn new() -> Self {
		Self {
			generate_id: Arc::new(|_: &Request| generate_session_id()),
			save_uninitialized: None,
			resave: None,
			rolling: false,
			unset: UnsetPolicy::Keep,
			secrets: None,
			cookie_max_age: None,
			transport: Arc::new(HeaderTransport::default()),
			environment: None,
		}
	}

	/// Replace the session id generator
	pub fn generate_id<F>(mut self, generator: F) -> Self
	where
		F: Fn(&Request) -> String + Send + Sync + 'static,
	{
		self.generate_id = Arc::new(generator);
		self
	}

	/// Persist sessions that were created but never modified
	pub fn save_uninitialized(mut self, enabled: bool) -> Self {
		self.save_uninitialized = Some(enabled);
		self
	}

	/// Persist loaded sessions even when unmodified
	pub fn resave(mut self, enabled: bool) -> Self {
		self.resave = Some(enabled);
		self
	}

	/// Refresh expiry and resend the id on every response
	pub fn rolling(mut self, enabled: bool) -> Self {
		self.rolling = enabled;
		self
	}

	pub fn unset(mut self, policy: UnsetPolicy) -> Self {
		self.unset = policy;
		self
	}

	/// Use a single signing secret
	pub fn secret(mut self, secret: impl Into<String>) -> Self {
		self.secrets = Some(vec![secret.into()]);
		self
	}

	/// Use several signing secrets; the first signs, all verify
	pub fn secrets<I, S>(mut self, secrets: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.secrets = Some(secrets.into_iter().map(Into::into).collect());
		self
	}

	/// Lifetime given to new sessions; `None` means no expiry
	pub fn cookie_max_age(mut self, max_age: Duration) -> Self {
		self.cookie_max_age = Some(max_age);
		self
	}

	pub fn transport<T: SessionTransport + 'static>(mut self, transport: T) -> Self {
		self.transport = Arc::new(transport);
		self
	}

	/// Deployment environment name, e.g. `"production"`
	pub fn environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());
		self
	}

	/// Check option values and emit deprecation warnings
	///
	/// # Errors
	///
	/// [`ConfigError::EmptySecret`] if secrets were given as an empty list,
	/// [`ConfigError::MaxAgeOutOfRange`] if the cookie lifetime cannot be
	/// turned into an expiry instant, and whatever the transport rejects,
	/// such as [`ConfigError::InvalidHeaderName`].
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.transport.validate()?;
		if let Some(max_age) = self.cookie_max_age {
			if !SessionCookie::is_valid_max_age(max_age) {
				return Err(ConfigError::MaxAgeOutOfRange(max_age));
			}
		}
		if self.resave.is_none() {
			warn!("undefined resave option; provide resave option");
		}
		if self.save_uninitialized.is_none() {
			warn!("undefined saveUninitialized option; provide saveUninitialized option");
		}
		match &self.secrets {
			Some(secrets) if secrets.is_empty() => return Err(ConfigError::EmptySecret),
			Some(_) => {}
			None => warn!("request secret fallback in use; provide secret option"),
		}
		Ok(())
	}

	pub(crate) fn id_generator(&self) -> IdGenerator {
		self.generate_id.clone()
	}

	pub fn save_uninitialized_enabled(&self) -> bool {
		self.save_uninitialized.unwrap_or(true)
	}

	pub fn resave_enabled(&self) -> bool {
		self.resave.unwrap_or(true)
	}

	pub fn rolling_enabled(&self) -> bool {
		self.rolling
	}

	pub fn unset_policy(&self) -> UnsetPolicy {
		self.unset
	}

	pub fn configured_secrets(&self) -> Option<&[String]> {
		self.secrets.as_deref()
	}

	pub fn max_age(&self) -> Option<Duration> {
		self.cookie_max_age
	}

	pub(crate) fn session_transport(&self) -> Arc<dyn SessionTransport> {
		self.transport.clone()
	}

	/// Configured environment, else the `HEARTH_ENV` variable
	pub fn resolved_environment(&self) -> Option<String> {
		self.environment
			.clone()
			.or_else(|| std::env::var(ENVIRONMENT_VAR).ok())
	}
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for SessionConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionConfig")
			.field("save_uninitialized", &self.save_uninitialized)
			.field("resave", &self.resave)
			.field("rolling", &self.rolling)
			.field("unset", &self.unset)
			.field("secrets", &self.secrets.as_ref().map(|s| s.len()))
			.field("cookie_max_age", &self.cookie_max_age)
			.field("requires_secret", &self.transport.requires_secret())
			.field("environment", &self.environment)
			.finish_non_exhaustive()
	}
}
