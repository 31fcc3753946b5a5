//! Declarative session settings loaded from TOML
//!
//! Covers the options that make sense in a config file. A custom id
//! generator or transport still has to be set on the resulting
//! [`SessionConfig`] in code.
//!
//! ```toml
//! resave = false
//! save_uninitialized = false
//! rolling = true
//! unset = "destroy"
//! secret = ["current", "previous"]
//! cookie_name = "app.sid"
//! max_age_secs = 86400
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::config::{SessionConfig, UnsetPolicy};
use crate::error::ConfigError;
use crate::transport::{HeaderTransport, SignedCookieTransport};

/// A single secret or a rotation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretSetting {
	One(String),
	Many(Vec<String>),
}

impl SecretSetting {
	pub fn into_vec(self) -> Vec<String> {
		match self {
			Self::One(secret) => vec![secret],
			Self::Many(secrets) => secrets,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
	pub save_uninitialized: Option<bool>,
	pub resave: Option<bool>,
	pub rolling: bool,
	/// `"destroy"` or `"keep"`
	pub unset: Option<String>,
	pub secret: Option<SecretSetting>,
	/// Carry the id in this header
	pub header_name: Option<String>,
	/// Carry the id in a signed cookie with this name
	pub cookie_name: Option<String>,
	pub max_age_secs: Option<u64>,
	pub environment: Option<String>,
}

impl SessionSettings {
	/// Load settings from a TOML file.
	///
	/// # Errors
	///
	/// Returns error if file cannot be read or parsed.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
			ConfigError::Parse(format!("{}: {}", path.as_ref().display(), e))
		})?;

		Self::from_toml(&content)
	}

	/// Parse settings from a TOML string.
	pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
		toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
	}
}

impl SessionConfig {
	/// Build a config from declarative settings
	///
	/// # Errors
	///
	/// [`ConfigError::InvalidUnset`] for an unknown `unset` value,
	/// [`ConfigError::Parse`] if both `header_name` and `cookie_name` are
	/// given, and anything [`SessionConfig::validate`] rejects.
	///
	/// # Examples
	///
	/// ```
	/// use hearth_sessions::{SessionConfig, SessionSettings, UnsetPolicy};
	///
	/// let settings = SessionSettings::from_toml(r#"
	///     resave = false
	///     unset = "destroy"
	///     secret = "keyboard cat"
	/// "#).unwrap();
	/// let config = SessionConfig::from_settings(settings).unwrap();
	///
	/// assert_eq!(config.unset_policy(), UnsetPolicy::Destroy);
	/// assert!(!config.resave_enabled());
	/// ```
	pub fn from_settings(settings: SessionSettings) -> Result<Self, ConfigError> {
		let mut config = SessionConfig::new().rolling(settings.rolling);

		if let Some(enabled) = settings.save_uninitialized {
			config = config.save_uninitialized(enabled);
		}
		if let Some(enabled) = settings.resave {
			config = config.resave(enabled);
		}
		if let Some(unset) = settings.unset.as_deref() {
			config = config.unset(unset.parse::<UnsetPolicy>()?);
		}
		if let Some(secret) = settings.secret {
			config = config.secrets(secret.into_vec());
		}
		if let Some(seconds) = settings.max_age_secs {
			config = config.cookie_max_age(Duration::from_secs(seconds));
		}
		if let Some(environment) = settings.environment {
			config = config.environment(environment);
		}

		config = match (settings.header_name, settings.cookie_name) {
			(Some(_), Some(_)) => {
				return Err(ConfigError::Parse(
					"header_name and cookie_name are mutually exclusive".to_string(),
				));
			}
			(Some(header), None) => config.transport(HeaderTransport::new(header)),
			(None, Some(cookie)) => config.transport(SignedCookieTransport::new(cookie)),
			(None, None) => config,
		};

		config.validate()?;
		Ok(config)
	}
}
