//! How session ids travel between client and server
//!
//! The lifecycle engine only needs an optional incoming id and a way to
//! write a new or cleared id back. Two transports ship here: a plain
//! request/response header ([`HeaderTransport`], the default) and a signed
//! cookie ([`SignedCookieTransport`]).

use hearth_http::{Request, Response};
use hyper::header::{COOKIE, HeaderName, SET_COOKIE};
use tracing::{debug, warn};

use crate::cookie::SessionCookie;
use crate::error::ConfigError;
use crate::signature::{SIGNED_PREFIX, sign, unsign};

/// Default header carrying the session id
pub const DEFAULT_HEADER_NAME: &str = "x-session";

/// Default name of the session cookie
pub const DEFAULT_COOKIE_NAME: &str = "hearth.sid";

/// Signing secret supplied by an upstream middleware
///
/// Used when the session middleware itself has no secrets configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSecret(pub String);

/// Carries session ids in and out of requests
pub trait SessionTransport: Send + Sync {
	/// Incoming session id, if the request presents a usable one
	fn read_id(&self, request: &Request, secrets: &[String]) -> Option<String>;

	/// Send `id` back to the client
	fn write_id(&self, response: &mut Response, id: &str, cookie: &SessionCookie, secrets: &[String]);

	/// Tell the client to forget its session id
	fn clear_id(&self, response: &mut Response);

	/// Whether ids cannot be read or written without a secret
	fn requires_secret(&self) -> bool {
		false
	}

	/// Reject settings that would keep ids from ever reaching the client
	fn validate(&self) -> Result<(), ConfigError> {
		Ok(())
	}
}

/// Session id in a plain header
///
/// # Examples
///
/// ```
/// use hearth_http::{Request, Response};
/// use hearth_sessions::{HeaderTransport, SessionCookie, SessionTransport};
///
/// let transport = HeaderTransport::default();
/// let request = Request::builder().header("x-session", "abc123").build().unwrap();
/// assert_eq!(transport.read_id(&request, &[]).as_deref(), Some("abc123"));
///
/// let mut response = Response::ok();
/// transport.write_id(&mut response, "def456", &SessionCookie::default(), &[]);
/// assert_eq!(response.header("x-session"), Some("def456"));
/// ```
#[derive(Debug, Clone)]
pub struct HeaderTransport {
	header_name: String,
}

impl HeaderTransport {
	pub fn new(header_name: impl Into<String>) -> Self {
		Self {
			header_name: header_name.into().to_ascii_lowercase(),
		}
	}

	pub fn header_name(&self) -> &str {
		&self.header_name
	}
}

impl Default for HeaderTransport {
	fn default() -> Self {
		Self::new(DEFAULT_HEADER_NAME)
	}
}

impl SessionTransport for HeaderTransport {
	fn read_id(&self, request: &Request, _secrets: &[String]) -> Option<String> {
		request
			.header(&self.header_name)
			.map(str::trim)
			.filter(|id| !id.is_empty())
			.map(str::to_string)
	}

	fn write_id(&self, response: &mut Response, id: &str, _cookie: &SessionCookie, _secrets: &[String]) {
		response.set_header(&self.header_name, id);
	}

	fn clear_id(&self, response: &mut Response) {
		response.set_header(&self.header_name, "");
	}

	fn validate(&self) -> Result<(), ConfigError> {
		HeaderName::from_bytes(self.header_name.as_bytes())
			.map(|_| ())
			.map_err(|_| ConfigError::InvalidHeaderName(self.header_name.clone()))
	}
}

/// Session id in an HMAC-signed cookie
///
/// The cookie value is `s:<id>.<signature>`. Incoming cookies are checked
/// against every secret; outgoing cookies are signed with the first one.
#[derive(Debug, Clone)]
pub struct SignedCookieTransport {
	name: String,
	path: String,
	http_only: bool,
}

impl SignedCookieTransport {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			path: "/".to_string(),
			http_only: true,
		}
	}

	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self
	}

	pub fn with_http_only(mut self, http_only: bool) -> Self {
		self.http_only = http_only;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	fn cookie_value<'a>(&self, request: &'a Request) -> Option<&'a str> {
		request
			.headers
			.get_all(COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(|header| header.split(';'))
			.filter_map(|pair| pair.trim().split_once('='))
			.find(|(name, _)| *name == self.name)
			.map(|(_, value)| value.trim_matches('"'))
	}

	fn attributes(&self, max_age: Option<u64>) -> String {
		let mut attributes = format!("Path={}", self.path);
		if let Some(seconds) = max_age {
			attributes.push_str(&format!("; Max-Age={}", seconds));
		}
		if self.http_only {
			attributes.push_str("; HttpOnly");
		}
		attributes
	}
}

impl Default for SignedCookieTransport {
	fn default() -> Self {
		Self::new(DEFAULT_COOKIE_NAME)
	}
}

impl SessionTransport for SignedCookieTransport {
	fn read_id(&self, request: &Request, secrets: &[String]) -> Option<String> {
		let raw = self.cookie_value(request)?;
		let Some(signed) = raw.strip_prefix(SIGNED_PREFIX) else {
			debug!(cookie = %self.name, "cookie unsigned");
			return None;
		};
		let id = unsign(signed, secrets);
		if id.is_none() {
			debug!(cookie = %self.name, "cookie signature invalid");
		}
		id
	}

	fn write_id(&self, response: &mut Response, id: &str, cookie: &SessionCookie, secrets: &[String]) {
		let Some(secret) = secrets.first() else {
			warn!(cookie = %self.name, "no secret available, session cookie not set");
			return;
		};
		let value = format!("{}{}", SIGNED_PREFIX, sign(id, secret));
		let max_age = cookie.max_age().map(|d| d.as_secs());
		let header = format!("{}={}; {}", self.name, value, self.attributes(max_age));
		response.append_header(SET_COOKIE.as_str(), &header);
	}

	fn clear_id(&self, response: &mut Response) {
		let header = format!("{}=; {}", self.name, self.attributes(Some(0)));
		response.append_header(SET_COOKIE.as_str(), &header);
	}

	fn requires_secret(&self) -> bool {
		true
	}

	fn validate(&self) -> Result<(), ConfigError> {
		let is_token = !self.name.is_empty()
			&& self
				.name
				.bytes()
				.all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b));
		if is_token {
			Ok(())
		} else {
			Err(ConfigError::Parse(format!("invalid cookie name \"{}\"", self.name)))
		}
	}
}
