//! HTTP request representation

use bytes::Bytes;
use hearth_core::exception::{Error, Result};
use hyper::{HeaderMap, Method, Uri, Version};

use crate::Extensions;

/// HTTP request as seen by middleware and handlers
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Per-request typed values inserted by middleware
	pub extensions: Extensions,
}

impl Request {
	/// Start building a request
	///
	/// # Examples
	///
	/// ```
	/// use hearth_http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/cart")
	///     .header("x-session", "abc123")
	///     .build()
	///     .unwrap();
	/// assert_eq!(request.path(), "/cart");
	/// assert_eq!(request.header("x-session"), Some("abc123"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Request path without the query string
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Header value as a string, if present and valid UTF-8 visible ASCII
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Copy of the request line and headers with an empty body and fresh extensions
	///
	/// Used where a component must keep request context beyond the lifetime
	/// of the request itself without keeping its extensions alive.
	pub fn head_only(&self) -> Request {
		Request {
			method: self.method.clone(),
			uri: self.uri.clone(),
			version: self.version,
			headers: self.headers.clone(),
			body: Bytes::new(),
			extensions: Extensions::new(),
		}
	}
}

/// Builder for [`Request`]
pub struct RequestBuilder {
	method: Method,
	uri: String,
	version: Version,
	headers: HeaderMap,
	body: Bytes,
	invalid_header: Option<String>,
}

impl Default for RequestBuilder {
	fn default() -> Self {
		Self {
			method: Method::GET,
			uri: "/".to_string(),
			version: Version::HTTP_11,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			invalid_header: None,
		}
	}
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = uri.into();
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = version;
		self
	}

	/// Replace all headers
	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Append a single header; invalid names or values fail at [`build`](Self::build)
	pub fn header(mut self, name: &str, value: &str) -> Self {
		match (
			hyper::header::HeaderName::from_bytes(name.as_bytes()),
			hyper::header::HeaderValue::from_str(value),
		) {
			(Ok(name), Ok(value)) => {
				self.headers.append(name, value);
			}
			_ => self.invalid_header = Some(name.to_string()),
		}
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn build(self) -> Result<Request> {
		if let Some(name) = self.invalid_header {
			return Err(Error::BadRequest(format!("Invalid header: {}", name)));
		}
		let uri = self
			.uri
			.parse::<Uri>()
			.map_err(|e| Error::BadRequest(format!("Invalid URI: {}", e)))?;
		Ok(Request {
			method: self.method,
			uri,
			version: self.version,
			headers: self.headers,
			body: self.body,
			extensions: Extensions::new(),
		})
	}
}
