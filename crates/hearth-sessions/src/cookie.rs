//! Expiry metadata carried alongside session data
//!
//! This is the part of a session that changes on every touch. It is stored
//! with the session so stores can derive a TTL from it, but it never takes
//! part in change detection.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session expiry metadata
///
/// # Examples
///
/// ```
/// use hearth_sessions::SessionCookie;
/// use std::time::Duration;
///
/// let cookie = SessionCookie::new(Some(Duration::from_secs(60)));
/// assert_eq!(cookie.original_max_age, Some(60_000));
/// assert!(!cookie.is_expired());
///
/// let browser_session = SessionCookie::new(None);
/// assert!(browser_session.expires.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
	/// Lifetime in milliseconds that each touch renews; `None` means no expiry
	pub original_max_age: Option<u64>,
	/// Absolute expiry instant
	pub expires: Option<DateTime<Utc>>,
}

impl SessionCookie {
	/// Lifetimes too long to express in milliseconds saturate at `u64::MAX`.
	pub fn new(max_age: Option<Duration>) -> Self {
		let mut cookie = Self {
			original_max_age: max_age.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
			expires: None,
		};
		cookie.reset_max_age();
		cookie
	}

	/// Whether `max_age` from now is a representable instant
	pub fn is_valid_max_age(max_age: Duration) -> bool {
		u64::try_from(max_age.as_millis())
			.ok()
			.and_then(expiry_after)
			.is_some()
	}

	/// Push `expires` out to now + `original_max_age`
	///
	/// An expiry past the last representable instant is dropped, which
	/// leaves the session without one.
	pub fn reset_max_age(&mut self) {
		self.expires = self.original_max_age.and_then(expiry_after);
	}

	/// Remaining lifetime, zero once expired; `None` without an expiry
	pub fn max_age(&self) -> Option<Duration> {
		self.expires.map(|expires| {
			(expires - Utc::now())
				.to_std()
				.unwrap_or(Duration::ZERO)
		})
	}

	pub fn is_expired(&self) -> bool {
		self.expires.is_some_and(|expires| expires <= Utc::now())
	}
}

fn expiry_after(ms: u64) -> Option<DateTime<Utc>> {
	let ms = i64::try_from(ms).ok()?;
	Utc::now().checked_add_signed(ChronoDuration::try_milliseconds(ms)?)
}
