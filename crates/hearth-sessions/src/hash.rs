//! Change detection for session data
//!
//! Only `data` is fed to the digest. Expiry metadata changes on every touch
//! and must never make a session look modified.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::SessionResult;
use crate::session::Session;

/// Hex-encoded SHA-256 digest of a session's data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Compute the fingerprint of `session`'s data
///
/// `serde_json::Map` keeps keys sorted, so equal data always serializes to
/// the same bytes.
///
/// # Examples
///
/// ```
/// use hearth_sessions::{fingerprint, Session, SessionCookie};
/// use std::time::Duration;
///
/// let mut a = Session::new("a", SessionCookie::default());
/// let mut b = Session::new("b", SessionCookie::new(Some(Duration::from_secs(10))));
/// a.insert("user", "alice").unwrap();
/// b.insert("user", "alice").unwrap();
///
/// assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
/// ```
pub fn fingerprint(session: &Session) -> SessionResult<Fingerprint> {
	let bytes = serde_json::to_vec(session.data())?;
	let digest = Sha256::digest(&bytes);
	Ok(Fingerprint(hex::encode(digest)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cookie::SessionCookie;
	use chrono::{Duration as ChronoDuration, TimeZone, Utc};
	use proptest::prelude::*;
	use rstest::rstest;
	use serde_json::{Value, json};

	fn session_with(data: &[(String, Value)]) -> Session {
		let mut session = Session::new("sid", SessionCookie::default());
		for (key, value) in data {
			session.insert(key.clone(), value.clone()).unwrap();
		}
		session
	}

	fn arb_value() -> impl Strategy<Value = Value> {
		let leaf = prop_oneof![
			Just(Value::Null),
			any::<bool>().prop_map(Value::Bool),
			any::<i64>().prop_map(|n| json!(n)),
			"[a-z0-9 ]{0,12}".prop_map(Value::String),
		];
		leaf.prop_recursive(3, 24, 4, |inner| {
			prop_oneof![
				prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
				prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
					.prop_map(|m| Value::Object(m.into_iter().collect())),
			]
		})
	}

	fn arb_data() -> impl Strategy<Value = Vec<(String, Value)>> {
		prop::collection::vec(("[a-z_]{1,8}", arb_value()), 0..6)
	}

	proptest! {
		#[test]
		fn prop_equal_data_equal_fingerprint(data in arb_data()) {
			let original = session_with(&data);
			let mut reordered = data.clone();
			reordered.reverse();
			let copy = session_with(&reordered);

			// Duplicate keys resolve differently when reversed
			prop_assume!(original.data() == copy.data());
			prop_assert_eq!(fingerprint(&original).unwrap(), fingerprint(&copy).unwrap());
		}

		#[test]
		fn prop_cookie_does_not_affect_fingerprint(data in arb_data(), max_age in 0u64..10_000_000, offset in -100_000i64..100_000) {
			let mut session = session_with(&data);
			let before = fingerprint(&session).unwrap();

			session.cookie.original_max_age = Some(max_age);
			session.cookie.expires = Some(Utc::now() + ChronoDuration::seconds(offset));

			prop_assert_eq!(fingerprint(&session).unwrap(), before);
		}
	}

	#[rstest]
	fn test_data_change_changes_fingerprint() {
		// Arrange
		let mut session = session_with(&[("views".into(), json!(1))]);
		let before = fingerprint(&session).unwrap();

		// Act
		session.insert("views", 2).unwrap();

		// Assert
		assert_ne!(fingerprint(&session).unwrap(), before);
	}

	#[rstest]
	fn test_fingerprint_is_sha256_hex() {
		let session = session_with(&[]);

		let fp = fingerprint(&session).unwrap();

		// sha256("{}")
		assert_eq!(
			fp.as_str(),
			"44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
		);
	}

	#[rstest]
	fn test_expires_in_past_still_same_fingerprint() {
		let mut session = session_with(&[("k".into(), json!("v"))]);
		let before = fingerprint(&session).unwrap();

		session.cookie.expires = Some(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());

		assert_eq!(fingerprint(&session).unwrap(), before);
	}
}
