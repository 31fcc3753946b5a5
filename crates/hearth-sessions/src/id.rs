use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Number of random bytes behind a generated session id
pub const SESSION_ID_BYTES: usize = 24;

/// Generate a fresh session id
///
/// 24 random bytes from the thread-local CSPRNG, URL-safe base64 without
/// padding, so always 32 characters.
///
/// # Examples
///
/// ```
/// use hearth_sessions::generate_session_id;
///
/// let id = generate_session_id();
/// assert_eq!(id.len(), 32);
/// assert_ne!(id, generate_session_id());
/// ```
pub fn generate_session_id() -> String {
	let mut bytes = [0u8; SESSION_ID_BYTES];
	rand::thread_rng().fill_bytes(&mut bytes);
	URL_SAFE_NO_PAD.encode(bytes)
}

/// Whether `id` may be handed to a store
///
/// Ids come from pluggable generators and untrusted transports; empty ids
/// and ids with whitespace or control characters are rejected.
pub fn is_well_formed_id(id: &str) -> bool {
	!id.is_empty() && id.chars().all(|c| c.is_ascii_graphic())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashSet;

	#[rstest]
	fn test_generated_ids_are_url_safe_and_unique() {
		let ids: HashSet<String> = (0..256).map(|_| generate_session_id()).collect();

		assert_eq!(ids.len(), 256);
		for id in &ids {
			assert_eq!(id.len(), 32);
			assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
		}
	}

	#[rstest]
	#[case("abc123", true)]
	#[case("", false)]
	#[case("has space", false)]
	#[case("tab\there", false)]
	#[case("caf\u{e9}", false)]
	fn test_is_well_formed_id(#[case] id: &str, #[case] expected: bool) {
		assert_eq!(is_well_formed_id(id), expected);
	}
}
