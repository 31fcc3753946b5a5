//! HMAC signing for session identifiers sent to clients

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix marking a signed value
pub const SIGNED_PREFIX: &str = "s:";

fn mac_for(value: &str, secret: &str) -> HmacSha256 {
	let mut mac =
		HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
	mac.update(value.as_bytes());
	mac
}

/// Sign `value` as `value.signature`
///
/// # Examples
///
/// ```
/// use hearth_sessions::signature::{sign, unsign};
///
/// let signed = sign("abc123", "keyboard cat");
/// assert!(signed.starts_with("abc123."));
/// assert_eq!(unsign(&signed, &["keyboard cat".to_string()]).as_deref(), Some("abc123"));
/// ```
pub fn sign(value: &str, secret: &str) -> String {
	let tag = mac_for(value, secret).finalize().into_bytes();
	format!("{}.{}", value, STANDARD_NO_PAD.encode(tag))
}

/// Verify a signed value against each secret in turn
///
/// Returns the original value for the first secret that verifies, so
/// rotated-out secrets can stay at the end of the list.
pub fn unsign(signed: &str, secrets: &[String]) -> Option<String> {
	let (value, signature) = signed.rsplit_once('.')?;
	let tag = STANDARD_NO_PAD.decode(signature).ok()?;

	secrets
		.iter()
		.any(|secret| mac_for(value, secret).verify_slice(&tag).is_ok())
		.then(|| value.to_string())
}
