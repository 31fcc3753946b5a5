//! End-of-request decisions
//!
//! Everything here is a pure function of the per-request [`Tracker`], the
//! configured [`Policy`] and the session as the handler left it. The
//! middleware turns the resulting [`Decision`] into store calls.

use tracing::debug;

use crate::config::{SessionConfig, UnsetPolicy};
use crate::error::SessionResult;
use crate::hash::{Fingerprint, fingerprint};
use crate::id::is_well_formed_id;
use crate::session::Session;

/// Configured policy flags that drive the decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
	pub save_uninitialized: bool,
	pub resave: bool,
	pub rolling: bool,
	pub unset: UnsetPolicy,
}

impl Policy {
	pub fn from_config(config: &SessionConfig) -> Self {
		Self {
			save_uninitialized: config.save_uninitialized_enabled(),
			resave: config.resave_enabled(),
			rolling: config.rolling_enabled(),
			unset: config.unset_policy(),
		}
	}
}

/// What the request started with, plus the last explicitly saved state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracker {
	pub original_id: String,
	pub original_fingerprint: Fingerprint,
	pub saved_fingerprint: Option<Fingerprint>,
	/// Id presented by the client, if any
	pub incoming_id: Option<String>,
}

impl Tracker {
	/// Start tracking a freshly generated or inflated session
	pub fn new(session: &Session, incoming_id: Option<String>) -> SessionResult<Self> {
		Ok(Self {
			original_id: session.id().to_string(),
			original_fingerprint: fingerprint(session)?,
			saved_fingerprint: None,
			incoming_id,
		})
	}

	/// Treat the state as loaded as already persisted
	pub fn assume_saved(&mut self) {
		self.saved_fingerprint = Some(self.original_fingerprint.clone());
	}

	pub fn mark_saved(&mut self, fingerprint: Fingerprint) {
		self.saved_fingerprint = Some(fingerprint);
	}

	fn came_in_as(&self, id: &str) -> bool {
		self.incoming_id.as_deref() == Some(id)
	}

	pub fn is_modified(&self, session: &Session) -> SessionResult<bool> {
		Ok(self.original_id != session.id() || self.original_fingerprint != fingerprint(session)?)
	}

	pub fn is_saved(&self, session: &Session) -> SessionResult<bool> {
		if self.original_id != session.id() {
			return Ok(false);
		}
		let current = fingerprint(session)?;
		Ok(self.saved_fingerprint.as_ref() == Some(&current))
	}

	pub fn should_save(&self, policy: &Policy, session: &Session) -> SessionResult<bool> {
		if !is_well_formed_id(session.id()) {
			debug!(session_id = ?session.id(), "session ignored because of bogus id");
			return Ok(false);
		}

		if !policy.save_uninitialized
			&& self.saved_fingerprint.is_none()
			&& !self.came_in_as(session.id())
		{
			self.is_modified(session)
		} else {
			Ok(!self.is_saved(session)?)
		}
	}

	pub fn should_touch(&self, policy: &Policy, session: &Session) -> SessionResult<bool> {
		if !is_well_formed_id(session.id()) {
			debug!(session_id = ?session.id(), "session ignored because of bogus id");
			return Ok(false);
		}

		Ok(policy.rolling && self.came_in_as(session.id()) && !self.should_save(policy, session)?)
	}

	/// Whether the client needs to be sent the session id
	pub fn should_set_id(&self, policy: &Policy, session: &Session) -> SessionResult<bool> {
		if !is_well_formed_id(session.id()) {
			return Ok(false);
		}

		if !self.came_in_as(session.id()) {
			Ok(policy.save_uninitialized || self.is_modified(session)?)
		} else {
			Ok(policy.rolling || (session.cookie.expires.is_some() && self.is_modified(session)?))
		}
	}
}

/// Store operation chosen for the end of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	Destroy,
	Save,
	Touch,
	Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
	pub action: Action,
	pub set_id: bool,
}

/// Decide what to do with a session once the handler has finished
///
/// `session` is `None` when the application cleared it. `resolved_id` is
/// the id the request was working with at that point.
pub fn decide(
	tracker: &Tracker,
	policy: &Policy,
	resolved_id: Option<&str>,
	session: Option<&Session>,
) -> SessionResult<Decision> {
	let Some(session) = session else {
		let action = if resolved_id.is_some() && policy.unset == UnsetPolicy::Destroy {
			Action::Destroy
		} else {
			Action::Skip
		};
		return Ok(Decision {
			action,
			set_id: false,
		});
	};

	let action = if tracker.should_save(policy, session)? {
		Action::Save
	} else if tracker.should_touch(policy, session)? {
		Action::Touch
	} else {
		Action::Skip
	};

	Ok(Decision {
		action,
		set_id: tracker.should_set_id(policy, session)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cookie::SessionCookie;
	use rstest::{fixture, rstest};
	use std::time::Duration;

	fn policy(save_uninitialized: bool, resave: bool, rolling: bool) -> Policy {
		Policy {
			save_uninitialized,
			resave,
			rolling,
			unset: UnsetPolicy::Keep,
		}
	}

	#[fixture]
	fn loaded() -> Session {
		let mut session = Session::new("abc123", SessionCookie::default());
		session.insert("views", 1).unwrap();
		session
	}

	fn inflated_tracker(session: &Session, resave: bool) -> Tracker {
		let mut tracker = Tracker::new(session, Some(session.id().to_string())).unwrap();
		if !resave {
			tracker.assume_saved();
		}
		tracker
	}

	#[rstest]
	fn test_untouched_inflated_session_is_skipped(loaded: Session) {
		// Arrange
		let policy = policy(true, false, false);
		let tracker = inflated_tracker(&loaded, false);

		// Act
		let decision = decide(&tracker, &policy, Some("abc123"), Some(&loaded)).unwrap();

		// Assert
		assert_eq!(decision.action, Action::Skip);
		assert!(!decision.set_id);
	}

	#[rstest]
	fn test_untouched_inflated_session_is_touched_when_rolling(loaded: Session) {
		let policy = policy(true, false, true);
		let tracker = inflated_tracker(&loaded, false);

		let decision = decide(&tracker, &policy, Some("abc123"), Some(&loaded)).unwrap();

		assert_eq!(decision.action, Action::Touch);
		assert!(decision.set_id);
	}

	#[rstest]
	fn test_resave_saves_unmodified(loaded: Session) {
		let policy = policy(true, true, false);
		let tracker = inflated_tracker(&loaded, true);

		let decision = decide(&tracker, &policy, Some("abc123"), Some(&loaded)).unwrap();

		assert_eq!(decision.action, Action::Save);
	}

	#[rstest]
	fn test_modified_session_is_saved(mut loaded: Session) {
		let policy = policy(true, false, true);
		let tracker = inflated_tracker(&loaded, false);
		loaded.insert("views", 2).unwrap();

		assert!(tracker.is_modified(&loaded).unwrap());
		let decision = decide(&tracker, &policy, Some("abc123"), Some(&loaded)).unwrap();

		assert_eq!(decision.action, Action::Save);
	}

	#[rstest]
	fn test_cookie_change_is_not_a_modification(mut loaded: Session) {
		let policy = policy(true, false, false);
		let tracker = inflated_tracker(&loaded, false);
		loaded.cookie = SessionCookie::new(Some(Duration::from_secs(5)));

		assert!(!tracker.is_modified(&loaded).unwrap());
		let decision = decide(&tracker, &policy, Some("abc123"), Some(&loaded)).unwrap();
		assert_eq!(decision.action, Action::Skip);
	}

	#[rstest]
	#[case(true, Action::Save, true)]
	#[case(false, Action::Skip, false)]
	fn test_uninitialized_generated_session(
		#[case] save_uninitialized: bool,
		#[case] expected: Action,
		#[case] set_id: bool,
	) {
		let session = Session::new("fresh", SessionCookie::default());
		let tracker = Tracker::new(&session, None).unwrap();
		let policy = policy(save_uninitialized, false, false);

		let decision = decide(&tracker, &policy, Some("fresh"), Some(&session)).unwrap();

		assert_eq!(decision.action, expected);
		assert_eq!(decision.set_id, set_id);
	}

	#[rstest]
	fn test_explicitly_saved_generated_session_is_not_written_twice() {
		// Arrange
		let mut session = Session::new("fresh", SessionCookie::default());
		let mut tracker = Tracker::new(&session, None).unwrap();
		let policy = policy(false, false, false);
		session.insert("user", "alice").unwrap();

		// Act
		tracker.mark_saved(fingerprint(&session).unwrap());
		let decision = decide(&tracker, &policy, Some("fresh"), Some(&session)).unwrap();

		// Assert
		assert_eq!(decision.action, Action::Skip);
		assert!(decision.set_id);
	}

	#[rstest]
	fn test_change_after_explicit_save_is_saved_again(mut loaded: Session) {
		let policy = policy(true, false, false);
		let mut tracker = inflated_tracker(&loaded, false);
		loaded.insert("views", 2).unwrap();
		tracker.mark_saved(fingerprint(&loaded).unwrap());
		loaded.insert("views", 3).unwrap();

		let decision = decide(&tracker, &policy, Some("abc123"), Some(&loaded)).unwrap();

		assert_eq!(decision.action, Action::Save);
	}

	#[rstest]
	#[case(UnsetPolicy::Destroy, Some("abc123"), Action::Destroy)]
	#[case(UnsetPolicy::Keep, Some("abc123"), Action::Skip)]
	#[case(UnsetPolicy::Destroy, None, Action::Skip)]
	fn test_cleared_session(
		loaded: Session,
		#[case] unset: UnsetPolicy,
		#[case] resolved_id: Option<&str>,
		#[case] expected: Action,
	) {
		let tracker = inflated_tracker(&loaded, false);
		let policy = Policy {
			unset,
			..policy(true, false, true)
		};

		let decision = decide(&tracker, &policy, resolved_id, None).unwrap();

		assert_eq!(decision.action, expected);
		assert!(!decision.set_id);
	}

	#[rstest]
	#[case("")]
	#[case("bad id")]
	fn test_malformed_id_never_saved_or_touched(#[case] id: &str) {
		let mut session = Session::new(id, SessionCookie::default());
		let tracker = Tracker::new(&session, Some(id.to_string())).unwrap();
		session.insert("user", "alice").unwrap();
		let policy = policy(true, true, true);

		let decision = decide(&tracker, &policy, Some(id), Some(&session)).unwrap();

		assert_eq!(decision.action, Action::Skip);
		assert!(!decision.set_id);
	}

	#[rstest]
	fn test_expiring_modified_session_resends_id(mut loaded: Session) {
		loaded.cookie = SessionCookie::new(Some(Duration::from_secs(60)));
		let tracker = inflated_tracker(&loaded, false);
		let policy = policy(true, false, false);

		let unchanged = decide(&tracker, &policy, Some("abc123"), Some(&loaded)).unwrap();
		loaded.insert("views", 5).unwrap();
		let changed = decide(&tracker, &policy, Some("abc123"), Some(&loaded)).unwrap();

		assert!(!unchanged.set_id);
		assert!(changed.set_id);
	}
}
