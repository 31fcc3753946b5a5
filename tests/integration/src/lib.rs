//! Shared helpers for workspace-level integration tests

use hearth::Request;

/// Session id header used by the default transport
pub const SESSION_HEADER: &str = "x-session";

/// Build a GET request for `path`, optionally presenting a session id
pub fn get(path: &str, session_id: Option<&str>) -> Request {
	let mut builder = Request::builder().uri(path);
	if let Some(id) = session_id {
		builder = builder.header(SESSION_HEADER, id);
	}
	builder.build().unwrap()
}
