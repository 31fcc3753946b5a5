//! The facade wires sessions into an ordinary middleware chain.

use async_trait::async_trait;
use bytes::Bytes;
use hearth::prelude::*;
use hearth_integration_tests::{SESSION_HEADER, get};
use hyper::StatusCode;
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;

/// Rejects requests whose session has no user
struct RequireLogin;

#[async_trait]
impl Middleware for RequireLogin {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let logged_in = request
			.session()
			.is_some_and(|session| session.contains_key("user"));
		if !logged_in {
			return Ok(Response::new(StatusCode::UNAUTHORIZED));
		}
		next.handle(request).await
	}

	fn should_continue(&self, request: &Request) -> bool {
		request.path().starts_with("/account")
	}
}

fn app(store: Arc<MemoryStore>) -> MiddlewareChain {
	let sessions = SessionMiddleware::new(
		SessionConfig::new()
			.secret("keyboard cat")
			.resave(false)
			.save_uninitialized(false),
		store,
	)
	.unwrap();

	let handler = handler_fn(|request: Request| async move {
		let session = request.session().unwrap();
		if request.path() == "/login" {
			session.regenerate().await.unwrap();
			session.insert("user", "alice").unwrap();
			return Ok(Response::ok());
		}
		let user = session.get::<String>("user");
		Response::ok().with_json(&json!({ "user": user }))
	});

	MiddlewareChain::new(Arc::new(handler))
		.with_middleware(Arc::new(sessions))
		.with_middleware(Arc::new(RequireLogin))
}

#[rstest]
#[tokio::test]
async fn test_login_flow_through_facade() {
	// Arrange
	let store = Arc::new(MemoryStore::new());
	let app = app(store.clone());

	// Act
	let anonymous = app.handle(get("/account", None)).await.unwrap();
	let login = app.handle(get("/login", None)).await.unwrap();
	let id = login.header(SESSION_HEADER).unwrap().to_string();
	let account = app.handle(get("/account", Some(&id))).await.unwrap();

	// Assert
	assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
	assert_eq!(login.status, StatusCode::OK);
	assert_eq!(account.status, StatusCode::OK);
	assert_eq!(account.body, Bytes::from(r#"{"user":"alice"}"#));
	assert_eq!(store.length().await.unwrap(), 1);
}

#[rstest]
#[tokio::test]
async fn test_public_route_skips_login_check() {
	let app = app(Arc::new(MemoryStore::new()));

	let response = app.handle(get("/", None)).await.unwrap();

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.body, Bytes::from(r#"{"user":null}"#));
	assert_eq!(response.header(SESSION_HEADER), None);
}
