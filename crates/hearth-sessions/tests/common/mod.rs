//! Shared fixtures for session integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use hearth_http::{Handler, MiddlewareChain, Request};
use hearth_sessions::{
	MemoryStore, SessionConfig, SessionMiddleware, SessionRecord, SessionStore, StoreError,
	StoreEvents,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Memory store that counts every call and can be told to fail
#[derive(Default)]
pub struct RecordingStore {
	pub inner: MemoryStore,
	pub gets: AtomicUsize,
	pub sets: AtomicUsize,
	pub touches: AtomicUsize,
	pub destroys: AtomicUsize,
	pub written: Mutex<Vec<(String, SessionRecord)>>,
	pub fail_get: Mutex<Option<StoreError>>,
	pub fail_set: AtomicBool,
	pub without_touch: AtomicBool,
}

impl RecordingStore {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn without_touch() -> Arc<Self> {
		let store = Self::default();
		store.without_touch.store(true, Ordering::SeqCst);
		Arc::new(store)
	}

	pub async fn seed(&self, id: &str, data: serde_json::Value) {
		let record: SessionRecord =
			serde_json::from_value(serde_json::json!({ "data": data })).unwrap();
		self.inner.set(id, &record).await.unwrap();
	}

	pub fn gets(&self) -> usize {
		self.gets.load(Ordering::SeqCst)
	}

	pub fn sets(&self) -> usize {
		self.sets.load(Ordering::SeqCst)
	}

	pub fn touches(&self) -> usize {
		self.touches.load(Ordering::SeqCst)
	}

	pub fn destroys(&self) -> usize {
		self.destroys.load(Ordering::SeqCst)
	}

	pub fn last_written(&self) -> Option<(String, SessionRecord)> {
		self.written.lock().last().cloned()
	}
}

#[async_trait]
impl SessionStore for RecordingStore {
	async fn get(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
		self.gets.fetch_add(1, Ordering::SeqCst);
		if let Some(error) = self.fail_get.lock().take() {
			return Err(error);
		}
		self.inner.get(id).await
	}

	async fn set(&self, id: &str, record: &SessionRecord) -> Result<(), StoreError> {
		self.sets.fetch_add(1, Ordering::SeqCst);
		if self.fail_set.load(Ordering::SeqCst) {
			return Err(StoreError::Backend("write refused".to_string()));
		}
		self.written.lock().push((id.to_string(), record.clone()));
		self.inner.set(id, record).await
	}

	async fn destroy(&self, id: &str) -> Result<(), StoreError> {
		self.destroys.fetch_add(1, Ordering::SeqCst);
		self.inner.destroy(id).await
	}

	fn events(&self) -> &StoreEvents {
		self.inner.events()
	}

	async fn touch(&self, id: &str, record: &SessionRecord) -> Result<(), StoreError> {
		self.touches.fetch_add(1, Ordering::SeqCst);
		self.inner.touch(id, record).await
	}

	fn supports_touch(&self) -> bool {
		!self.without_touch.load(Ordering::SeqCst)
	}

	async fn all(&self) -> Result<HashMap<String, SessionRecord>, StoreError> {
		self.inner.all().await
	}

	async fn length(&self) -> Result<usize, StoreError> {
		self.inner.length().await
	}
}

/// Config with the deprecated defaults spelled out as disabled
pub fn quiet_config() -> SessionConfig {
	SessionConfig::new()
		.secret("keyboard cat")
		.resave(false)
		.save_uninitialized(false)
}

pub fn app(store: Arc<RecordingStore>, config: SessionConfig, handler: impl Handler + 'static) -> MiddlewareChain {
	let sessions = SessionMiddleware::new(config, store).unwrap();
	MiddlewareChain::new(Arc::new(handler)).with_middleware(Arc::new(sessions))
}

pub fn request_with_id(id: &str) -> Request {
	Request::builder().header("x-session", id).build().unwrap()
}

pub fn request_without_id() -> Request {
	Request::builder().build().unwrap()
}
