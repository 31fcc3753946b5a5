//! Type-keyed storage attached to a request
//!
//! Middleware uses extensions to pass typed values (a session handle, a
//! store reference, a cookie secret) downstream without widening the
//! [`Request`](crate::Request) struct for every concern.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Type-safe extension storage
///
/// Cloning an `Extensions` yields a view of the same underlying map.
#[derive(Clone, Default)]
pub struct Extensions {
	map: Arc<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Extensions {
	/// Create an empty extension map
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value, replacing any previous value of the same type
	///
	/// # Examples
	///
	/// ```
	/// use hearth_http::Extensions;
	///
	/// #[derive(Clone)]
	/// struct TenantId(u32);
	///
	/// let extensions = Extensions::new();
	/// extensions.insert(TenantId(7));
	/// assert_eq!(extensions.get::<TenantId>().map(|t| t.0), Some(7));
	/// ```
	pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
		let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.insert(TypeId::of::<T>(), Box::new(value));
	}

	/// Get a clone of the stored value of type `T`
	pub fn get<T>(&self) -> Option<T>
	where
		T: Clone + Send + Sync + 'static,
	{
		let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.get(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_ref::<T>())
			.cloned()
	}

	/// Check whether a value of type `T` is stored
	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.contains_key(&TypeId::of::<T>())
	}

	/// Remove and return the stored value of type `T`
	pub fn remove<T: Send + Sync + 'static>(&self) -> Option<T> {
		let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.remove(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast::<T>().ok())
			.map(|boxed| *boxed)
	}
}
