//! Model registry collaborator.
//!
//! Domain models live outside this layer; controllers only receive opaque
//! handles, republished into every instance on `init`.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque handle to a domain model
pub type ModelHandle = Arc<dyn Any + Send + Sync>;

/// Named model handles shared by every controller
#[derive(Default, Clone)]
pub struct ModelRegistry {
	models: HashMap<String, ModelHandle>,
}

impl ModelRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a model handle under `name`
	pub fn register(&mut self, name: impl Into<String>, handle: ModelHandle) {
		self.models.insert(name.into(), handle);
	}

	/// Look up a model handle
	pub fn get(&self, name: &str) -> Option<ModelHandle> {
		self.models.get(name).cloned()
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.models.keys().map(String::as_str)
	}

	pub(crate) fn all(&self) -> HashMap<String, ModelHandle> {
		self.models.clone()
	}
}
