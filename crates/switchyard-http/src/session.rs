use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{Error, Result};

/// Session data attached to a request by the session layer.
///
/// The controller core treats sessions as an opaque typed key/value store;
/// storage backends and expiry live outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
	/// Session ID
	pub id: String,
	/// Data
	pub data: HashMap<String, Value>,
}

impl Session {
	/// Create an empty session with a fresh ID
	pub fn new() -> Self {
		Self {
			id: Uuid::new_v4().to_string(),
			data: HashMap::new(),
		}
	}

	/// Get a value
	pub fn get<T>(&self, key: &str) -> Option<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		self.data
			.get(key)
			.and_then(|v| serde_json::from_value(v.clone()).ok())
	}

	/// Set a value
	pub fn set<T>(&mut self, key: impl Into<String>, value: T) -> Result<()>
	where
		T: Serialize,
	{
		self.data.insert(
			key.into(),
			serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))?,
		);
		Ok(())
	}

	/// Delete a value
	pub fn delete(&mut self, key: &str) {
		self.data.remove(key);
	}

	/// Check if a key exists
	pub fn contains_key(&self, key: &str) -> bool {
		self.data.contains_key(key)
	}

	/// Clear the session
	pub fn clear(&mut self) {
		self.data.clear();
	}
}

impl Default for Session {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn typed_round_trip() {
		let mut session = Session::new();
		session.set("count", 3u32).unwrap();
		assert_eq!(session.get::<u32>("count"), Some(3));
		assert!(session.contains_key("count"));
		session.delete("count");
		assert_eq!(session.get::<u32>("count"), None);
	}

	#[test]
	fn fresh_sessions_have_distinct_ids() {
		assert_ne!(Session::new().id, Session::new().id);
	}
}
