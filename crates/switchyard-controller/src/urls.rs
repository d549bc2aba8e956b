//! Route/path helper collaborator.
//!
//! The route mapper owns path generation; the controller layer only carries a
//! name → URL-pattern map so that filters, actions and views can build links
//! without touching the router.

use crate::view::Locals;
use serde_json::Value;
use std::collections::HashMap;

/// Named URL patterns with `{placeholder}` segments
///
/// # Examples
///
/// ```
/// use switchyard_controller::urls::UrlHelpers;
/// use std::collections::HashMap;
///
/// let mut helpers = UrlHelpers::new();
/// helpers.add("post", "/posts/{id}");
/// let mut params = HashMap::new();
/// params.insert("id".to_string(), "42".to_string());
/// assert_eq!(helpers.path_to("post", &params).as_deref(), Some("/posts/42"));
/// ```
#[derive(Default, Clone)]
pub struct UrlHelpers {
	patterns: HashMap<String, String>,
}

impl UrlHelpers {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a named pattern
	pub fn add(&mut self, name: impl Into<String>, pattern: impl Into<String>) {
		self.patterns.insert(name.into(), pattern.into());
	}

	/// Build the URL for `name`, substituting `{key}` placeholders from
	/// `params`. Returns `None` for unknown names; placeholders without a
	/// matching parameter are left verbatim.
	pub fn path_to(&self, name: &str, params: &HashMap<String, String>) -> Option<String> {
		let pattern = self.patterns.get(name)?;
		let mut url = pattern.clone();
		for (key, value) in params {
			url = url.replace(&format!("{{{}}}", key), value);
		}
		Some(url)
	}

	/// Raw pattern lookup
	pub fn pattern(&self, name: &str) -> Option<&str> {
		self.patterns.get(name).map(String::as_str)
	}

	/// Expose the pattern map as view locals
	pub fn to_locals(&self) -> Locals {
		self.patterns
			.iter()
			.map(|(name, pattern)| (name.clone(), Value::String(pattern.clone())))
			.collect()
	}
}
