//! Application settings for the Switchyard controller layer.
//!
//! One plain struct, deserializable from whatever configuration source the
//! application uses. The controller core only ever reads it through an
//! `Arc<Settings>` handed down at construction time.

use serde::Deserialize;
use std::path::PathBuf;

/// Application-level settings consumed by the controller layer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Application root directory
	pub app_root: PathBuf,
	/// Directory containing views (and its `layouts/` subdirectory)
	pub views_root: PathBuf,
	/// View template file extension, e.g. `html`
	pub view_engine: String,
	/// Controller source file extension used by directory discovery
	pub controller_ext: String,
	/// Reuse controller instances across requests instead of rebuilding them
	pub eval_cache: bool,
	/// Keep model schemas connected between requests
	pub model_cache: bool,
	/// Emit per-step dispatch logs
	pub log_actions: bool,
	/// `Some(false)` disables layouts application-wide
	pub default_layout: Option<bool>,
	/// Locale used when a request does not pick one
	pub default_locale: String,
	/// Locales `set_locale` accepts
	pub supported_locales: Vec<String>,
	/// Application secret used for request-forgery token signing
	pub secret_key: String,
}

impl Settings {
	/// Create settings rooted at `app_root` with the given secret.
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_conf::Settings;
	/// use std::path::PathBuf;
	///
	/// let settings = Settings::new(PathBuf::from("/srv/app"), "secret".to_string());
	/// assert_eq!(settings.views_root, PathBuf::from("/srv/app/app/views"));
	/// assert!(!settings.eval_cache);
	/// ```
	pub fn new(app_root: PathBuf, secret_key: String) -> Self {
		let views_root = app_root.join("app/views");
		Self {
			app_root,
			views_root,
			secret_key,
			..Self::default()
		}
	}
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			app_root: PathBuf::new(),
			views_root: PathBuf::new(),
			view_engine: "html".to_string(),
			controller_ext: "rs".to_string(),
			eval_cache: false,
			model_cache: true,
			log_actions: false,
			default_layout: None,
			default_locale: "en".to_string(),
			supported_locales: vec!["en".to_string()],
			secret_key: String::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_development_safe() {
		let settings = Settings::default();
		assert!(!settings.eval_cache);
		assert!(settings.model_cache);
		assert_eq!(settings.default_locale, "en");
		assert_eq!(settings.view_engine, "html");
	}

	#[test]
	fn new_derives_views_root() {
		let settings = Settings::new(PathBuf::from("/app"), "s".into());
		assert_eq!(settings.views_root, PathBuf::from("/app/app/views"));
	}
}
