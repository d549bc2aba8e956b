//! View-renderer collaborator contract and render-time helpers.
//!
//! The controller layer never evaluates templates itself; it resolves a
//! template path, assembles locals and a layout name, and hands everything to
//! an implementation of [`ViewRenderer`].

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use switchyard_conf::Settings;
use switchyard_http::Result;

/// Variable namespace handed to a view
pub type Locals = serde_json::Map<String, Value>;

/// Options accompanying one render call
pub struct RenderOptions {
	pub locals: Locals,
	/// Layout template path, e.g. `layouts/application_layout`; `None`
	/// renders the bare view
	pub layout: Option<String>,
	pub debug: bool,
}

/// External view-rendering collaborator
#[async_trait]
pub trait ViewRenderer: Send + Sync {
	/// Render `template` with the given options, returning the final body
	async fn render(&self, template: &str, options: RenderOptions) -> Result<String>;
}

/// Merge `extra` into `base` without overriding keys `base` already set.
///
/// Render locals are assembled from several sources (explicit params,
/// sandbox, path helpers, helper sets); earlier sources win.
///
/// # Examples
///
/// ```
/// use switchyard_controller::view::{safe_merge, Locals};
/// use serde_json::json;
///
/// let mut base = Locals::new();
/// base.insert("title".into(), json!("explicit"));
/// let mut extra = Locals::new();
/// extra.insert("title".into(), json!("ignored"));
/// extra.insert("page".into(), json!(2));
/// safe_merge(&mut base, &extra);
/// assert_eq!(base["title"], json!("explicit"));
/// assert_eq!(base["page"], json!(2));
/// ```
pub fn safe_merge(base: &mut Locals, extra: &Locals) {
	for (key, value) in extra {
		if !base.contains_key(key) {
			base.insert(key.clone(), value.clone());
		}
	}
}

/// Controller- and application-level helper locals merged into every render
#[derive(Default)]
pub struct HelperSet {
	pub controller: Locals,
	pub app: Locals,
}

/// Resolves the baseline layout for a controller, caching the file-system
/// probe per controller name.
///
/// A controller named `posts` uses `posts_layout` when
/// `<views_root>/layouts/posts_layout.<ext>` exists, otherwise the shared
/// `application` layout.
pub struct LayoutResolver {
	views_root: PathBuf,
	view_engine: String,
	cache: Mutex<HashMap<String, String>>,
}

impl LayoutResolver {
	pub fn new(settings: &Settings) -> Self {
		Self {
			views_root: settings.views_root.clone(),
			view_engine: settings.view_engine.clone(),
			cache: Mutex::new(HashMap::new()),
		}
	}

	/// Baseline layout name for `controller`
	pub fn resolve(&self, controller: &str) -> String {
		let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
		if let Some(layout) = cache.get(controller) {
			return layout.clone();
		}
		let candidate = self
			.views_root
			.join("layouts")
			.join(format!("{}_layout.{}", controller, self.view_engine));
		let layout = if candidate.is_file() {
			controller.to_string()
		} else {
			"application".to_string()
		};
		cache.insert(controller.to_string(), layout.clone());
		layout
	}
}
