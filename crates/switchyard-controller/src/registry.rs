//! Controller registry and filesystem discovery.
//!
//! The registry maps controller names to their defining code plus any
//! shared context values, and hands out instance ids. It is built up front
//! by the application and then passed down behind an `Arc`; nothing here is
//! process-global.

use crate::controller::ControllerDef;
use crate::view::Locals;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use switchyard_http::{Error, Result};
use tracing::{debug, warn};

/// One registered controller name
pub struct ControllerEntry {
	def: Option<Arc<dyn ControllerDef>>,
	source: Option<PathBuf>,
	extras: Arc<Locals>,
}

impl ControllerEntry {
	/// Source file the name was discovered from, if any
	pub fn source(&self) -> Option<&Path> {
		self.source.as_deref()
	}

	/// Shared context values attached at registration time
	pub fn extras(&self) -> &Arc<Locals> {
		&self.extras
	}

	pub(crate) fn definition(&self) -> Option<Arc<dyn ControllerDef>> {
		self.def.clone()
	}
}

/// Name-keyed controller catalog
#[derive(Default)]
pub struct ControllerRegistry {
	entries: HashMap<String, ControllerEntry>,
	next_id: AtomicU64,
}

impl ControllerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register (or re-register) the defining code for `name`.
	///
	/// A prior discovery entry keeps its source path and context values;
	/// only the definition is updated.
	pub fn register<D>(&mut self, name: impl Into<String>, def: D)
	where
		D: ControllerDef + 'static,
	{
		self.register_arc(name.into(), Arc::new(def));
	}

	/// Like [`register`](Self::register), additionally attaching shared
	/// context values the controller can read via `extra`.
	pub fn register_with_context<D>(&mut self, name: impl Into<String>, def: D, extras: Locals)
	where
		D: ControllerDef + 'static,
	{
		let name = name.into();
		self.register_arc(name.clone(), Arc::new(def));
		if let Some(entry) = self.entries.get_mut(&name) {
			entry.extras = Arc::new(extras);
		}
	}

	fn register_arc(&mut self, name: String, def: Arc<dyn ControllerDef>) {
		match self.entries.get_mut(&name) {
			Some(entry) => entry.def = Some(def),
			None => {
				self.entries.insert(
					name,
					ControllerEntry {
						def: Some(def),
						source: None,
						extras: Arc::new(Locals::new()),
					},
				);
			}
		}
	}

	/// Walk `base` recursively and register every `*_controller.<ext>` file
	/// found, keyed by its path-qualified stem (`admin/users` for
	/// `admin/users_controller.rs`). Already-registered names are left
	/// untouched. Returns how many names were added.
	///
	/// Discovered entries carry no definition until [`register`](Self::register)
	/// supplies one; loading such a name fails.
	pub fn add_base_path(&mut self, base: &Path, ext: &str, extras: Arc<Locals>) -> Result<usize> {
		let pattern = Regex::new(&format!(r"^(.+)_controller\.{}$", regex::escape(ext)))
			.map_err(|e| Error::Internal(e.to_string()))?;
		self.scan_dir(base, "", &pattern, &extras)
	}

	fn scan_dir(
		&mut self,
		dir: &Path,
		prefix: &str,
		pattern: &Regex,
		extras: &Arc<Locals>,
	) -> Result<usize> {
		let mut added = 0;
		let entries = std::fs::read_dir(dir)
			.map_err(|e| Error::Invalid(format!("cannot read {}: {e}", dir.display())))?;
		for entry in entries {
			let entry = entry.map_err(|e| Error::Internal(e.to_string()))?;
			let path = entry.path();
			let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
				continue;
			};
			if path.is_dir() {
				let nested = format!("{prefix}{file_name}/");
				added += self.scan_dir(&path, &nested, pattern, extras)?;
				continue;
			}
			let Some(captures) = pattern.captures(file_name) else {
				continue;
			};
			let name = format!("{prefix}{}", &captures[1]);
			if self.entries.contains_key(&name) {
				warn!(controller = %name, "already registered, keeping existing entry");
				continue;
			}
			debug!(controller = %name, source = %path.display(), "discovered");
			self.entries.insert(
				name,
				ControllerEntry {
					def: None,
					source: Some(path),
					extras: extras.clone(),
				},
			);
			added += 1;
		}
		Ok(added)
	}

	pub fn get(&self, name: &str) -> Option<&ControllerEntry> {
		self.entries.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub(crate) fn definition(&self, name: &str) -> Option<Arc<dyn ControllerDef>> {
		self.entries.get(name).and_then(|e| e.definition())
	}

	pub(crate) fn next_id(&self) -> u64 {
		self.next_id.fetch_add(1, Ordering::Relaxed)
	}
}
