//! Instance pooling and the controller loader.
//!
//! With `eval_cache` enabled, controller instances are recycled across
//! requests instead of rebuilt: a finished dispatch marks itself for return
//! and the loader puts the instance back. Recycled instances skip
//! re-initialization, so their action tables and filter lists carry over.

use crate::controller::{Controller, ControllerSeed, Dispatched};
use crate::models::ModelRegistry;
use crate::registry::ControllerRegistry;
use crate::urls::UrlHelpers;
use crate::view::{HelperSet, LayoutResolver, ViewRenderer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use switchyard_conf::Settings;
use switchyard_http::{Error, Request, Result};
use tracing::debug;

/// Idle controller instances, keyed by controller name
#[derive(Default)]
pub struct InstancePool {
	idle: Mutex<HashMap<String, Vec<Controller>>>,
}

impl InstancePool {
	pub fn new() -> Self {
		Self::default()
	}

	/// Take an idle instance of `name`, if one is waiting
	pub fn checkout(&self, name: &str) -> Option<Controller> {
		self.idle
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.get_mut(name)
			.and_then(Vec::pop)
	}

	/// Return an instance for later reuse
	pub fn put(&self, ctl: Controller) {
		debug!(controller = %ctl.name(), id = ctl.id(), "returned to pool");
		self.idle
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.entry(ctl.name().to_string())
			.or_default()
			.push(ctl);
	}

	/// Idle instances currently held for `name`
	pub fn idle_count(&self, name: &str) -> usize {
		self.idle
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.get(name)
			.map(Vec::len)
			.unwrap_or(0)
	}
}

/// Builds controller instances and drives complete dispatches.
///
/// Owns every shared collaborator a controller needs (settings, renderer,
/// registries, pool), so constructing one instance is a matter of cloning
/// handles.
pub struct ControllerLoader {
	registry: Arc<ControllerRegistry>,
	pool: Arc<InstancePool>,
	settings: Arc<Settings>,
	renderer: Arc<dyn ViewRenderer>,
	models: Arc<ModelRegistry>,
	paths: Arc<UrlHelpers>,
	helpers: Arc<HelperSet>,
	layouts: LayoutResolver,
}

impl ControllerLoader {
	pub fn new(
		registry: Arc<ControllerRegistry>,
		settings: Arc<Settings>,
		renderer: Arc<dyn ViewRenderer>,
		models: Arc<ModelRegistry>,
		paths: Arc<UrlHelpers>,
		helpers: Arc<HelperSet>,
	) -> Self {
		let layouts = LayoutResolver::new(&settings);
		Self {
			registry,
			pool: Arc::new(InstancePool::new()),
			settings,
			renderer,
			models,
			paths,
			helpers,
			layouts,
		}
	}

	pub fn pool(&self) -> &Arc<InstancePool> {
		&self.pool
	}

	pub fn registry(&self) -> &Arc<ControllerRegistry> {
		&self.registry
	}

	/// Produce an instance of `name`: recycled from the pool when
	/// `eval_cache` is on and one is idle, freshly constructed otherwise.
	pub fn load(&self, name: &str) -> Result<Controller> {
		if self.settings.eval_cache {
			if let Some(ctl) = self.pool.checkout(name) {
				debug!(controller = %name, id = ctl.id(), "recycled from pool");
				return Ok(ctl);
			}
		}
		self.construct(name)
	}

	fn construct(&self, name: &str) -> Result<Controller> {
		let entry = self
			.registry
			.get(name)
			.ok_or_else(|| Error::UnknownController(name.to_string()))?;
		let def = entry.definition().ok_or_else(|| {
			Error::Invalid(format!("controller '{name}' was discovered but never defined"))
		})?;
		let base_layout = match self.settings.default_layout {
			Some(false) => None,
			_ => Some(self.layouts.resolve(name)),
		};
		Ok(Controller::new(ControllerSeed {
			id: self.registry.next_id(),
			name: name.to_string(),
			def,
			extras: entry.extras().clone(),
			base_layout,
			settings: self.settings.clone(),
			renderer: self.renderer.clone(),
			paths: self.paths.clone(),
			models: self.models.all(),
			helpers: self.helpers.clone(),
			registry: self.registry.clone(),
		}))
	}

	/// Load `name`, dispatch `action` for `request`, and return the
	/// instance to the pool when the dispatch asked for it.
	pub async fn dispatch(&self, name: &str, action: &str, request: Request) -> Result<Dispatched> {
		let mut ctl = self.load(name)?;
		let dispatched = ctl.perform(action, request).await?;
		if dispatched.info.pool_return {
			self.pool.put(ctl);
		}
		Ok(dispatched)
	}
}
