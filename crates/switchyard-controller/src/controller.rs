//! Controller instances and per-request dispatch.
//!
//! A controller is not inherited from, it is loaded and mixed: a
//! [`ControllerDef`] registers actions and filters against a blank instance,
//! and `perform` drives one request through the resulting dispatch queue.

use crate::actions::ActionTable;
use crate::context::{ContextSeed, RequestContext, StepTiming};
use crate::filters::{Filter, FilterRegistry};
use crate::models::ModelHandle;
use crate::queue::{DispatchQueue, Outcome};
use crate::registry::ControllerRegistry;
use crate::urls::UrlHelpers;
use crate::view::{HelperSet, Locals, ViewRenderer};
use hyper::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchyard_conf::Settings;
use switchyard_http::{Error, Request, Response, Result, Session};
use tracing::{debug, info};

/// Code that defines a controller: registers actions, filters, published
/// values and the layout against a fresh (or re-initialized) instance.
///
/// Plain closures implement it:
///
/// ```
/// use switchyard_controller::controller::Controller;
///
/// let definition = |ctl: &mut Controller| {
///     ctl.action("index", |ctx| async move {
///         ctx.send("hello");
///     });
/// };
/// ```
pub trait ControllerDef: Send + Sync {
	fn configure(&self, ctl: &mut Controller);
}

impl<F> ControllerDef for F
where
	F: Fn(&mut Controller) + Send + Sync,
{
	fn configure(&self, ctl: &mut Controller) {
		self(ctl)
	}
}

/// Everything a dispatch produced: the response, the (possibly updated)
/// session, and observability data
#[derive(Debug)]
pub struct Dispatched {
	pub response: Response,
	pub session: Option<Session>,
	pub info: DispatchInfo,
}

/// Observability record of one dispatch
#[derive(Debug, Clone)]
pub struct DispatchInfo {
	pub controller: String,
	pub action: String,
	/// Total elapsed time; only recorded when the queue fully drained
	pub elapsed: Option<Duration>,
	pub history: Vec<StepTiming>,
	pub outcome: Outcome,
	pub(crate) pool_return: bool,
}

pub(crate) struct ControllerSeed {
	pub id: u64,
	pub name: String,
	pub def: Arc<dyn ControllerDef>,
	pub extras: Arc<Locals>,
	pub base_layout: Option<String>,
	pub settings: Arc<Settings>,
	pub renderer: Arc<dyn ViewRenderer>,
	pub paths: Arc<UrlHelpers>,
	pub models: HashMap<String, ModelHandle>,
	pub helpers: Arc<HelperSet>,
	pub registry: Arc<ControllerRegistry>,
}

/// A per-request-capable controller instance.
///
/// Created by the loader (fresh or recycled from the pool); the first
/// `perform` call runs the defining code through [`Controller::init`].
pub struct Controller {
	id: u64,
	name: String,
	def: Arc<dyn ControllerDef>,
	extras: Arc<Locals>,
	settings: Arc<Settings>,
	renderer: Arc<dyn ViewRenderer>,
	paths: Arc<UrlHelpers>,
	model_registry: HashMap<String, ModelHandle>,
	helpers: Arc<HelperSet>,
	registry: Arc<ControllerRegistry>,
	base_layout: Option<String>,
	layout: Option<String>,
	locale: String,
	actions: ActionTable,
	filters: FilterRegistry,
	buffer: Arc<Mutex<Locals>>,
	models: HashMap<String, ModelHandle>,
	redacted_params: Vec<String>,
	initialized: bool,
}

impl Controller {
	pub(crate) fn new(seed: ControllerSeed) -> Self {
		let locale = seed.settings.default_locale.clone();
		Self {
			id: seed.id,
			name: seed.name,
			def: seed.def,
			extras: seed.extras,
			base_layout: seed.base_layout.clone(),
			layout: seed.base_layout,
			locale,
			settings: seed.settings,
			renderer: seed.renderer,
			paths: seed.paths,
			model_registry: seed.models,
			helpers: seed.helpers,
			registry: seed.registry,
			actions: ActionTable::default(),
			filters: FilterRegistry::default(),
			buffer: Arc::new(Mutex::new(Locals::new())),
			models: HashMap::new(),
			redacted_params: vec!["password".to_string()],
			initialized: false,
		}
	}

	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	// --- registration API (used from ControllerDef::configure) ----------

	/// Register an action under `name`
	pub fn action<F, Fut>(&mut self, name: impl Into<String>, f: F)
	where
		F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		self.actions.register(name, f);
	}

	/// Schedule a before filter at the end of the list
	pub fn before(&mut self, filter: Filter) {
		self.filters.before.append(filter);
	}

	/// Schedule a before filter at the start of the list
	pub fn prepend_before(&mut self, filter: Filter) {
		self.filters.before.prepend(filter);
	}

	/// Append an after filter
	pub fn after(&mut self, filter: Filter) {
		self.filters.after.append(filter);
	}

	/// Prepend an after filter
	pub fn prepend_after(&mut self, filter: Filter) {
		self.filters.after.prepend(filter);
	}

	/// Skip before filters named `name`; see [`crate::filters::FilterList::skip`]
	pub fn skip_before(&mut self, name: &str, only: Option<&[&str]>) {
		self.filters.before.skip(name, only);
	}

	/// Skip after filters named `name`
	pub fn skip_after(&mut self, name: &str, only: Option<&[&str]>) {
		self.filters.after.skip(name, only);
	}

	/// Whether the controller responds to `action`
	pub fn respond_to(&self, action: &str) -> bool {
		self.actions.contains(action)
	}

	/// Current layout name
	pub fn layout(&self) -> Option<&str> {
		self.layout.as_deref()
	}

	/// Set the layout for this controller scope
	pub fn set_layout(&mut self, layout: impl Into<String>) {
		self.layout = Some(layout.into());
	}

	/// Disable the layout for this controller scope
	pub fn clear_layout(&mut self) {
		self.layout = None;
	}

	/// Current locale
	pub fn locale(&self) -> &str {
		&self.locale
	}

	/// Set the locale, falling back to the default for unsupported ones
	pub fn set_locale(&mut self, locale: &str) {
		self.locale = if self.settings.supported_locales.iter().any(|l| l == locale) {
			locale.to_string()
		} else {
			self.settings.default_locale.clone()
		};
	}

	/// Publish a value into the controller's shared buffer
	pub fn publish(&mut self, name: impl Into<String>, value: Value) {
		self.buffer
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.insert(name.into(), value);
	}

	/// Read a previously published value
	pub fn use_published(&self, name: &str) -> Option<Value> {
		self.buffer
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.get(name)
			.cloned()
	}

	/// Context value shared by the registry for this controller name
	pub fn extra(&self, name: &str) -> Option<&Value> {
		self.extras.get(name)
	}

	/// Model handle republished on the last `init`
	pub fn model(&self, name: &str) -> Option<ModelHandle> {
		self.models.get(name).cloned()
	}

	/// Extend the list of body parameters redacted from request logs
	pub fn filter_parameter_logging<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.redacted_params.extend(names.into_iter().map(Into::into));
	}

	/// Body parameters redacted from request logs
	pub fn redacted_params(&self) -> &[String] {
		&self.redacted_params
	}

	/// Run another registered controller definition against this instance
	pub fn load_mixin(&mut self, name: &str) -> Result<()> {
		let def = self
			.registry
			.definition(name)
			.ok_or_else(|| Error::UnknownController(name.to_string()))?;
		def.configure(self);
		Ok(())
	}

	// --- lifecycle ------------------------------------------------------

	/// Reset scope-level state and re-run the defining code.
	///
	/// Clears the action table, both filter lists and the publish buffer,
	/// restores the construction-time layout, republishes model handles and
	/// then replays [`ControllerDef::configure`]. Safe to run repeatedly.
	pub fn init(&mut self) {
		self.actions.clear();
		self.filters.clear();
		self.buffer
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.clear();
		self.layout = self.base_layout.clone();
		self.models = self.model_registry.clone();
		let def = self.def.clone();
		def.configure(self);
	}

	/// The filter/action queue that dispatching `action` would run, by step
	/// name. Initializes the instance when needed.
	pub fn dispatch_plan(&mut self, action: &str) -> Result<Vec<String>> {
		self.ensure_initialized();
		let queue = DispatchQueue::build(
			&self.name,
			action,
			&self.actions,
			&self.filters,
			self.settings.eval_cache,
		)?;
		Ok(queue.step_names().into_iter().map(String::from).collect())
	}

	fn ensure_initialized(&mut self) {
		if !self.initialized {
			self.initialized = true;
			self.init();
		}
	}

	// --- dispatch -------------------------------------------------------

	/// Dispatch `action` for `request`.
	///
	/// Builds the queue (failing fast on an undefined action, before any
	/// step runs), seeds a fresh request context, drains the queue and
	/// returns the accumulated response together with dispatch
	/// observability data.
	pub async fn perform(&mut self, action: &str, request: Request) -> Result<Dispatched> {
		self.ensure_initialized();
		self.log_request(action, &request);

		let queue = DispatchQueue::build(
			&self.name,
			action,
			&self.actions,
			&self.filters,
			self.settings.eval_cache,
		)?;

		let ctx = Arc::new(RequestContext::new(ContextSeed {
			controller_name: self.name.clone(),
			action_name: action.to_string(),
			locale: self.locale.clone(),
			settings: self.settings.clone(),
			renderer: self.renderer.clone(),
			paths: self.paths.clone(),
			helpers: self.helpers.clone(),
			buffer: self.buffer.clone(),
			layout: self.layout.clone(),
			request,
		}));

		let outcome = queue.drain(ctx.clone()).await;

		let info = DispatchInfo {
			controller: self.name.clone(),
			action: action.to_string(),
			elapsed: ctx.total_elapsed(),
			history: ctx.history(),
			outcome,
			pool_return: ctx.pool_return(),
		};
		Ok(Dispatched {
			response: ctx.take_response(),
			session: ctx.take_session(),
			info,
		})
	}

	fn log_request(&self, action: &str, request: &Request) {
		info!(
			id = self.id,
			method = %request.method,
			url = %request.uri,
			controller = %self.name,
			action = %action,
			"dispatching"
		);
		if !request.query().is_empty() {
			debug!(
				"query: {}",
				serde_json::to_string(request.query()).unwrap_or_default()
			);
		}
		if request.method != Method::GET && !request.form.is_empty() {
			let filtered = redact_form(&self.redacted_params, &request.form);
			debug!(
				"body: {}",
				serde_json::to_string(&filtered).unwrap_or_default()
			);
		}
	}
}

/// Loggable copy of a form, with values of redacted parameters masked.
/// Redaction matches by substring, so `password` also covers
/// `password_confirmation`.
fn redact_form<'a>(
	redacted: &[String],
	form: &'a HashMap<String, String>,
) -> HashMap<&'a str, &'a str> {
	form.iter()
		.map(|(key, value)| {
			let masked = redacted.iter().any(|needle| key.contains(needle.as_str()));
			(key.as_str(), if masked { "[FILTERED]" } else { value.as_str() })
		})
		.collect()
}

impl std::fmt::Debug for Controller {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Controller")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("actions", &self.actions.len())
			.field("initialized", &self.initialized)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn redaction_masks_by_substring() {
		let redacted = vec!["password".to_string(), "token".to_string()];
		let mut form = HashMap::new();
		form.insert("username".to_string(), "alice".to_string());
		form.insert("password".to_string(), "hunter2".to_string());
		form.insert("password_confirmation".to_string(), "hunter2".to_string());
		form.insert("api_token".to_string(), "abc123".to_string());

		let filtered = redact_form(&redacted, &form);

		assert_eq!(filtered["username"], "alice");
		assert_eq!(filtered["password"], "[FILTERED]");
		assert_eq!(filtered["password_confirmation"], "[FILTERED]");
		assert_eq!(filtered["api_token"], "[FILTERED]");
	}
}
