//! Request-scoped execution context.
//!
//! One `RequestContext` is built per `perform` call and shared by every step
//! of that dispatch. It owns the request/response pair, the sandbox scratch
//! storage, the parked continuation of the action step, and the execution
//! history. Two different requests never share a context.

use crate::queue::Next;
use crate::urls::UrlHelpers;
use crate::view::{safe_merge, HelperSet, Locals, RenderOptions, ViewRenderer};
use hyper::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use switchyard_conf::Settings;
use switchyard_http::{Request, Response, Session};
use tracing::{debug, error, warn};

/// Per-step timing entry of the execution history
#[derive(Debug, Clone)]
pub struct StepTiming {
	pub name: String,
	pub elapsed: Duration,
}

/// Credentials published by the forgery-protection filter
#[derive(Debug, Clone)]
pub struct CsrfMeta {
	/// Request parameter carrying the token
	pub param: String,
	/// Signed token expected from the client
	pub token: String,
}

/// Request-scoped state shared by all steps of one dispatch
pub struct RequestContext {
	controller_name: String,
	action_name: String,
	locale: String,
	settings: Arc<Settings>,
	renderer: Arc<dyn ViewRenderer>,
	paths: Arc<UrlHelpers>,
	helpers: Arc<HelperSet>,
	buffer: Arc<Mutex<Locals>>,
	layout: Mutex<Option<String>>,
	request: Request,
	session: Mutex<Option<Session>>,
	response: Mutex<Response>,
	sandbox: Mutex<Locals>,
	flash_fallback: Mutex<Vec<(String, String)>>,
	csrf: Mutex<Option<CsrfMeta>>,
	advance_slot: Mutex<Option<Next>>,
	in_action: AtomicBool,
	history: Mutex<Vec<StepTiming>>,
	started: Instant,
	elapsed: Mutex<Option<Duration>>,
	pool_return: AtomicBool,
}

pub(crate) struct ContextSeed {
	pub controller_name: String,
	pub action_name: String,
	pub locale: String,
	pub settings: Arc<Settings>,
	pub renderer: Arc<dyn ViewRenderer>,
	pub paths: Arc<UrlHelpers>,
	pub helpers: Arc<HelperSet>,
	pub buffer: Arc<Mutex<Locals>>,
	pub layout: Option<String>,
	pub request: Request,
}

impl RequestContext {
	pub(crate) fn new(mut seed: ContextSeed) -> Self {
		let session = seed.request.session.take();
		Self {
			controller_name: seed.controller_name,
			action_name: seed.action_name,
			locale: seed.locale,
			settings: seed.settings,
			renderer: seed.renderer,
			paths: seed.paths,
			helpers: seed.helpers,
			buffer: seed.buffer,
			layout: Mutex::new(seed.layout),
			request: seed.request,
			session: Mutex::new(session),
			response: Mutex::new(Response::ok()),
			sandbox: Mutex::new(Locals::new()),
			flash_fallback: Mutex::new(Vec::new()),
			csrf: Mutex::new(None),
			advance_slot: Mutex::new(None),
			in_action: AtomicBool::new(false),
			history: Mutex::new(Vec::new()),
			started: Instant::now(),
			elapsed: Mutex::new(None),
			pool_return: AtomicBool::new(false),
		}
	}

	// --- accessors ------------------------------------------------------

	pub fn controller_name(&self) -> &str {
		&self.controller_name
	}

	pub fn action_name(&self) -> &str {
		&self.action_name
	}

	pub fn locale(&self) -> &str {
		&self.locale
	}

	pub fn request(&self) -> &Request {
		&self.request
	}

	/// Shortcut for [`Request::param`]
	pub fn param(&self, name: &str) -> Option<String> {
		self.request.param(name)
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn paths(&self) -> &UrlHelpers {
		&self.paths
	}

	/// Session attached to this request, if any
	pub fn session(&self) -> MutexGuard<'_, Option<Session>> {
		self.session.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Response accumulated so far
	pub fn response(&self) -> MutexGuard<'_, Response> {
		self.response.lock().unwrap_or_else(|e| e.into_inner())
	}

	// --- sandbox and publish buffer -------------------------------------

	/// Store a value in the per-request sandbox
	pub fn sandbox_insert(&self, key: impl Into<String>, value: Value) {
		self.sandbox
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.insert(key.into(), value);
	}

	/// Read a value from the per-request sandbox
	pub fn sandbox_get(&self, key: &str) -> Option<Value> {
		self.sandbox
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.get(key)
			.cloned()
	}

	/// Publish a value into the controller's shared buffer
	pub fn publish(&self, name: impl Into<String>, value: Value) {
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

	// --- layout ---------------------------------------------------------

	/// Current layout name for this request, e.g. `application`
	pub fn layout(&self) -> Option<String> {
		self.layout.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	/// Override the layout for the remainder of this request
	pub fn set_layout(&self, layout: impl Into<String>) {
		*self.layout.lock().unwrap_or_else(|e| e.into_inner()) = Some(layout.into());
	}

	/// Disable the layout for the remainder of this request
	pub fn clear_layout(&self) {
		*self.layout.lock().unwrap_or_else(|e| e.into_inner()) = None;
	}

	// --- flash ----------------------------------------------------------

	/// Accumulate a flash message for the next request.
	///
	/// Stored in the session when one is attached, otherwise kept with the
	/// request so the caller can still read it after dispatch.
	pub fn flash(&self, kind: impl Into<String>, message: impl Into<String>) {
		let kind = kind.into();
		let message = message.into();
		let mut session = self.session();
		if let Some(session) = session.as_mut() {
			let mut entries: Vec<(String, String)> = session.get("__flash").unwrap_or_default();
			entries.push((kind.clone(), message.clone()));
			if session.set("__flash", entries).is_ok() {
				return;
			}
		}
		drop(session);
		self.flash_fallback
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.push((kind, message));
	}

	/// Flash messages that could not be stored in a session
	pub fn flash_messages(&self) -> Vec<(String, String)> {
		self.flash_fallback
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.clone()
	}

	// --- csrf meta ------------------------------------------------------

	pub(crate) fn publish_csrf(&self, meta: CsrfMeta) {
		*self.csrf.lock().unwrap_or_else(|e| e.into_inner()) = Some(meta);
	}

	/// Credentials published by the forgery-protection filter, if it ran
	pub fn csrf_meta(&self) -> Option<CsrfMeta> {
		self.csrf.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	// --- response primitives --------------------------------------------

	/// Render the view named after the current action
	pub async fn render(&self, locals: Locals) {
		let view = self.action_name.clone();
		self.render_view(&view, locals).await;
	}

	/// Render an explicit view of this controller.
	///
	/// Locals are assembled by safe merge: explicit params first, then the
	/// sandbox, path helpers, controller helpers and application helpers;
	/// earlier sources win. A second render call on the same response is a
	/// logged no-op. When the current step is the action, the dispatch
	/// advances automatically afterwards.
	pub async fn render_view(&self, view: &str, locals: Locals) {
		let template = format!("{}/{}", self.controller_name, view);
		let layout = self.layout().map(|l| format!("layouts/{}_layout", l));

		if self.response().render_called {
			warn!(
				template = %template,
				"render called twice for one response; ignoring"
			);
			self.advance_if_action();
			return;
		}

		let mut merged = locals;
		if !merged.contains_key("controller_name") {
			merged.insert(
				"controller_name".to_string(),
				Value::String(self.controller_name.clone()),
			);
		}
		if !merged.contains_key("action_name") {
			merged.insert(
				"action_name".to_string(),
				Value::String(self.action_name.clone()),
			);
		}
		{
			let sandbox = self.sandbox.lock().unwrap_or_else(|e| e.into_inner());
			safe_merge(&mut merged, &sandbox);
		}
		safe_merge(&mut merged, &self.paths.to_locals());
		safe_merge(&mut merged, &self.helpers.controller);
		safe_merge(&mut merged, &self.helpers.app);

		debug!(template = %template, layout = ?layout, "rendering");
		let rendered = self
			.renderer
			.render(
				&template,
				RenderOptions {
					locals: merged,
					layout,
					debug: false,
				},
			)
			.await;

		{
			let mut response = self.response();
			response.render_called = true;
			match rendered {
				Ok(body) => {
					response.status = StatusCode::OK;
					response.headers.insert(
						hyper::header::CONTENT_TYPE,
						hyper::header::HeaderValue::from_static("text/html; charset=utf-8"),
					);
					response.body = body.into();
				}
				Err(e) => {
					error!(template = %template, error = %e, "view rendering failed");
					response.status = StatusCode::INTERNAL_SERVER_ERROR;
					response.body = Default::default();
				}
			}
		}
		self.advance_if_action();
	}

	/// Redirect the client to `path`
	pub fn redirect(&self, path: impl AsRef<str>) {
		let path = path.as_ref();
		debug!(path = %path, "redirect");
		{
			let mut response = self.response();
			response.status = StatusCode::FOUND;
			if let Ok(value) = path.parse() {
				response.headers.insert(hyper::header::LOCATION, value);
			}
		}
		self.advance_if_action();
	}

	/// Send a raw response body
	pub fn send(&self, body: impl Into<bytes::Bytes>) {
		{
			let mut response = self.response();
			response.body = body.into();
		}
		self.advance_if_action();
	}

	/// Send a bare status code
	pub fn send_status(&self, status: StatusCode) {
		{
			let mut response = self.response();
			response.status = status;
		}
		self.advance_if_action();
	}

	// --- continuation plumbing ------------------------------------------

	/// Advance the dispatch from the action step by hand.
	///
	/// Filters receive their continuation as an explicit argument instead.
	pub fn advance(&self) {
		let next = self
			.advance_slot
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.take();
		if let Some(next) = next {
			next.proceed();
		}
	}

	fn advance_if_action(&self) {
		if self.in_action.load(Ordering::SeqCst) {
			self.advance();
		}
	}

	pub(crate) fn enter_step(&self, is_action: bool) {
		self.in_action.store(is_action, Ordering::SeqCst);
	}

	pub(crate) fn park_advance(&self, next: Next) {
		*self
			.advance_slot
			.lock()
			.unwrap_or_else(|e| e.into_inner()) = Some(next);
	}

	pub(crate) fn mark_pool_return(&self) {
		self.pool_return.store(true, Ordering::SeqCst);
	}

	pub(crate) fn pool_return(&self) -> bool {
		self.pool_return.load(Ordering::SeqCst)
	}

	// --- history and timing ---------------------------------------------

	pub(crate) fn record_step(&self, name: &str, elapsed: Duration) {
		self.history
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.push(StepTiming {
				name: name.to_string(),
				elapsed,
			});
	}

	pub(crate) fn finish(&self) {
		*self.elapsed.lock().unwrap_or_else(|e| e.into_inner()) =
			Some(self.started.elapsed());
	}

	/// Ordered per-step execution history
	pub fn history(&self) -> Vec<StepTiming> {
		self.history
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.clone()
	}

	pub(crate) fn total_elapsed(&self) -> Option<Duration> {
		*self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub(crate) fn take_response(&self) -> Response {
		std::mem::take(&mut *self.response())
	}

	pub(crate) fn take_session(&self) -> Option<Session> {
		self.session().take()
	}
}
