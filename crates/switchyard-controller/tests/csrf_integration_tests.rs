//! Forgery-protection integration tests
//!
//! Exercises the three session states the guard distinguishes (no session,
//! fresh session, established session) and the POST validation path.

use async_trait::async_trait;
use hyper::{Method, StatusCode};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use switchyard_conf::Settings;
use switchyard_controller::prelude::*;
use switchyard_controller::{
	CSRF_SESSION_KEY, CsrfMeta, DEFAULT_CSRF_PARAM, HelperSet, ModelRegistry, RenderOptions,
	UrlHelpers, ViewRenderer, sign_token,
};
use switchyard_http::{Request, Result, Session};

const SECRET: &str = "test-secret";

struct NullRenderer;

#[async_trait]
impl ViewRenderer for NullRenderer {
	async fn render(&self, _template: &str, _options: RenderOptions) -> Result<String> {
		Ok(String::new())
	}
}

/// Captured forgery credentials plus whether the action ran
#[derive(Default)]
struct Seen {
	meta: Option<CsrfMeta>,
	action_ran: bool,
}

fn guarded_loader(seen: Arc<Mutex<Seen>>) -> ControllerLoader {
	let mut registry = ControllerRegistry::new();
	registry.register("posts", move |ctl: &mut Controller| {
		let capture = seen.clone();
		ctl.before(Filter::named("protect_from_forgery", move |ctx, next| {
			let capture = capture.clone();
			async move {
				ctx.protect_from_forgery(next, SECRET, None).await;
				capture.lock().unwrap().meta = ctx.csrf_meta();
			}
		}));
		let capture = seen.clone();
		ctl.action("create", move |ctx| {
			let capture = capture.clone();
			async move {
				capture.lock().unwrap().action_ran = true;
				ctx.send("created");
			}
		});
	});
	ControllerLoader::new(
		Arc::new(registry),
		Arc::new(Settings::new(PathBuf::from("/nonexistent"), SECRET.to_string())),
		Arc::new(NullRenderer),
		Arc::new(ModelRegistry::new()),
		Arc::new(UrlHelpers::new()),
		Arc::new(HelperSet::default()),
	)
}

fn established_session(token: &str) -> Session {
	let mut session = Session::new();
	session.set(CSRF_SESSION_KEY, token.to_string()).unwrap();
	session
}

#[tokio::test]
async fn request_without_session_passes_through() {
	let seen = Arc::new(Mutex::new(Seen::default()));
	let loader = guarded_loader(seen.clone());
	let request = Request::builder()
		.method(Method::POST)
		.uri("/posts")
		.build()
		.unwrap();

	let dispatched = loader.dispatch("posts", "create", request).await.unwrap();

	assert_eq!(dispatched.info.outcome, Outcome::Completed);
	let seen = seen.lock().unwrap();
	assert!(seen.action_ran);
	assert!(seen.meta.is_none());
}

#[tokio::test]
async fn fresh_session_gets_a_token_and_passes() {
	let seen = Arc::new(Mutex::new(Seen::default()));
	let loader = guarded_loader(seen.clone());
	let request = Request::builder()
		.method(Method::POST)
		.uri("/posts")
		.session(Session::new())
		.build()
		.unwrap();

	let dispatched = loader.dispatch("posts", "create", request).await.unwrap();

	assert_eq!(dispatched.info.outcome, Outcome::Completed);
	let stored: Option<String> = dispatched
		.session
		.as_ref()
		.and_then(|s| s.get(CSRF_SESSION_KEY));
	let token = stored.expect("token stored in session");

	let seen = seen.lock().unwrap();
	assert!(seen.action_ran);
	let meta = seen.meta.as_ref().expect("credentials published");
	assert_eq!(meta.param, DEFAULT_CSRF_PARAM);
	assert_eq!(meta.token, sign_token(&token, SECRET));
}

#[tokio::test]
async fn post_without_token_is_rejected() {
	let seen = Arc::new(Mutex::new(Seen::default()));
	let loader = guarded_loader(seen.clone());
	let request = Request::builder()
		.method(Method::POST)
		.uri("/posts")
		.session(established_session("known-token"))
		.build()
		.unwrap();

	let dispatched = loader.dispatch("posts", "create", request).await.unwrap();

	assert_eq!(dispatched.info.outcome, Outcome::Halted);
	assert_eq!(dispatched.response.status, StatusCode::FORBIDDEN);
	assert!(!seen.lock().unwrap().action_ran);
}

#[tokio::test]
async fn post_with_wrong_token_is_rejected() {
	let seen = Arc::new(Mutex::new(Seen::default()));
	let loader = guarded_loader(seen);
	let request = Request::builder()
		.method(Method::POST)
		.uri("/posts")
		.session(established_session("known-token"))
		.form(DEFAULT_CSRF_PARAM, sign_token("other-token", SECRET))
		.build()
		.unwrap();

	let dispatched = loader.dispatch("posts", "create", request).await.unwrap();

	assert_eq!(dispatched.info.outcome, Outcome::Halted);
	assert_eq!(dispatched.response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_with_matching_token_passes() {
	let seen = Arc::new(Mutex::new(Seen::default()));
	let loader = guarded_loader(seen.clone());
	let request = Request::builder()
		.method(Method::POST)
		.uri("/posts")
		.session(established_session("known-token"))
		.form(DEFAULT_CSRF_PARAM, sign_token("known-token", SECRET))
		.build()
		.unwrap();

	let dispatched = loader.dispatch("posts", "create", request).await.unwrap();

	assert_eq!(dispatched.info.outcome, Outcome::Completed);
	assert!(seen.lock().unwrap().action_ran);
	assert_eq!(dispatched.response.body, "created");
}

#[tokio::test]
async fn get_with_established_session_passes_without_token() {
	let seen = Arc::new(Mutex::new(Seen::default()));
	let loader = guarded_loader(seen.clone());
	let request = Request::builder()
		.method(Method::GET)
		.uri("/posts/new")
		.session(established_session("known-token"))
		.build()
		.unwrap();

	let dispatched = loader.dispatch("posts", "create", request).await.unwrap();

	assert_eq!(dispatched.info.outcome, Outcome::Completed);
	let seen = seen.lock().unwrap();
	assert!(seen.action_ran);
	// credentials are still published so the form can embed them
	assert_eq!(
		seen.meta.as_ref().map(|m| m.token.as_str()),
		Some(sign_token("known-token", SECRET).as_str())
	);
}
