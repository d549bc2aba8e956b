//! Facade crate smoke tests
//!
//! End-to-end dispatch through the re-exported surface only.

use std::path::PathBuf;
use std::sync::Arc;
use switchyard::controller::{HelperSet, ModelRegistry, RenderOptions, UrlHelpers, ViewRenderer};
use switchyard::{
	Controller, ControllerLoader, ControllerRegistry, Filter, Outcome, Request, Result, Settings,
};

struct NullRenderer;

#[async_trait::async_trait]
impl ViewRenderer for NullRenderer {
	async fn render(&self, _template: &str, _options: RenderOptions) -> Result<String> {
		Ok(String::new())
	}
}

#[tokio::test]
async fn dispatch_through_the_facade() {
	let mut registry = ControllerRegistry::new();
	registry.register("greetings", |ctl: &mut Controller| {
		ctl.before(Filter::named("stamp", |ctx, next| async move {
			ctx.sandbox_insert("stamped", serde_json::json!(true));
			next.proceed();
		}));
		ctl.action("hello", |ctx| async move {
			ctx.send("hello from switchyard");
		});
	});

	let loader = ControllerLoader::new(
		Arc::new(registry),
		Arc::new(Settings::new(PathBuf::from("/app"), "secret".to_string())),
		Arc::new(NullRenderer),
		Arc::new(ModelRegistry::new()),
		Arc::new(UrlHelpers::new()),
		Arc::new(HelperSet::default()),
	);

	let request = Request::builder().uri("/hello").build().unwrap();
	let dispatched = loader.dispatch("greetings", "hello", request).await.unwrap();

	assert_eq!(dispatched.info.outcome, Outcome::Completed);
	assert_eq!(dispatched.response.body, "hello from switchyard");
}
