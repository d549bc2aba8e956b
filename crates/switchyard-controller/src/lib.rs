//! # Switchyard Controller
//!
//! Controller layer of the Switchyard framework: controllers are defined by
//! plain code running against an instance ([`ControllerDef`]), requests are
//! dispatched through a per-request queue of before filters, the action and
//! after filters ([`queue::DispatchQueue`]), and each step cooperatively
//! yields control through an explicit continuation ([`queue::Next`]).
//!
//! ```no_run
//! use switchyard_controller::prelude::*;
//!
//! let mut registry = ControllerRegistry::new();
//! registry.register("users", |ctl: &mut Controller| {
//! 	ctl.before(Filter::named("require_login", |_ctx, next| async move {
//! 		next.proceed();
//! 	}));
//! 	ctl.action("index", |ctx| async move {
//! 		ctx.send("all users");
//! 	});
//! });
//! ```

pub mod actions;
pub mod context;
pub mod controller;
pub mod csrf;
pub mod filters;
pub mod models;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod urls;
pub mod view;

pub use actions::{ActionFn, ActionTable};
pub use context::{CsrfMeta, RequestContext, StepTiming};
pub use controller::{Controller, ControllerDef, DispatchInfo, Dispatched};
pub use csrf::{CSRF_SESSION_KEY, DEFAULT_CSRF_PARAM, sign_token};
pub use filters::{Filter, FilterFn, FilterList, FilterRegistry, FilterScope};
pub use models::{ModelHandle, ModelRegistry};
pub use pool::{ControllerLoader, InstancePool};
pub use queue::{DispatchQueue, Next, Outcome, StepFuture};
pub use registry::{ControllerEntry, ControllerRegistry};
pub use urls::UrlHelpers;
pub use view::{HelperSet, LayoutResolver, Locals, RenderOptions, ViewRenderer, safe_merge};

/// Common imports for defining and dispatching controllers
pub mod prelude {
	pub use crate::context::RequestContext;
	pub use crate::controller::{Controller, ControllerDef, Dispatched};
	pub use crate::filters::Filter;
	pub use crate::pool::ControllerLoader;
	pub use crate::queue::{Next, Outcome};
	pub use crate::registry::ControllerRegistry;
}
