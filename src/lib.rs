//! # Switchyard
//!
//! A filter-queue web controller framework for Rust, in the spirit of
//! Rails-style controllers.
//!
//! Controllers are not types you inherit from: they are defined by plain
//! code that registers actions and filters against a blank instance. Every
//! request is dispatched through a freshly built queue (the applicable
//! before filters, the action, then the applicable after filters) and each step
//! cooperatively hands control to the next one through an explicit
//! continuation.
//!
//! ## Core Principles
//!
//! - **Composition over Inheritance**: controllers are assembled by running
//!   defining code and mixins against an instance
//! - **Explicit continuations**: a filter halts the chain by simply dropping
//!   its [`Next`](controller::Next), no sentinel return values
//! - **No globals**: registries, pools and settings are passed down behind
//!   `Arc`s
//! - **Async-First**: built on tokio and async/await from the ground up
//!
//! ## Example
//!
//! ```no_run
//! use switchyard::controller::prelude::*;
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

pub use switchyard_conf as conf;
pub use switchyard_controller as controller;
pub use switchyard_http as http;

pub use switchyard_conf::Settings;
pub use switchyard_controller::{
	Controller, ControllerLoader, ControllerRegistry, Dispatched, Filter, Next, Outcome,
	RequestContext,
};
pub use switchyard_http::{Error, Request, Response, Result, Session};
