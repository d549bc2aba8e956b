//! Per-request dispatch queue.
//!
//! Built fresh for every `perform` call from the applicable before filters,
//! the target action and the applicable after filters, then drained one step
//! at a time. A step runs only after the previous step invoked its
//! continuation; at most one step of a given request is ever in flight.

use crate::actions::{ActionFn, ActionTable};
use crate::context::RequestContext;
use crate::filters::{FilterFn, FilterList, FilterRegistry, FilterScope};
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use switchyard_http::{Error, Result};
use tokio::sync::oneshot;
use tracing::debug;

/// Boxed future returned by every queue step
pub type StepFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Continuation handed to a queue step.
///
/// The step must eventually call [`proceed`](Next::proceed) to advance the
/// cursor. Dropping the continuation instead halts the drain, which is how a
/// filter short-circuits the chain (an authorization failure, say). Moving
/// the `Next` into a spawned task keeps the dispatch suspended until the task
/// gets around to proceeding.
pub struct Next {
	tx: Option<oneshot::Sender<()>>,
}

impl Next {
	pub(crate) fn new(tx: oneshot::Sender<()>) -> Self {
		Self { tx: Some(tx) }
	}

	/// Hand control to the next queued step
	pub fn proceed(mut self) {
		if let Some(tx) = self.tx.take() {
			let _ = tx.send(());
		}
	}
}

/// How a drain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// Every step ran and proceeded
	Completed,
	/// A step released its continuation without proceeding
	Halted,
}

enum StepCall {
	Filter(FilterFn),
	Action(ActionFn),
}

struct Step {
	name: String,
	call: StepCall,
}

impl Step {
	fn is_action(&self) -> bool {
		matches!(self.call, StepCall::Action(_))
	}
}

/// Ordered steps of one dispatch
pub struct DispatchQueue {
	steps: VecDeque<Step>,
}

impl DispatchQueue {
	/// Assemble the queue for `action_name`.
	///
	/// Fails with [`Error::UndefinedAction`] before any step executes when
	/// the action is not registered.
	pub fn build(
		controller: &str,
		action_name: &str,
		actions: &ActionTable,
		filters: &FilterRegistry,
		pool_return: bool,
	) -> Result<Self> {
		let action = actions.get(action_name).ok_or_else(|| Error::UndefinedAction {
			controller: controller.to_string(),
			action: action_name.to_string(),
		})?;

		let mut steps = VecDeque::new();
		// one de-duplication index for the whole build pass
		let mut seen = HashSet::new();

		enqueue_filters(&mut steps, &mut seen, &filters.before, action_name);
		steps.push_back(Step {
			name: action_name.to_string(),
			call: StepCall::Action(action),
		});
		enqueue_filters(&mut steps, &mut seen, &filters.after, action_name);

		if pool_return {
			let back: FilterFn = Arc::new(|ctx: Arc<RequestContext>, next: Next| {
				Box::pin(async move {
					ctx.mark_pool_return();
					next.proceed();
				}) as StepFuture
			});
			steps.push_back(Step {
				name: "back_to_pool".to_string(),
				call: StepCall::Filter(back),
			});
		}

		Ok(Self { steps })
	}

	/// Step names in execution order, mainly for inspection and logging
	pub fn step_names(&self) -> Vec<&str> {
		self.steps.iter().map(|s| s.name.as_str()).collect()
	}

	pub fn len(&self) -> usize {
		self.steps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}

	/// Drain the queue against `ctx`, one step at a time.
	///
	/// Each step starts after a scheduler yield and the drain only moves on
	/// once the step's continuation fires. Per-step wall-clock time (start to
	/// continuation) lands in the context's action history; total elapsed
	/// time is recorded when the queue exhausts.
	pub async fn drain(mut self, ctx: Arc<RequestContext>) -> Outcome {
		let log_actions = ctx.settings().log_actions;
		while let Some(step) = self.steps.pop_front() {
			let (tx, rx) = oneshot::channel();
			let next = Next::new(tx);
			ctx.enter_step(step.is_action());

			if log_actions {
				debug!(">>> perform {}", step.name);
			}

			tokio::task::yield_now().await;
			let started = Instant::now();
			match &step.call {
				StepCall::Filter(f) => f(ctx.clone(), next).await,
				StepCall::Action(f) => {
					ctx.park_advance(next);
					f(ctx.clone()).await;
				}
			}

			match rx.await {
				Ok(()) => {
					let elapsed = started.elapsed();
					if log_actions {
						debug!("<<< {} [{} ms]", step.name, elapsed.as_millis());
					}
					ctx.record_step(&step.name, elapsed);
				}
				Err(_) => {
					debug!(step = %step.name, "dispatch halted");
					return Outcome::Halted;
				}
			}
		}
		ctx.finish();
		Outcome::Completed
	}
}

fn enqueue_filters(
	steps: &mut VecDeque<Step>,
	seen: &mut HashSet<String>,
	list: &FilterList,
	action_name: &str,
) {
	for filter in list.iter() {
		if !applies(filter.scope(), action_name) {
			continue;
		}
		if !seen.insert(filter.name().to_string()) {
			continue;
		}
		steps.push_back(Step {
			name: filter.name().to_string(),
			call: StepCall::Filter(filter.callable()),
		});
	}
}

// Scope eligibility. The `only` branch wins as soon as it matches, checking
// `except` on its own; the bare `except` branch is reached even when an
// unmatched `only` is present. Long-standing behavior, relied upon by
// existing controllers.
fn applies(scope: Option<&FilterScope>, action: &str) -> bool {
	let Some(scope) = scope else {
		return true;
	};
	let in_list = |list: &Option<Vec<String>>| {
		list.as_ref()
			.map(|names| names.iter().any(|n| n == action))
			.unwrap_or(false)
	};
	if scope.only.is_some() && in_list(&scope.only) && !in_list(&scope.except) {
		return true;
	}
	if let Some(except) = &scope.except {
		return !except.iter().any(|n| n == action);
	}
	false
}

#[cfg(test)]
mod tests {
	use super::*;

	fn scope(only: Option<&[&str]>, except: Option<&[&str]>) -> FilterScope {
		FilterScope {
			only: only.map(|a| a.iter().map(|s| s.to_string()).collect()),
			except: except.map(|a| a.iter().map(|s| s.to_string()).collect()),
		}
	}

	#[test]
	fn no_scope_always_applies() {
		assert!(applies(None, "show"));
	}

	#[test]
	fn only_scope_matches_listed_actions() {
		let s = scope(Some(&["show"]), None);
		assert!(applies(Some(&s), "show"));
		assert!(!applies(Some(&s), "index"));
	}

	#[test]
	fn except_scope_excludes_listed_actions() {
		let s = scope(None, Some(&["show"]));
		assert!(!applies(Some(&s), "show"));
		assert!(applies(Some(&s), "index"));
	}

	// Characterization: with both lists present, an action matching neither
	// `only` nor `except` still applies through the `except` branch.
	#[test]
	fn unmatched_only_falls_through_to_except_branch() {
		let s = scope(Some(&["show"]), Some(&["destroy"]));
		assert!(applies(Some(&s), "index"));
		assert!(applies(Some(&s), "show"));
		assert!(!applies(Some(&s), "destroy"));
	}

	#[test]
	fn only_match_is_vetoed_by_except() {
		let s = scope(Some(&["show"]), Some(&["show"]));
		assert!(!applies(Some(&s), "show"));
	}
}
