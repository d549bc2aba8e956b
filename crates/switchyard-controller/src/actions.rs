//! Action registration.

use crate::context::RequestContext;
use crate::queue::StepFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Boxed action callable.
///
/// Unlike filters, actions receive no explicit continuation: `render`,
/// `redirect` and `send` advance the dispatch on the action's behalf, and
/// [`RequestContext::advance`] is available for the rare bare action.
pub type ActionFn = Arc<dyn Fn(Arc<RequestContext>) -> StepFuture + Send + Sync>;

/// Mapping from action name to callable.
///
/// Action names are unique within one controller definition; registering a
/// name twice silently replaces the earlier callable.
#[derive(Default)]
pub struct ActionTable {
	actions: HashMap<String, ActionFn>,
}

impl ActionTable {
	/// Register `f` as the action `name`
	pub fn register<F, Fut>(&mut self, name: impl Into<String>, f: F)
	where
		F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		self.actions
			.insert(name.into(), Arc::new(move |ctx| Box::pin(f(ctx))));
	}

	pub fn get(&self, name: &str) -> Option<ActionFn> {
		self.actions.get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.actions.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.actions.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.actions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.actions.is_empty()
	}

	pub fn clear(&mut self) {
		self.actions.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn later_registration_replaces_earlier() {
		let marker = Arc::new(AtomicUsize::new(0));
		let mut table = ActionTable::default();
		let first = marker.clone();
		table.register("show", move |_ctx| {
			let m = first.clone();
			async move {
				m.store(1, Ordering::SeqCst);
			}
		});
		let second = marker.clone();
		table.register("show", move |_ctx| {
			let m = second.clone();
			async move {
				m.store(2, Ordering::SeqCst);
			}
		});
		assert_eq!(table.len(), 1);
		assert!(table.contains("show"));
		assert!(!table.contains("index"));
	}
}
