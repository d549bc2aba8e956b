//! Before/after filter registration.
//!
//! Filters are callables interposed around an action, optionally scoped to a
//! subset of actions. Each carries a stable name used for de-duplication
//! within one dispatch build and as the target of `skip_*` calls.

use crate::context::RequestContext;
use crate::queue::{Next, StepFuture};
use std::future::Future;
use std::sync::Arc;

/// Boxed filter callable
pub type FilterFn = Arc<dyn Fn(Arc<RequestContext>, Next) -> StepFuture + Send + Sync>;

/// Action-name scoping attached to a filter registration
#[derive(Debug, Clone, Default)]
pub struct FilterScope {
	pub only: Option<Vec<String>>,
	pub except: Option<Vec<String>>,
}

impl FilterScope {
	fn is_empty(&self) -> bool {
		self.only.is_none() && self.except.is_none()
	}
}

/// A named filter callable plus its scope.
///
/// The name defaults to the callable's type name, the closest analogue of a
/// named function; name filters explicitly whenever they are skipped or
/// shared between controllers.
///
/// # Examples
///
/// ```
/// use switchyard_controller::filters::Filter;
///
/// let filter = Filter::named("require_user", |_ctx, next| async move {
///     next.proceed();
/// })
/// .only(["edit", "destroy"]);
/// assert_eq!(filter.name(), "require_user");
/// ```
pub struct Filter {
	name: String,
	scope: FilterScope,
	call: FilterFn,
}

impl Filter {
	/// Create a filter named after its callable's type
	pub fn new<F, Fut>(f: F) -> Self
	where
		F: Fn(Arc<RequestContext>, Next) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let name = std::any::type_name::<F>().to_string();
		Self::build(name, f)
	}

	/// Create a filter with an explicit stable name
	pub fn named<F, Fut>(name: impl Into<String>, f: F) -> Self
	where
		F: Fn(Arc<RequestContext>, Next) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		Self::build(name.into(), f)
	}

	fn build<F, Fut>(name: String, f: F) -> Self
	where
		F: Fn(Arc<RequestContext>, Next) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		Self {
			name,
			scope: FilterScope::default(),
			call: Arc::new(move |ctx, next| Box::pin(f(ctx, next))),
		}
	}

	/// Restrict the filter to the listed actions
	pub fn only<I, S>(mut self, actions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scope.only = Some(actions.into_iter().map(Into::into).collect());
		self
	}

	/// Exclude the listed actions
	pub fn except<I, S>(mut self, actions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scope.except = Some(actions.into_iter().map(Into::into).collect());
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub(crate) fn scope(&self) -> Option<&FilterScope> {
		if self.scope.is_empty() {
			None
		} else {
			Some(&self.scope)
		}
	}

	pub(crate) fn callable(&self) -> FilterFn {
		self.call.clone()
	}
}

/// One ordered filter list (before or after)
#[derive(Default)]
pub struct FilterList {
	entries: Vec<Filter>,
}

impl FilterList {
	/// Add to the end of the list
	pub fn append(&mut self, filter: Filter) {
		self.entries.push(filter);
	}

	/// Add to the start of the list
	pub fn prepend(&mut self, filter: Filter) {
		self.entries.insert(0, filter);
	}

	/// Skip entries named `name`.
	///
	/// Without `only` the entries are removed outright. With `only` the
	/// listed actions are added to each matching entry's `except` set
	/// (created when absent), so the filter keeps firing elsewhere. Entries
	/// registered without any scope are left untouched by the scoped form.
	pub fn skip(&mut self, name: &str, only: Option<&[&str]>) {
		match only {
			None => self.entries.retain(|f| f.name != name),
			Some(actions) => {
				for entry in self.entries.iter_mut().filter(|f| f.name == name) {
					if entry.scope.is_empty() {
						continue;
					}
					let except = entry.scope.except.get_or_insert_with(Vec::new);
					except.extend(actions.iter().map(|a| a.to_string()));
				}
			}
		}
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub(crate) fn iter(&self) -> impl Iterator<Item = &Filter> {
		self.entries.iter()
	}
}

/// Before and after filter lists of one controller definition
#[derive(Default)]
pub struct FilterRegistry {
	pub before: FilterList,
	pub after: FilterList,
}

impl FilterRegistry {
	pub fn clear(&mut self) {
		self.before.clear();
		self.after.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn noop(name: &str) -> Filter {
		Filter::named(name, |_ctx, next: Next| async move {
			next.proceed();
		})
	}

	#[test]
	fn skip_without_scope_removes_entry() {
		let mut list = FilterList::default();
		list.append(noop("a"));
		list.append(noop("b"));
		list.skip("a", None);
		assert_eq!(list.len(), 1);
		assert_eq!(list.iter().next().unwrap().name(), "b");
	}

	#[test]
	fn scoped_skip_extends_except() {
		let mut list = FilterList::default();
		list.append(noop("auth").only(["edit"]));
		list.skip("auth", Some(&["edit"]));
		let entry = list.iter().next().unwrap();
		assert_eq!(entry.scope.except.as_deref(), Some(&["edit".to_string()][..]));
	}

	#[test]
	fn scoped_skip_ignores_unscoped_entries() {
		let mut list = FilterList::default();
		list.append(noop("log"));
		list.skip("log", Some(&["show"]));
		let entry = list.iter().next().unwrap();
		assert!(entry.scope.is_empty());
	}

	#[test]
	fn default_name_comes_from_callable_type() {
		let filter = Filter::new(|_ctx, next: Next| async move {
			next.proceed();
		});
		assert!(!filter.name().is_empty());
	}
}
