//! Request-forgery protection.
//!
//! `protect_from_forgery` is meant to be called from inside a registered
//! before filter, consuming that filter's continuation: the chain only moves
//! on when the request passes.

use crate::context::{CsrfMeta, RequestContext};
use crate::queue::Next;
use hyper::{Method, StatusCode};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Session key holding the raw per-session token
pub const CSRF_SESSION_KEY: &str = "csrf_token";

/// Default request parameter carrying the signed token
pub const DEFAULT_CSRF_PARAM: &str = "authenticity_token";

const CSRF_TOKEN_LENGTH: usize = 32;

/// Signed token over the session token and the application secret
pub fn sign_token(token: &str, secret: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hasher.update(secret.as_bytes());
	hex::encode(hasher.finalize())
}

fn mint_token() -> String {
	rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(CSRF_TOKEN_LENGTH)
		.map(char::from)
		.collect()
}

enum SessionState {
	Absent,
	Fresh(String),
	Established(String),
}

impl RequestContext {
	/// Guard the dispatch against cross-site request forgery.
	///
	/// Three paths, keyed on session state:
	/// - no session: allow;
	/// - session without a stored token: mint and store one, publish the
	///   signed token, allow;
	/// - session with a stored token: publish the signed token; a POST must
	///   carry the matching signed token in `param_name` (default
	///   `authenticity_token`) or it is rejected with 403 and the chain
	///   halts; other methods are allowed.
	///
	/// # Examples
	///
	/// ```no_run
	/// use switchyard_controller::filters::Filter;
	///
	/// let guard = Filter::named("protect_from_forgery", |ctx, next| async move {
	///     ctx.protect_from_forgery(next, "app-secret", None).await;
	/// });
	/// ```
	pub async fn protect_from_forgery(&self, next: Next, secret: &str, param_name: Option<&str>) {
		let param = param_name.unwrap_or(DEFAULT_CSRF_PARAM).to_string();

		let state = {
			let mut guard = self.session();
			match guard.as_mut() {
				None => SessionState::Absent,
				Some(session) => match session.get::<String>(CSRF_SESSION_KEY) {
					Some(token) => SessionState::Established(token),
					None => {
						let token = mint_token();
						if session.set(CSRF_SESSION_KEY, token.clone()).is_err() {
							SessionState::Absent
						} else {
							SessionState::Fresh(token)
						}
					}
				},
			}
		};

		match state {
			SessionState::Absent => next.proceed(),
			SessionState::Fresh(token) => {
				self.publish_csrf(CsrfMeta {
					param,
					token: sign_token(&token, secret),
				});
				next.proceed();
			}
			SessionState::Established(token) => {
				let signed = sign_token(&token, secret);
				self.publish_csrf(CsrfMeta {
					param: param.clone(),
					token: signed.clone(),
				});
				if self.request().method == Method::POST {
					let provided = self.request().param(&param);
					if provided.as_deref() == Some(signed.as_str()) {
						next.proceed();
					} else {
						warn!(
							controller = %self.controller_name(),
							action = %self.action_name(),
							"incorrect authenticity token"
						);
						self.send_status(StatusCode::FORBIDDEN);
						// dropping `next` halts the chain
					}
				} else {
					next.proceed();
				}
			}
		}
	}

	/// Whether the forgery-protection filter ran and published credentials
	pub fn protected_from_forgery(&self) -> bool {
		self.csrf_meta().is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn signing_is_deterministic() {
		assert_eq!(sign_token("t", "s"), sign_token("t", "s"));
		assert_ne!(sign_token("t", "s"), sign_token("t", "other"));
	}

	#[test]
	fn minted_tokens_are_random() {
		let a = mint_token();
		let b = mint_token();
		assert_eq!(a.len(), CSRF_TOKEN_LENGTH);
		assert_ne!(a, b);
	}
}
