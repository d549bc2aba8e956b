use bytes::Bytes;
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;

use crate::{Error, Result};

/// HTTP response accumulated over one controller dispatch.
///
/// Steps mutate the response through the request context; the server layer
/// writes it out once the dispatch queue drains.
#[derive(Debug)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Set the first time a view render lands on this response. A second
	/// render call is a logged no-op.
	pub render_called: bool,
}

impl Response {
	/// Create a new response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			render_called: false,
		}
	}

	/// HTTP 200 OK
	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// HTTP 403 Forbidden
	pub fn forbidden() -> Self {
		Self::new(StatusCode::FORBIDDEN)
	}

	/// HTTP 404 Not Found
	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	/// HTTP 500 Internal Server Error
	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	/// HTTP 302 Found pointing at `location`
	///
	/// # Examples
	///
	/// ```
	/// use switchyard_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::found("/posts");
	/// assert_eq!(response.status, StatusCode::FOUND);
	/// assert_eq!(response.headers.get("location").unwrap(), "/posts");
	/// ```
	pub fn found(location: impl AsRef<str>) -> Self {
		Self::new(StatusCode::FOUND).with_location(location.as_ref())
	}

	/// Replace the body
	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Serialize `value` as the JSON body and set the content type
	pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self> {
		let body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
		self.body = Bytes::from(body);
		self.headers.insert(
			hyper::header::CONTENT_TYPE,
			hyper::header::HeaderValue::from_static("application/json"),
		);
		Ok(self)
	}

	/// Set the Location header
	pub fn with_location(mut self, location: &str) -> Self {
		if let Ok(value) = location.parse() {
			self.headers.insert(hyper::header::LOCATION, value);
		}
		self
	}
}

impl Default for Response {
	fn default() -> Self {
		Self::ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_body_sets_content_type() {
		let response = Response::ok()
			.with_json(&serde_json::json!({"ok": true}))
			.unwrap();
		assert_eq!(
			response.headers.get("content-type").unwrap(),
			"application/json"
		);
		assert_eq!(response.body.as_ref(), br#"{"ok":true}"#);
	}

	#[test]
	fn fresh_response_has_no_render_flag() {
		assert!(!Response::ok().render_called);
	}
}
