use crate::session::Session;
use crate::{Error, Result};
use bytes::Bytes;
use hyper::{HeaderMap, Method, Uri, Version};
use std::collections::HashMap;

/// HTTP request representation handed to a controller dispatch.
///
/// Route parameters and decoded form fields are attached by the surrounding
/// server layer before dispatch; the controller core only reads them.
///
/// # Examples
///
/// ```
/// use switchyard_http::Request;
/// use hyper::Method;
///
/// let request = Request::builder()
///     .method(Method::GET)
///     .uri("/posts/3?draft=1")
///     .param("id", "3")
///     .build()
///     .unwrap();
/// assert_eq!(request.path(), "/posts/3");
/// assert_eq!(request.param("id").as_deref(), Some("3"));
/// assert_eq!(request.query().get("draft").map(String::as_str), Some("1"));
/// ```
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Route parameters extracted by the router
	pub params: HashMap<String, String>,
	/// Decoded form fields from the request body
	pub form: HashMap<String, String>,
	/// Session attached by the session layer, if any
	pub session: Option<Session>,
	query: HashMap<String, String>,
}

impl Request {
	/// Create a new request from its raw parts
	pub fn new(
		method: Method,
		uri: Uri,
		version: Version,
		headers: HeaderMap,
		body: Bytes,
	) -> Self {
		let query = parse_query(&uri);
		Self {
			method,
			uri,
			version,
			headers,
			body,
			params: HashMap::new(),
			form: HashMap::new(),
			session: None,
			query,
		}
	}

	/// Start building a request
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Request path without the query string
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Parsed query-string pairs
	pub fn query(&self) -> &HashMap<String, String> {
		&self.query
	}

	/// Look up a request parameter by name.
	///
	/// Resolution order: route parameters, then form fields, then the query
	/// string.
	pub fn param(&self, name: &str) -> Option<String> {
		self.params
			.get(name)
			.or_else(|| self.form.get(name))
			.or_else(|| self.query.get(name))
			.cloned()
	}
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
	uri.query()
		.map(|raw| serde_urlencoded::from_str(raw).unwrap_or_default())
		.unwrap_or_default()
}

/// Builder for [`Request`]
#[derive(Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	uri: Option<String>,
	version: Option<Version>,
	headers: Option<HeaderMap>,
	body: Option<Bytes>,
	params: HashMap<String, String>,
	form: HashMap<String, String>,
	session: Option<Session>,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = Some(version);
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = Some(headers);
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = Some(body.into());
		self
	}

	/// Attach a route parameter
	pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(name.into(), value.into());
		self
	}

	/// Attach a decoded form field
	pub fn form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.form.insert(name.into(), value.into());
		self
	}

	/// Attach a session
	pub fn session(mut self, session: Session) -> Self {
		self.session = Some(session);
		self
	}

	pub fn build(self) -> Result<Request> {
		let uri: Uri = self
			.uri
			.unwrap_or_else(|| "/".to_string())
			.parse()
			.map_err(|e| Error::Invalid(format!("invalid uri: {e}")))?;
		let mut request = Request::new(
			self.method.unwrap_or(Method::GET),
			uri,
			self.version.unwrap_or(Version::HTTP_11),
			self.headers.unwrap_or_default(),
			self.body.unwrap_or_default(),
		);
		request.params = self.params;
		request.form = self.form;
		request.session = self.session;
		Ok(request)
	}
}
