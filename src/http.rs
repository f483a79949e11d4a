//! Transport primitives: request/response descriptions and the [`HttpTransport`] seam.
//!
//! The gateway never talks to an HTTP stack directly. It hands a fully described
//! [`ApiRequest`] to an [`HttpTransport`], which resolves the path against its base URL
//! and returns every HTTP status as an [`ApiResponse`]. Status classification (and the
//! 401 refresh protocol) stays in the gateway so custom transports only have to move bytes.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{DecodeError, StatusError, TransportError},
};
#[cfg(feature = "reqwest")]
use crate::{config::GatewayConfig, error::ConfigError};

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "authorization";

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of dispatching gateway requests.
///
/// Implementations must return non-success statuses as `Ok(ApiResponse)` and reserve
/// `Err` for failures where no response was received (DNS, TLS, timeout, IO).
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request` and resolves with the raw response.
	fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a>;
}

/// HTTP verbs used by the gateway surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}

/// Outbound call description plus the replay marker.
///
/// Header names are stored lower-cased. `Debug` output redacts the `authorization` header.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Path relative to the transport's base URL (may carry a query string).
	pub path: String,
	/// Request headers.
	pub headers: BTreeMap<String, String>,
	/// Optional JSON body.
	pub body: Option<Json>,
	/// Set once the request has been replayed after a credential refresh.
	pub retried: bool,
}
impl ApiRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: BTreeMap::new(), body: None, retried: false }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Sets a JSON body that is already a [`Json`] value.
	pub fn with_body(mut self, body: Json) -> Self {
		self.body = Some(body);

		self
	}

	/// Serializes `body` into the request.
	pub fn with_json<B>(self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		let value = serde_json::to_value(body).map_err(crate::error::ConfigError::from)?;

		Ok(self.with_body(value))
	}

	/// Marks the request as already replayed once.
	pub fn mark_retried(mut self) -> Self {
		self.retried = true;

		self
	}

	/// Returns `true` once the request has been replayed.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	/// Attaches `token` as the bearer credential, replacing any existing one.
	pub fn set_bearer(&mut self, token: &TokenSecret) {
		self.headers.insert(AUTHORIZATION.to_owned(), token.bearer());
	}

	/// Returns the attached `Authorization` header value, if any.
	pub fn authorization(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION).map(String::as_str)
	}
}
impl Debug for ApiRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				(name.as_str(), if name == AUTHORIZATION { "<redacted>" } else { value.as_str() })
			})
			.collect::<BTreeMap<_, _>>();

		f.debug_struct("ApiRequest")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("headers", &headers)
			.field("body_set", &self.body.is_some())
			.field("retried", &self.retried)
			.finish()
	}
}

/// Raw response returned by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers (lower-cased names).
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response.
	pub fn new(status: u16, headers: BTreeMap<String, String>, body: Vec<u8>) -> Self {
		Self { status, headers, body }
	}

	/// Returns `true` for any 2xx status.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON. An empty body decodes as JSON `null`.
	pub fn json<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		if self.body.is_empty() {
			return DecodeError::decode(self.status, b"null");
		}

		DecodeError::decode(self.status, &self.body)
	}

	/// Converts a non-success response into a [`StatusError`] that carries `request`.
	pub fn error_for_status(self, request: &ApiRequest) -> Result<Self, StatusError> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(StatusError {
				status: self.status,
				headers: self.headers,
				body: self.body,
				request: Box::new(request.clone()),
			})
		}
	}
}

/// reqwest-backed transport rooted at the configured base URL.
///
/// The fixed timeout and default headers from [`GatewayConfig`] are baked into the client.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base_url: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a client with the configuration's timeout and default headers.
	pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
		let client = Self::client_builder(config)?.build()?;

		Ok(Self::with_client(client, config))
	}

	/// Returns a client builder preloaded with the configuration's timeout and default headers.
	///
	/// Use it with [`ReqwestTransport::with_client`] to layer extra TLS or proxy settings on top.
	pub fn client_builder(config: &GatewayConfig) -> Result<reqwest::ClientBuilder, ConfigError> {
		let mut headers = reqwest::header::HeaderMap::new();

		for (name, value) in &config.default_headers {
			let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
				.map_err(ConfigError::http_client_build)?;
			let value = reqwest::header::HeaderValue::from_str(value)
				.map_err(ConfigError::http_client_build)?;

			headers.insert(name, value);
		}

		Ok(ReqwestClient::builder().timeout(config.std_timeout()).default_headers(headers))
	}

	/// Wraps an existing reqwest client; the caller owns its timeout and header policy.
	pub fn with_client(client: ReqwestClient, config: &GatewayConfig) -> Self {
		Self { client, base_url: config.base_url.clone() }
	}

	/// Appends `path` to the base URL, keeping any base path prefix.
	fn resolve(&self, path: &str) -> Result<Url, TransportError> {
		let joined = format!("{}{path}", self.base_url.as_str().trim_end_matches('/'));

		Url::parse(&joined).map_err(TransportError::network)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
		Box::pin(async move {
			let url = self.resolve(&request.path)?;
			let mut builder = self.client.request(request.method.into(), url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &request.body {
				builder = builder.body(body.to_string());
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse::new(status, headers, body))
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_debug_redacts_bearer() {
		let mut request = ApiRequest::get("/dashboard").with_header("X-Trace", "abc");

		request.set_bearer(&TokenSecret::new("T1"));

		let rendered = format!("{request:?}");

		assert_eq!(request.authorization(), Some("Bearer T1"));
		assert!(!rendered.contains("T1"));
		assert!(rendered.contains("x-trace"));
	}

	#[test]
	fn error_for_status_keeps_request_and_body() {
		let request = ApiRequest::post("/auth/login");
		let err = ApiResponse::new(422, BTreeMap::new(), br#"{"detail":"bad"}"#.to_vec())
			.error_for_status(&request)
			.expect_err("422 should be an error.");

		assert_eq!(err.status, 422);
		assert_eq!(*err.request, request);
		assert_eq!(err.body, br#"{"detail":"bad"}"#);
	}

	#[test]
	fn empty_body_decodes_as_null() {
		let response = ApiResponse::new(204, BTreeMap::new(), Vec::new());
		let value: Option<Json> = response.json().expect("Empty body should decode as null.");

		assert!(value.is_none());
	}

	#[test]
	fn with_json_serializes_body() {
		#[derive(Serialize)]
		struct Login<'a> {
			login_id: &'a str,
		}

		let request =
			ApiRequest::post("/auth/login").with_json(&Login { login_id: "ada" }).expect("JSON.");

		assert_eq!(request.body, Some(serde_json::json!({ "login_id": "ada" })));
		assert!(!request.is_retried());
		assert!(request.mark_retried().is_retried());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_transport_keeps_base_prefix() {
		let config =
			GatewayConfig::builder(Url::parse("https://api.example.com/v1/").expect("URL."))
				.build()
				.expect("Config should build.");
		let transport = ReqwestTransport::new(&config).expect("Transport should build.");
		let url = transport.resolve("/auth/refresh").expect("Endpoint should resolve.");

		assert_eq!(url.as_str(), "https://api.example.com/v1/auth/refresh");
	}
}
