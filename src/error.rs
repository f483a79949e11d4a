//! Gateway-level error types shared across the transport, store, and refresh layers.

// self
use crate::{_prelude::*, http::ApiRequest};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
///
/// Underlying failures are always forwarded as-is so callers can inspect the status code and
/// payload; the gateway never collapses them into an opaque message.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Upstream answered with a non-success HTTP status.
	#[error(transparent)]
	Status(#[from] StatusError),
	/// Response body did not match the expected JSON shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// Credential response decoded but carried an empty token.
	#[error("Credential response did not contain a usable {field}.")]
	UnusableCredentials {
		/// Offending field name.
		field: &'static str,
	},
	/// Credential refresh failed; stored credentials were cleared and sign-in is required.
	#[error("Credential refresh failed; sign-in is required.")]
	RefreshFailed {
		/// Failure reported by the refresh exchange, shared with every waiting request.
		#[source]
		source: Arc<Error>,
	},
	/// The refresh token vanished between the 401 and the start of the refresh.
	#[error("No refresh token was stored when the refresh started.")]
	MissingRefreshToken,
	/// The refresh leader was dropped before the refresh settled.
	#[error("Credential refresh was abandoned before it completed.")]
	RefreshAbandoned,
}
impl Error {
	/// Returns the HTTP status carried by this error or by the refresh failure behind it.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status(err) => Some(err.status),
			Self::Decode(err) => Some(err.status),
			Self::RefreshFailed { source } => source.status(),
			_ => None,
		}
	}

	/// Returns `true` for errors that end the current session (refresh failure or abandonment).
	pub fn is_terminal_auth_failure(&self) -> bool {
		matches!(self, Self::RefreshFailed { .. } | Self::RefreshAbandoned)
	}
}

/// Configuration and validation failures raised while assembling a gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme the gateway cannot dispatch to.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Non-local environments must talk to the API over HTTPS.
	#[error("The {environment} environment requires an HTTPS base URL: {url}.")]
	InsecureBaseUrl {
		/// Environment label.
		environment: &'static str,
		/// Base URL that failed validation.
		url: String,
	},
	/// Environment name is not recognized.
	#[error("Unknown environment `{value}`.")]
	UnknownEnvironment {
		/// Raw value that failed to parse.
		value: String,
	},
	/// Request timeout must be positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
	/// Endpoint path does not start with `/`.
	#[error("The {name} path must start with '/': {path}.")]
	InvalidPath {
		/// Which path failed validation.
		name: &'static str,
		/// Offending path.
		path: String,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the transport's fixed timeout.
	#[error("Request to the API timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Non-success HTTP response, carrying the request that produced it.
#[derive(Debug, ThisError)]
#[error("API returned HTTP {status} for {} {}.", .request.method, .request.path)]
pub struct StatusError {
	/// HTTP status code.
	pub status: u16,
	/// Response headers (lower-cased names).
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
	/// Request exactly as it was dispatched.
	pub request: Box<ApiRequest>,
}
impl StatusError {
	/// Returns `true` for `401 Unauthorized`.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Returns `true` for any 4xx status.
	pub fn is_client_error(&self) -> bool {
		(400..500).contains(&self.status)
	}

	/// Returns `true` for any 5xx status.
	pub fn is_server_error(&self) -> bool {
		(500..600).contains(&self.status)
	}

	/// Decodes the error payload as JSON.
	pub fn json<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		DecodeError::decode(self.status, &self.body)
	}
}

/// Response body could not be decoded into the requested type.
#[derive(Debug, ThisError)]
#[error("API returned malformed JSON (HTTP {status}).")]
pub struct DecodeError {
	/// Structured parsing failure with the offending path.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
	/// HTTP status code of the response.
	pub status: u16,
}
impl DecodeError {
	pub(crate) fn decode<T>(status: u16, body: &[u8]) -> Result<T, Self>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut de).map_err(|source| Self { source, status })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::Method;

	fn unauthorized() -> StatusError {
		StatusError {
			status: 401,
			headers: BTreeMap::new(),
			body: br#"{"detail":"expired"}"#.to_vec(),
			request: Box::new(ApiRequest::new(Method::Get, "/dashboard")),
		}
	}

	#[test]
	fn status_error_mentions_request_line() {
		let err = unauthorized();

		assert_eq!(err.to_string(), "API returned HTTP 401 for GET /dashboard.");
		assert!(err.is_unauthorized());
		assert!(err.is_client_error());
		assert!(!err.is_server_error());
	}

	#[test]
	fn status_error_payload_is_inspectable() {
		let payload: Json = unauthorized().json().expect("Fixture body should decode.");

		assert_eq!(payload["detail"], "expired");
	}

	#[test]
	fn refresh_failure_exposes_shared_source_and_status() {
		let source = Arc::new(Error::from(unauthorized()));
		let err = Error::RefreshFailed { source: source.clone() };

		assert_eq!(err.status(), Some(401));
		assert!(err.is_terminal_auth_failure());

		let inner = StdError::source(&err).expect("Refresh failure should expose its source.");

		assert_eq!(inner.to_string(), source.to_string());
	}

	#[test]
	fn decode_error_reports_field_path() {
		#[derive(Debug, Deserialize)]
		struct Pair {
			#[allow(dead_code)]
			access_token: String,
		}

		let err = DecodeError::decode::<Pair>(200, br#"{"access_token":7}"#)
			.expect_err("Numeric token should fail to decode.");

		assert_eq!(err.status, 200);
		assert_eq!(err.source.path().to_string(), "access_token");
	}
}
