//! The authenticated request gateway.
//!
//! [`Gateway`] owns the transport, credential store, and navigator handles and exposes the
//! caller surface (`get`/`post`/`put`/`delete` plus [`Gateway::request`]). Every outbound
//! call gets the stored access token attached as a bearer credential. A `401` on a request
//! that has not been replayed yet enters the refresh protocol in [`refresh`]: at most one
//! refresh exchange is in flight at a time, every other unauthorized request queues behind
//! it, and each queued request is replayed exactly once with the new token.

pub mod session;

mod coordinator;
mod metrics;
mod refresh;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind},
	config::GatewayConfig,
	gateway::coordinator::RefreshCoordinator,
	http::{ApiRequest, ApiResponse, HttpTransport},
	navigation::{Navigator, NoopNavigator},
	obs::{self, CallOutcome, CallSpan, Stage},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Single injectable client that authenticates, refreshes, and replays API calls.
///
/// Clones share the transport, store, navigator, metrics, and refresh state, so a refresh
/// started through one clone is joined by requests issued through any other.
pub struct Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound call, including the refresh exchange.
	pub transport: Arc<T>,
	/// Credential store holding the access/refresh pair.
	pub store: Arc<dyn CredentialStore>,
	/// Navigator invoked after a failed refresh.
	pub navigator: Arc<dyn Navigator>,
	/// Validated configuration.
	pub config: GatewayConfig,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	coordinator: Arc<Mutex<RefreshCoordinator>>,
}
impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a gateway over a caller-provided transport.
	///
	/// The navigator defaults to [`NoopNavigator`]; attach one with [`Gateway::with_navigator`].
	pub fn with_transport(
		config: GatewayConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			navigator: Arc::new(NoopNavigator),
			config,
			refresh_metrics: Default::default(),
			coordinator: Default::default(),
		}
	}

	/// Sets or replaces the navigator used after a failed refresh.
	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = navigator;

		self
	}

	/// Returns `true` while a refresh exchange is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.coordinator.lock().is_refreshing()
	}

	/// Returns how many requests are queued behind the in-flight refresh.
	pub fn pending_waiters(&self) -> usize {
		self.coordinator.lock().waiting()
	}

	/// Sends `request` with bearer injection and the single-flight 401 recovery.
	///
	/// Non-2xx responses surface as [`Error::Status`] carrying the original status and body.
	/// A 401 on a request that was already replayed is returned as-is.
	pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
		const STAGE: Stage = Stage::Request;

		let span = CallSpan::new(STAGE, &request);

		obs::record_call_outcome(STAGE, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut request = request;

				if let Some(token) = self.store.get(TokenKind::Access).await? {
					request.set_bearer(&token);
				}

				match self.dispatch(&request).await {
					Err(Error::Status(err)) if err.is_unauthorized() && !request.is_retried() =>
						self.recover(request, err).await,
					result => result,
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(STAGE, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(STAGE, CallOutcome::Failure),
		}

		result
	}

	/// Sends `request` and decodes the JSON response body.
	pub async fn request_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.request(request).await?;

		Ok(response.json()?)
	}

	/// `GET path`, decoding the JSON response.
	pub async fn get<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.request_json(ApiRequest::get(path)).await
	}

	/// `POST path` with a JSON body, decoding the JSON response.
	pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.request_json(ApiRequest::post(path).with_json(body)?).await
	}

	/// `PUT path` with a JSON body, decoding the JSON response.
	pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.request_json(ApiRequest::put(path).with_json(body)?).await
	}

	/// `DELETE path`, decoding the JSON response.
	pub async fn delete<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.request_json(ApiRequest::delete(path)).await
	}

	/// One raw round trip: no bearer injection and no 401 handling.
	pub(crate) async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let response = self.transport.send(request).await?;

		Ok(response.error_for_status(request)?)
	}

	/// Raw round trip whose success body must be a usable credential pair.
	pub(crate) async fn exchange(&self, request: &ApiRequest) -> Result<CredentialPair> {
		let response = self.dispatch(request).await?;

		CredentialPair::from_response(response.status, &response.body)
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a gateway that provisions its own reqwest transport from `config`.
	pub fn new(config: GatewayConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::new(&config)?;

		Ok(Self::with_transport(config, transport, store))
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			navigator: self.navigator.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("config", &self.config)
			.field("coordinator", &*self.coordinator.lock())
			.finish()
	}
}
