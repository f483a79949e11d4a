//! The 401 recovery protocol: leader election, the refresh exchange, and the single replay.
//!
//! The first request to observe a 401 while no refresh is in flight becomes the leader, reads
//! the current refresh token, and posts it to the configured refresh path. Requests that hit a 401
//! meanwhile queue behind it. On success the new pair is persisted before any waiter is
//! released, and every request replays once with the new bearer. On failure the store is
//! cleared before waiters are rejected, then the navigator is sent to sign-in.

// crates.io
use serde_json::json;
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
	error::StatusError,
	gateway::{
		Gateway,
		coordinator::{self, RefreshLease, Ticket},
	},
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, CallOutcome, CallSpan, Stage, trace_event},
};

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Recovers `request` from `unauthorized` by refreshing (or joining a refresh) and
	/// replaying once.
	pub(super) async fn recover(
		&self,
		request: ApiRequest,
		unauthorized: StatusError,
	) -> Result<ApiResponse> {
		if self.store.get(TokenKind::Refresh).await?.is_none() {
			trace_event!(debug, path = %request.path, "No refresh token stored; returning the 401.");

			return Err(unauthorized.into());
		}

		let access_token = match coordinator::join(&self.coordinator) {
			Ticket::Leader(lease) => self.lead_refresh(lease).await?,
			Ticket::Waiter(receiver) => {
				self.refresh_metrics.record_waiter();

				trace_event!(debug, path = %request.path, "Refresh in flight; queued behind it.");

				match receiver.await {
					Ok(Ok(token)) => token,
					Ok(Err(source)) if matches!(*source, Error::RefreshAbandoned) =>
						return Err(Error::RefreshAbandoned),
					Ok(Err(source)) => return Err(Error::RefreshFailed { source }),
					Err(_) => return Err(Error::RefreshAbandoned),
				}
			},
		};

		self.replay(request, &access_token).await
	}

	async fn lead_refresh(&self, lease: RefreshLease<'_>) -> Result<TokenSecret> {
		const STAGE: Stage = Stage::Refresh;

		self.refresh_metrics.record_attempt();
		obs::record_call_outcome(STAGE, CallOutcome::Attempt);
		trace_event!(info, "Starting credential refresh.");

		// Read under the lease; a token read before election may already be rotated.
		let refreshed = match self.store.get(TokenKind::Refresh).await {
			Ok(Some(refresh_token)) => self.exchange_refresh(&refresh_token).await,
			Ok(None) => Err(Error::MissingRefreshToken),
			Err(e) => Err(e.into()),
		};

		match refreshed {
			Ok(pair) => {
				let released = lease.settle(Ok(pair.access_token.clone()));

				self.refresh_metrics.record_success();
				self.refresh_metrics.record_released(released);
				obs::record_call_outcome(STAGE, CallOutcome::Success);
				trace_event!(info, released, "Credential refresh succeeded.");

				Ok(pair.access_token)
			},
			Err(err) => {
				if let Err(_clear_err) = self.store.clear().await {
					trace_event!(
						warn,
						error = %_clear_err,
						"Clearing credentials after a failed refresh also failed."
					);
				}

				let source = Arc::new(err);
				let released = lease.settle(Err(source.clone()));

				self.refresh_metrics.record_failure();
				self.refresh_metrics.record_released(released);
				obs::record_call_outcome(STAGE, CallOutcome::Failure);
				trace_event!(warn, released, error = %source, "Credential refresh failed; credentials cleared.");

				self.navigator.redirect(&self.config.sign_in_redirect);

				Err(Error::RefreshFailed { source })
			},
		}
	}

	async fn exchange_refresh(&self, refresh_token: &TokenSecret) -> Result<CredentialPair> {
		let request = ApiRequest::post(&self.config.refresh_path)
			.with_body(json!({ "refresh_token": refresh_token.expose() }));

		CallSpan::new(Stage::Refresh, &request)
			.instrument(async {
				let pair = self.exchange(&request).await?;

				self.store.set(&pair).await?;

				Ok::<_, Error>(pair)
			})
			.await
	}

	async fn replay(&self, request: ApiRequest, access_token: &TokenSecret) -> Result<ApiResponse> {
		const STAGE: Stage = Stage::Retry;

		let mut request = request.mark_retried();

		request.set_bearer(access_token);

		let span = CallSpan::new(STAGE, &request);

		obs::record_call_outcome(STAGE, CallOutcome::Attempt);

		let result = span.instrument(self.dispatch(&request)).await;

		match &result {
			Ok(_) => obs::record_call_outcome(STAGE, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(STAGE, CallOutcome::Failure),
		}

		result
	}
}
