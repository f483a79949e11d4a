//! Bounded retry policy for callers layering a query cache over the gateway.
//!
//! The gateway's own replay-after-refresh is unconditional and happens at most once; this
//! policy only decides whether a failed call is worth issuing again from scratch. Client
//! errors (4xx, including a 401 the gateway already gave up on) and refresh failures are
//! never retried.

// self
use crate::{
	_prelude::*,
	gateway::Gateway,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::trace_event,
};

/// Maximum number of additional attempts after a failed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RetryPolicy {
	/// Retries allowed after the first failure.
	pub max_retries: u32,
}
impl RetryPolicy {
	/// Policy for reads.
	pub const QUERY: Self = Self { max_retries: 2 };
	/// Policy for writes.
	pub const MUTATION: Self = Self { max_retries: 1 };
	/// Never retry.
	pub const NONE: Self = Self { max_retries: 0 };

	/// Creates a policy allowing `max_retries` retries.
	pub const fn new(max_retries: u32) -> Self {
		Self { max_retries }
	}

	/// Decides whether to retry after `failure_count` retries have already been spent.
	pub fn should_retry(&self, failure_count: u32, error: &Error) -> bool {
		if failure_count >= self.max_retries {
			return false;
		}

		match error {
			Error::Transport(_) => true,
			Error::Status(err) => err.is_server_error(),
			_ => false,
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::QUERY
	}
}

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Runs [`Gateway::request`] under `policy`, re-issuing retryable failures.
	///
	/// Each attempt is a fresh call, so it gets the full 401 protocol again.
	pub async fn request_with_policy(
		&self,
		request: ApiRequest,
		policy: RetryPolicy,
	) -> Result<ApiResponse> {
		let mut failure_count = 0;

		loop {
			let err = match self.request(request.clone()).await {
				Ok(response) => return Ok(response),
				Err(err) => err,
			};

			if !policy.should_retry(failure_count, &err) {
				return Err(err);
			}

			failure_count += 1;

			trace_event!(
				debug,
				path = %request.path,
				attempt = failure_count,
				error = %err,
				"Retrying failed call."
			);
		}
	}
}
