//! Optional observability helpers for gateway calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `auth_gateway.call` with the `stage` and
//!   `method`/`path` fields, plus events for refresh start, settlement, and waiter enqueue.
//! - Enable `metrics` to increment the `auth_gateway_call_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

pub(crate) use self::tracing::trace_event;

// self
use crate::_prelude::*;

/// Gateway stages observed by the instrumentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// First dispatch of a caller's request.
	Request,
	/// Refresh-token exchange performed by the refresh leader.
	Refresh,
	/// Single replay of a request after a refresh.
	Retry,
	/// Sign-in exchange that creates the credential pair.
	SignIn,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Request => "request",
			Stage::Refresh => "refresh",
			Stage::Retry => "retry",
			Stage::SignIn => "sign_in",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
