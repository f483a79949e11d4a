// self
use crate::{_prelude::*, http::ApiRequest, obs::Stage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by gateway stages.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the stage and the request line.
	pub fn new(stage: Stage, request: &ApiRequest) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"auth_gateway.call",
				stage = stage.as_str(),
				method = request.method.as_str(),
				path = %request.path,
				retried = request.retried,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, request);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a `tracing` event when the feature is enabled; expands to nothing otherwise.
macro_rules! trace_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			tracing::$level!($($arg)+);
		}
	};
}
pub(crate) use trace_event;
