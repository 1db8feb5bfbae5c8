// self
use crate::{_prelude::*, obs::FlowStage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by driver stages.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided stage.
	pub fn new(stage: FlowStage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("keycloak_login.flow", stage = stage.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Logs a callback classification result at `debug`.
pub fn log_callback_outcome(outcome: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(outcome, "classified provider callback");

	#[cfg(not(feature = "tracing"))]
	let _ = outcome;
}

/// Logs a non-2xx provider answer at `warn`. Only the status is recorded; bodies may echo
/// secrets.
pub fn log_endpoint_rejection(stage: FlowStage, status: u16) {
	#[cfg(feature = "tracing")]
	tracing::warn!(stage = stage.as_str(), status, "provider endpoint rejected the request");

	#[cfg(not(feature = "tracing"))]
	let _ = (stage, status);
}

/// Logs a userinfo schema rejection at `warn` with the payload shape (claim name to JSON type).
pub fn log_schema_rejection(details: &str, shape: &BTreeMap<String, &'static str>) {
	#[cfg(feature = "tracing")]
	tracing::warn!(details, shape = ?shape, "userinfo payload failed schema validation");

	#[cfg(not(feature = "tracing"))]
	let _ = (details, shape);
}
