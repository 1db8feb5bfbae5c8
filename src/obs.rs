//! Optional observability helpers for driver flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `keycloak_login.flow` with the `stage`
//!   field, plus `warn`/`debug` events for rejected callbacks, exchanges, and profiles.
//! - Enable `metrics` to increment the `keycloak_login_flow_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Driver stages observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowStage {
	/// Building the authorization redirect.
	Redirect,
	/// Classifying the provider callback.
	Callback,
	/// Exchanging the authorization code.
	TokenExchange,
	/// Fetching and normalizing the userinfo profile.
	Profile,
}
impl FlowStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowStage::Redirect => "redirect",
			FlowStage::Callback => "callback",
			FlowStage::TokenExchange => "token_exchange",
			FlowStage::Profile => "profile",
		}
	}
}
impl Display for FlowStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a driver stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
