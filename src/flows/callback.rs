//! Callback classification.
//!
//! Every inbound callback maps to exactly one [`CallbackOutcome`]. The checks run in a fixed
//! order so a cancelled login is reported apart from a tampered or expired flow:
//!
//! 1. `error` is an access-denied sentinel → [`CallbackOutcome::AccessDenied`]
//! 2. the state cookie does not match `state` → [`CallbackOutcome::StateMismatch`]
//! 3. any other `error` → [`CallbackOutcome::ProviderError`]
//! 4. no `code` → [`CallbackOutcome::ProviderError`] with [`MISSING_CODE_ERROR`]
//! 5. otherwise → [`CallbackOutcome::SuccessCandidate`]

// self
use crate::{_prelude::*, flows::StateCodec, provider::ProviderQuirks};

/// Error code reported when the callback carries neither `error` nor `code`.
pub const MISSING_CODE_ERROR: &str = "missing_code";

/// Query parameters of the provider callback. Empty values count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackQuery {
	/// Authorization code.
	pub code: Option<String>,
	/// Returned state value.
	pub state: Option<String>,
	/// Provider error code.
	pub error: Option<String>,
	/// Provider error description.
	pub error_description: Option<String>,
}
impl CallbackQuery {
	/// Collects the recognized parameters from decoded query pairs; the first occurrence wins.
	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<String>,
	{
		let mut query = Self::default();

		for (key, value) in pairs {
			let slot = match key.as_ref() {
				"code" => &mut query.code,
				"state" => &mut query.state,
				"error" => &mut query.error,
				"error_description" => &mut query.error_description,
				_ => continue,
			};

			if slot.is_none() {
				*slot = Some(value.into());
			}
		}

		query
	}

	/// Parses the query string of a full callback URL.
	pub fn from_url(url: &Url) -> Self {
		Self::from_pairs(url.query_pairs())
	}

	/// Authorization code, if non-empty.
	pub fn code(&self) -> Option<&str> {
		non_empty(&self.code)
	}

	/// Returned state, if non-empty.
	pub fn state(&self) -> Option<&str> {
		non_empty(&self.state)
	}

	/// Provider error code, if non-empty.
	pub fn error(&self) -> Option<&str> {
		non_empty(&self.error)
	}

	/// Provider error description, if non-empty.
	pub fn error_description(&self) -> Option<&str> {
		non_empty(&self.error_description)
	}
}

/// Snapshot of one callback: its query and the state cookie value read (and cleared) once.
///
/// Build it with [`Driver::load_callback`](crate::flows::Driver::load_callback); every query
/// helper and [`Driver::user`](crate::flows::Driver::user) reads from the snapshot, so the
/// cookie is consumed exactly once per callback.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackRequest {
	/// Callback query parameters.
	pub query: CallbackQuery,
	state_cookie: Option<String>,
}
impl CallbackRequest {
	/// Creates a snapshot from a query and an already-consumed cookie value.
	pub fn new(query: CallbackQuery, state_cookie: Option<String>) -> Self {
		Self { query, state_cookie }
	}

	/// State cookie value captured with the callback.
	pub fn state_cookie(&self) -> Option<&str> {
		self.state_cookie.as_deref()
	}

	/// True when the provider reported a user cancellation.
	pub fn access_denied(&self, quirks: &ProviderQuirks) -> bool {
		self.query.error().is_some_and(|error| quirks.is_access_denied(error))
	}

	/// True when the returned state does not match the captured cookie.
	pub fn state_mismatch(&self) -> bool {
		StateCodec::verify(self.state_cookie(), self.query.state()).is_err()
	}

	/// Provider error code, or [`MISSING_CODE_ERROR`] when the callback has no `code` either.
	pub fn error_code(&self) -> Option<&str> {
		match (self.query.error(), self.query.code()) {
			(Some(error), _) => Some(error),
			(None, None) => Some(MISSING_CODE_ERROR),
			(None, Some(_)) => None,
		}
	}
}
impl Debug for CallbackRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CallbackRequest")
			.field("code_set", &self.query.code().is_some())
			.field("state_set", &self.query.state().is_some())
			.field("error", &self.query.error)
			.field("error_description", &self.query.error_description)
			.field("state_cookie_set", &self.state_cookie.is_some())
			.finish()
	}
}

/// Terminal or continuation result of a callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
	/// The user cancelled the login at the provider.
	AccessDenied,
	/// The state is missing, expired, forged, or replayed.
	StateMismatch,
	/// The provider reported a failure, or the callback lacks a code.
	ProviderError {
		/// Provider `error`, verbatim, or [`MISSING_CODE_ERROR`].
		code: String,
		/// Provider `error_description`, verbatim.
		description: Option<String>,
	},
	/// The callback may be exchanged for a token.
	SuccessCandidate {
		/// Authorization code.
		code: String,
	},
}
impl CallbackOutcome {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::AccessDenied => "access_denied",
			Self::StateMismatch => "state_mismatch",
			Self::ProviderError { .. } => "provider_error",
			Self::SuccessCandidate { .. } => "success_candidate",
		}
	}

	/// Returns the authorization code, or the classification failure as an [`Error`].
	pub fn into_code(self) -> Result<String> {
		match self {
			Self::SuccessCandidate { code } => Ok(code),
			Self::AccessDenied => Err(Error::AccessDenied),
			Self::StateMismatch => Err(Error::StateMismatch),
			Self::ProviderError { code, description } => Err(Error::Provider { code, description }),
		}
	}
}

/// Classifies a callback snapshot. Stateless; performs no I/O.
pub fn classify(request: &CallbackRequest, quirks: &ProviderQuirks) -> CallbackOutcome {
	let query = &request.query;

	if request.access_denied(quirks) {
		return CallbackOutcome::AccessDenied;
	}
	if request.state_mismatch() {
		return CallbackOutcome::StateMismatch;
	}
	if let Some(error) = query.error() {
		return CallbackOutcome::ProviderError {
			code: error.to_owned(),
			description: query.error_description().map(ToOwned::to_owned),
		};
	}

	match query.code() {
		Some(code) => CallbackOutcome::SuccessCandidate { code: code.to_owned() },
		None => CallbackOutcome::ProviderError { code: MISSING_CODE_ERROR.into(), description: None },
	}
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request(pairs: &[(&str, &str)], cookie: Option<&str>) -> CallbackRequest {
		CallbackRequest::new(
			CallbackQuery::from_pairs(pairs.iter().copied()),
			cookie.map(ToOwned::to_owned),
		)
	}

	#[test]
	fn denial_wins_over_everything() {
		let quirks = ProviderQuirks::default();

		for cookie in [None, Some("s1"), Some("s2")] {
			let request =
				request(&[("error", "user_denied"), ("code", "abc"), ("state", "s1")], cookie);

			assert_eq!(classify(&request, &quirks), CallbackOutcome::AccessDenied);
		}

		assert_eq!(
			classify(&request(&[("error", "access_denied")], None), &quirks),
			CallbackOutcome::AccessDenied
		);
	}

	#[test]
	fn state_mismatch_precedes_provider_errors() {
		let quirks = ProviderQuirks::default();
		let mismatched = request(&[("code", "abc"), ("state", "s1")], Some("s2"));

		assert!(!mismatched.access_denied(&quirks));
		assert_eq!(classify(&mismatched, &quirks), CallbackOutcome::StateMismatch);
		assert_eq!(
			classify(&request(&[("error", "server_error"), ("state", "s1")], None), &quirks),
			CallbackOutcome::StateMismatch
		);
	}

	#[test]
	fn provider_errors_keep_code_and_description() {
		let outcome = classify(
			&request(
				&[
					("error", "temporarily_unavailable"),
					("error_description", "Try again later"),
					("state", "s1"),
				],
				Some("s1"),
			),
			&ProviderQuirks::default(),
		);

		assert_eq!(
			outcome,
			CallbackOutcome::ProviderError {
				code: "temporarily_unavailable".into(),
				description: Some("Try again later".into()),
			}
		);
	}

	#[test]
	fn missing_code_is_a_provider_error() {
		let request = request(&[("state", "s1"), ("code", "")], Some("s1"));

		assert_eq!(request.error_code(), Some(MISSING_CODE_ERROR));
		assert_eq!(
			classify(&request, &ProviderQuirks::default()),
			CallbackOutcome::ProviderError { code: MISSING_CODE_ERROR.into(), description: None }
		);
	}

	#[test]
	fn success_candidate_yields_the_code() {
		let request = request(&[("code", "abc"), ("state", "s1"), ("code", "ignored")], Some("s1"));
		let outcome = classify(&request, &ProviderQuirks::default());

		assert_eq!(outcome.as_str(), "success_candidate");
		assert_eq!(outcome.into_code().expect("Success candidate should carry a code."), "abc");
		assert_eq!(request.error_code(), None);
	}

	#[test]
	fn outcomes_map_to_driver_errors() {
		assert!(matches!(CallbackOutcome::AccessDenied.into_code(), Err(Error::AccessDenied)));
		assert!(matches!(CallbackOutcome::StateMismatch.into_code(), Err(Error::StateMismatch)));
		assert!(matches!(
			CallbackOutcome::ProviderError { code: "x".into(), description: None }.into_code(),
			Err(Error::Provider { code, .. }) if code == "x"
		));
	}

	#[test]
	fn parses_callback_urls() {
		let url = Url::parse(
			"https://app.example.com/auth/callback?state=s%201&code=abc&session_state=zzz",
		)
		.expect("Callback URL fixture should parse.");
		let query = CallbackQuery::from_url(&url);

		assert_eq!(query.state(), Some("s 1"));
		assert_eq!(query.code(), Some("abc"));
		assert_eq!(query.error(), None);
	}
}
