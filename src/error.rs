//! Driver-level error types shared across flows, providers, and transports.

// self
use crate::{_prelude::*, flows::StateMismatch, provider::ProviderConfigError};

/// Driver-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical driver error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The end-user cancelled the login at the provider.
	#[error("The user denied the authorization request.")]
	AccessDenied,
	/// The callback state did not match the state cookie (forged, replayed, or expired flow).
	#[error("Authorization state mismatch; restart the login flow.")]
	StateMismatch,
	/// The provider reported an error on the callback redirect.
	#[error("Provider returned an error on the callback: {code}.")]
	Provider {
		/// Provider-supplied `error` value, preserved verbatim.
		code: String,
		/// Provider-supplied `error_description`, preserved verbatim.
		description: Option<String>,
	},
	/// The code-for-token exchange failed.
	#[error(transparent)]
	TokenExchange(#[from] TokenExchangeError),
	/// The userinfo call or its normalization failed.
	#[error(transparent)]
	Profile(#[from] ProfileError),
}
impl Error {
	/// Returns true when the failure is a userinfo transport failure, the only class a caller
	/// may retry (with a still-valid token).
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Profile(ProfileError::Transport(_)))
	}
}
impl From<StateMismatch> for Error {
	fn from(_: StateMismatch) -> Self {
		Self::StateMismatch
	}
}

/// Configuration and request-construction failures raised by the driver.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider configuration is invalid.
	#[error(transparent)]
	Provider(#[from] ProviderConfigError),
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

/// Failures of the authorization-code exchange. Always terminal for the login attempt, since
/// an authorization code is single-use.
#[derive(Debug, ThisError)]
pub enum TokenExchangeError {
	/// The token endpoint answered with a non-2xx status.
	#[error("Token endpoint rejected the authorization code with HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
		/// `Retry-After` hint sent with the rejection (typically on 429 or 503).
		retry_after: Option<Duration>,
	},
	/// The token endpoint answered 2xx with a body that is not a token response.
	#[error("Token endpoint returned a malformed body (HTTP {status}).")]
	Malformed {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The token endpoint could not be reached.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl TokenExchangeError {
	/// HTTP status code, when the endpoint answered.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } | Self::Malformed { status, .. } => Some(*status),
			Self::Transport(_) => None,
		}
	}

	/// Raw response body, when the endpoint answered.
	pub fn body(&self) -> Option<&str> {
		match self {
			Self::Rejected { body, .. } | Self::Malformed { body, .. } => Some(body),
			Self::Transport(_) => None,
		}
	}

	/// `Retry-After` hint of a rejected exchange.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Rejected { retry_after, .. } => *retry_after,
			_ => None,
		}
	}

	/// OAuth `error` field from a rejected response body, if the body is a JSON error object.
	pub fn oauth_error(&self) -> Option<String> {
		let Self::Rejected { body, .. } = self else { return None };
		let value = serde_json::from_str::<JsonValue>(body).ok()?;

		value.get("error")?.as_str().map(ToOwned::to_owned)
	}
}

/// Failures while fetching or normalizing the userinfo profile.
#[derive(Debug, ThisError)]
pub enum ProfileError {
	/// The userinfo payload does not match the expected claim schema. Never retried.
	#[error("Userinfo payload failed schema validation: {details}.")]
	InvalidSchema {
		/// Validator-supplied description of the mismatch.
		details: String,
	},
	/// The userinfo endpoint answered with a non-2xx status (typically an expired token).
	#[error("Userinfo endpoint rejected the access token with HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
		/// `Retry-After` hint sent with the rejection.
		retry_after: Option<Duration>,
	},
	/// The deployment requires an email but the profile has none.
	#[error("Profile is missing the email claim.")]
	MissingEmail,
	/// The userinfo endpoint could not be reached. Retryable while the token is still valid.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

impl ProfileError {
	/// `Retry-After` hint of a rejected userinfo call.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Rejected { retry_after, .. } => *retry_after,
			_ => None,
		}
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The request timed out.
	#[error("Request to the {endpoint} endpoint timed out.")]
	Timeout {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling a provider endpoint.")]
	Io(#[from] std::io::Error),
	/// Any other HTTP client failure.
	#[error("HTTP client error occurred while calling the {endpoint} endpoint: {message}.")]
	Other {
		/// Endpoint label.
		endpoint: &'static str,
		/// Client-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn only_profile_transport_failures_are_retryable() {
		let transport = TransportError::Timeout { endpoint: "userinfo" };

		assert!(Error::from(ProfileError::Transport(transport)).is_retryable());
		assert!(!Error::from(ProfileError::InvalidSchema { details: "sub".into() }).is_retryable());
		assert!(
			!Error::from(TokenExchangeError::Transport(TransportError::Timeout {
				endpoint: "token"
			}))
			.is_retryable()
		);
		assert!(!Error::AccessDenied.is_retryable());
	}

	#[test]
	fn rejected_exchange_exposes_oauth_error() {
		let err = TokenExchangeError::Rejected {
			status: 400,
			body: "{\"error\":\"invalid_grant\",\"error_description\":\"Code not valid\"}".into(),
			retry_after: None,
		};

		assert_eq!(err.status(), Some(400));
		assert_eq!(err.oauth_error().as_deref(), Some("invalid_grant"));

		let html = TokenExchangeError::Rejected {
			status: 503,
			body: "<html>".into(),
			retry_after: Some(Duration::seconds(30)),
		};

		assert_eq!(html.oauth_error(), None);
		assert_eq!(html.body(), Some("<html>"));
		assert_eq!(html.retry_after(), Some(Duration::seconds(30)));
		assert_eq!(err.retry_after(), None);
	}
}
