//! Access tokens returned by the token endpoint.

// crates.io
use serde::Serializer;
// self
use crate::{_prelude::*, auth::Secret};

/// Token type reported by the token endpoint.
///
/// A missing `token_type` or any casing of `bearer` normalizes to [`TokenType::Bearer`]; any other
/// value is surfaced unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TokenType {
	/// RFC 6750 bearer token.
	#[default]
	Bearer,
	/// Provider-specific token type, preserved verbatim.
	Other(String),
}
impl TokenType {
	/// Normalizes the raw `token_type` field of a token response.
	pub fn from_response(raw: Option<&str>) -> Self {
		match raw.map(str::trim) {
			None | Some("") => Self::Bearer,
			Some(value) if value.eq_ignore_ascii_case("bearer") => Self::Bearer,
			Some(value) => Self::Other(value.to_owned()),
		}
	}

	/// Returns the wire label (`bearer` for bearer tokens).
	pub fn as_str(&self) -> &str {
		match self {
			Self::Bearer => "bearer",
			Self::Other(value) => value,
		}
	}
}
impl Display for TokenType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl Serialize for TokenType {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}

/// Access token owned by a single callback request. The driver never persists it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccessToken {
	/// Access token secret; callers must avoid logging it.
	pub token: Secret,
	/// Normalized token type.
	#[serde(rename = "type")]
	pub token_type: TokenType,
	/// Lifetime reported via `expires_in`, when present.
	#[serde(skip)]
	pub expires_in: Option<Duration>,
	/// Refresh token, when the provider issued one.
	#[serde(skip)]
	pub refresh_token: Option<Secret>,
	/// OpenID Connect ID token, when the provider issued one.
	#[serde(skip)]
	pub id_token: Option<Secret>,
	/// Raw granted `scope` string, when the provider echoed one.
	#[serde(skip)]
	pub scope: Option<String>,
}
impl AccessToken {
	/// Wraps a bare bearer token (used when callers already hold one).
	pub fn bearer(token: impl Into<String>) -> Self {
		Self {
			token: Secret::new(token),
			token_type: TokenType::Bearer,
			expires_in: None,
			refresh_token: None,
			id_token: None,
			scope: None,
		}
	}

	/// Returns true for bearer tokens.
	pub fn is_bearer(&self) -> bool {
		self.token_type == TokenType::Bearer
	}
}
