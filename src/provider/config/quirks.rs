// self
use crate::_prelude::*;

/// Callback `error` value Keycloak-style providers send when the user cancels the login.
pub const USER_DENIED_ERROR: &str = "user_denied";
/// RFC 6749 `error` value for a refused authorization request.
pub const ACCESS_DENIED_ERROR: &str = "access_denied";

/// Provider-specific quirks that influence how flows behave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Callback `error` values that mean "the user cancelled" rather than a provider failure.
	pub access_denied_errors: Vec<String>,
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
}
impl ProviderQuirks {
	/// Returns true when `error` is one of the configured access-denied sentinels.
	pub fn is_access_denied(&self, error: &str) -> bool {
		self.access_denied_errors.iter().any(|sentinel| sentinel == error)
	}
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self {
			access_denied_errors: vec![USER_DENIED_ERROR.into(), ACCESS_DENIED_ERROR.into()],
			scope_delimiter: ' ',
		}
	}
}
