//! Canonical user identity produced from userinfo claims.

// self
use crate::{_prelude::*, auth::AccessToken, error::ProfileError};

/// Provider-returned claims mapping, kept verbatim for downstream consumers.
pub type RawProfile = JsonMap<String, JsonValue>;

/// Whether the provider vouches for the user's email address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailVerificationState {
	/// `email_verified` was `true`.
	Verified,
	/// `email_verified` was `false` or absent.
	#[default]
	Unverified,
}
impl EmailVerificationState {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Verified => "verified",
			Self::Unverified => "unverified",
		}
	}
}
impl From<bool> for EmailVerificationState {
	fn from(verified: bool) -> Self {
		if verified { Self::Verified } else { Self::Unverified }
	}
}

/// Normalized identity returned by [`Driver::user`](crate::flows::Driver::user).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalIdentity {
	/// Subject identifier (`sub`).
	pub id: String,
	/// Email address (`email`).
	pub email: Option<String>,
	/// Display name (`name`, falling back to `preferred_username`).
	pub name: Option<String>,
	/// Username (`preferred_username`).
	pub nick_name: Option<String>,
	/// Given name (`given_name`).
	pub first_name: Option<String>,
	/// Family name (`family_name`).
	pub last_name: Option<String>,
	/// Avatar URL; Keycloak userinfo never supplies one.
	pub avatar_url: Option<String>,
	/// Email verification state derived from `email_verified`.
	pub email_verification_state: EmailVerificationState,
	/// Full validated userinfo payload.
	pub original: RawProfile,
	/// Token used to fetch the profile.
	pub token: AccessToken,
}
impl CanonicalIdentity {
	/// Returns the email, failing when the profile has none.
	///
	/// Use this before handing the identity to a
	/// [`UserStore`](crate::ext::UserStore), which keys records by email.
	pub fn require_email(&self) -> Result<&str, ProfileError> {
		self.email.as_deref().ok_or(ProfileError::MissingEmail)
	}

	/// Returns true when the provider verified the email address.
	pub fn email_verified(&self) -> bool {
		self.email_verification_state == EmailVerificationState::Verified
	}

	/// Looks up a provider-specific claim from the original payload.
	pub fn claim(&self, name: &str) -> Option<&JsonValue> {
		self.original.get(name)
	}
}
