//! Anti-forgery state tokens bound to a short-lived, single-use cookie.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	ext::{CookieDirective, CookieStore},
	provider::StateCookieConfig,
};

/// Random bytes per state token (256 bits).
const STATE_ENTROPY_BYTES: usize = 32;

/// Returned when the callback `state` does not match the state cookie.
///
/// A missing or empty cookie (expired, blocked, or already consumed) is reported the same way
/// as a mismatching value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Callback state does not match the state cookie.")]
pub struct StateMismatch;

/// Opaque per-redirect state value, URL-safe base64 without padding.
#[derive(Clone, PartialEq, Eq)]
pub struct StateToken(String);
impl StateToken {
	/// Generates a fresh token from the thread-local CSPRNG.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; STATE_ENTROPY_BYTES];

		rand::rng().fill_bytes(&mut bytes);

		Self(URL_SAFE_NO_PAD.encode(bytes))
	}

	/// Returns the token value sent as the `state` query parameter.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for StateToken {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for StateToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StateToken(..)")
	}
}

/// Issues and consumes state tokens using the configured cookie attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateCodec {
	cookie: StateCookieConfig,
}
impl StateCodec {
	/// Creates a codec for the given cookie attributes.
	pub fn new(cookie: StateCookieConfig) -> Self {
		Self { cookie }
	}

	/// Cookie attributes used by this codec.
	pub fn cookie(&self) -> &StateCookieConfig {
		&self.cookie
	}

	/// Generates a token and the directive that stores it in the state cookie.
	pub fn issue(&self) -> (StateToken, CookieDirective) {
		let token = StateToken::generate();
		let directive = CookieDirective::set(&self.cookie, token.as_str());

		(token, directive)
	}

	/// Reads the state cookie and clears it, whatever the value.
	///
	/// This is the only place the cookie is consumed; a second call within the same request
	/// returns `None`.
	pub fn take<S>(&self, cookies: &mut S) -> Option<String>
	where
		S: ?Sized + CookieStore,
	{
		let value = cookies.get(&self.cookie.name);

		cookies.clear(CookieDirective::clear(&self.cookie));

		value.filter(|value| !value.is_empty())
	}

	/// Compares the stored cookie value with the returned `state` in constant time.
	pub fn verify(cookie: Option<&str>, returned: Option<&str>) -> Result<(), StateMismatch> {
		match (cookie, returned) {
			(Some(expected), Some(actual))
				if !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(actual.as_bytes())) =>
				Ok(()),
			_ => Err(StateMismatch),
		}
	}

	/// Takes the cookie and verifies it against `returned` in one step.
	pub fn consume<S>(&self, cookies: &mut S, returned: Option<&str>) -> Result<(), StateMismatch>
	where
		S: ?Sized + CookieStore,
	{
		let cookie = self.take(cookies);

		Self::verify(cookie.as_deref(), returned)
	}
}
