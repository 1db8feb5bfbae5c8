//! Credential wrapper for client secrets and issued tokens.

// crates.io
use subtle::ConstantTimeEq;
// self
use crate::_prelude::*;

/// Sensitive string that never prints its value and compares in constant time.
///
/// Use [`Secret::expose`] only at the point the value goes on the wire.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(Arc<str>);
impl Secret {
	/// Wraps a sensitive value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(Arc::from(value.into()))
	}

	/// Borrows the raw value.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns true when the wrapped value is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl PartialEq for Secret {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
	}
}
impl Eq for Secret {}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Secret(<redacted>)")
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
