//! Validated identifiers carried by the provider configuration.

// self
use crate::_prelude::*;

/// Longest realm or client identifier accepted (Keycloak stores both as 255-character columns).
pub const IDENTIFIER_MAX_LEN: usize = 255;

macro_rules! def_id {
	($name:ident, $kind:literal, $check:path, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps an identifier.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				$check($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (realm, client).
		kind: &'static str,
	},
	/// The identifier contains whitespace or control characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (realm, client).
		kind: &'static str,
	},
	/// The identifier contains a character that would change the meaning of an endpoint URL.
	#[error("{kind} identifier contains the reserved character `{character}`.")]
	ReservedCharacter {
		/// Kind of identifier (realm, client).
		kind: &'static str,
		/// Offending character.
		character: char,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (realm, client).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id!(ClientId, "Client", check_token, "OAuth 2.0 client identifier registered with the realm.");
def_id!(
	RealmName,
	"Realm",
	check_path_segment,
	"Realm substituted into `{realm}` URL templates; must be a single URL path segment."
);

fn check_token(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		Err(IdentifierError::Empty { kind })
	} else if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
		Err(IdentifierError::ContainsWhitespace { kind })
	} else if value.chars().count() > IDENTIFIER_MAX_LEN {
		Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN })
	} else {
		Ok(())
	}
}

fn check_path_segment(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	check_token(kind, value)?;

	match value.chars().find(|c| matches!(c, '/' | '?' | '#' | '%' | '{' | '}')) {
		Some(character) => Err(IdentifierError::ReservedCharacter { kind, character }),
		None => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn realms_must_be_single_path_segments() {
		let realm = RealmName::new("acme").expect("Realm fixture should be valid.");

		assert_eq!(realm.as_ref(), "acme");
		assert_eq!(format!("{realm:?}"), "Realm(acme)");
		assert_eq!(RealmName::new(""), Err(IdentifierError::Empty { kind: "Realm" }));
		assert_eq!(
			RealmName::new("acme/../admin"),
			Err(IdentifierError::ReservedCharacter { kind: "Realm", character: '/' })
		);
		assert!(RealmName::new("{realm}").is_err());
	}

	#[test]
	fn client_ids_allow_url_characters_but_not_whitespace() {
		assert!(ClientId::new("https://app.example/client").is_ok());
		assert!(matches!(
			ClientId::new("web planer"),
			Err(IdentifierError::ContainsWhitespace { kind: "Client" })
		));
		assert!(matches!(
			ClientId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { .. })
		));
	}

	#[test]
	fn deserialization_enforces_validation() {
		let client: ClientId =
			serde_json::from_str("\"web-planer\"").expect("Client should deserialize.");

		assert_eq!(client.to_string(), "web-planer");
		assert!(serde_json::from_str::<RealmName>("\"a#b\"").is_err());
	}
}
