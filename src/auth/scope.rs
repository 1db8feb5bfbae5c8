//! Scope modeling for authorization requests.

// std
use std::collections::BTreeSet;
// self
use crate::_prelude::*;

/// Scope every OpenID Connect login request must carry.
pub const OPENID_SCOPE: &str = "openid";

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scope tokens cannot contain whitespace, `"` or `\` (RFC 6749 section 3.3).
	#[error("Scope `{scope}` contains a character outside the scope-token grammar.")]
	InvalidCharacter {
		/// The offending scope string.
		scope: String,
	},
}

/// Deduplicated, lexicographically ordered set of OAuth scopes.
///
/// Serialized as a JSON array; deserialization re-validates every entry.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet(BTreeSet<String>);
impl ScopeSet {
	/// Validates every scope and collects them into a set.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		scopes
			.into_iter()
			.map(|scope| check_scope(scope.into()))
			.collect::<Result<BTreeSet<_>, _>>()
			.map(Self)
	}

	/// Returns the minimal OpenID Connect scope set (`openid`).
	pub fn openid() -> Self {
		Self(BTreeSet::from([OPENID_SCOPE.to_owned()]))
	}

	/// Returns a copy of the set that is guaranteed to contain `openid`.
	pub fn with_openid(&self) -> Self {
		let mut scopes = self.clone();

		scopes.0.insert(OPENID_SCOPE.to_owned());

		scopes
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the set contains `scope`.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.contains(scope)
	}

	/// Scopes in ascending order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Joins the scopes with the provider's delimiter; `None` when the set is empty.
	pub fn join(&self, delimiter: char) -> Option<String> {
		if self.is_empty() {
			return None;
		}

		let mut buf = [0; 4];
		let delimiter: &str = delimiter.encode_utf8(&mut buf);

		Some(self.iter().collect::<Vec<_>>().join(delimiter))
	}

	/// Space-delimited rendering, empty for an empty set.
	pub fn normalized(&self) -> String {
		self.join(' ').unwrap_or_default()
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_set().entries(self.iter()).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses a whitespace-delimited `scope` parameter. Blank-but-non-empty input is an error.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if !s.is_empty() && s.trim().is_empty() {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl TryFrom<Vec<String>> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(scopes: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(scopes)
	}
}
impl From<ScopeSet> for Vec<String> {
	fn from(scopes: ScopeSet) -> Self {
		scopes.0.into_iter().collect()
	}
}

fn check_scope(scope: String) -> Result<String, ScopeValidationError> {
	if scope.is_empty() {
		Err(ScopeValidationError::Empty)
	} else if scope.chars().any(|c| c.is_whitespace() || c.is_control() || c == '"' || c == '\\') {
		Err(ScopeValidationError::InvalidCharacter { scope })
	} else {
		Ok(scope)
	}
}
