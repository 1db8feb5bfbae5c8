// self
use crate::{_prelude::*, auth::RealmName, provider::ProviderConfigError};

/// Placeholder replaced by the realm name.
pub const REALM_PLACEHOLDER: &str = "{realm}";
/// Placeholder replaced by the endpoint action.
pub const ACTION_PLACEHOLDER: &str = "{action}";

/// OpenID Connect endpoints a realm template can derive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointAction {
	/// Authorization endpoint (`auth`).
	Authorize,
	/// Token endpoint (`token`).
	Token,
	/// Userinfo endpoint (`userinfo`).
	UserInfo,
}
impl EndpointAction {
	/// All actions, in derivation order.
	pub const ALL: [Self; 3] = [Self::Authorize, Self::Token, Self::UserInfo];

	/// Returns the path segment substituted for `{action}`.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Authorize => "auth",
			Self::Token => "token",
			Self::UserInfo => "userinfo",
		}
	}

	/// Returns a human-readable endpoint label for errors and spans.
	pub const fn label(self) -> &'static str {
		match self {
			Self::Authorize => "authorization",
			Self::Token => "token",
			Self::UserInfo => "userinfo",
		}
	}
}
impl Display for EndpointAction {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// URL template containing `{realm}` and `{action}` placeholders, e.g.
/// `https://idp.example/realms/{realm}/protocol/openid-connect/{action}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RealmTemplate(String);
impl RealmTemplate {
	/// Validates that the template carries an `{action}` placeholder.
	pub fn new(template: impl Into<String>) -> Result<Self, ProviderConfigError> {
		let template = template.into();

		if !template.contains(ACTION_PLACEHOLDER) {
			return Err(ProviderConfigError::TemplateMissingAction { template });
		}

		Ok(Self(template))
	}

	/// Returns true when the template references `{realm}`.
	pub fn uses_realm(&self) -> bool {
		self.0.contains(REALM_PLACEHOLDER)
	}

	/// Substitutes the realm and action, then parses the result.
	///
	/// `realm` may be `None` only for templates without a `{realm}` placeholder.
	pub fn resolve(
		&self,
		realm: Option<&RealmName>,
		action: EndpointAction,
	) -> Result<Url, ProviderConfigError> {
		let mut raw = self.0.replace(ACTION_PLACEHOLDER, action.as_str());

		if self.uses_realm() {
			let realm = realm.ok_or(ProviderConfigError::MissingRealm)?;

			raw = raw.replace(REALM_PLACEHOLDER, realm.as_ref());
		}

		Url::parse(&raw).map_err(|source| ProviderConfigError::InvalidEndpointUrl {
			endpoint: action.label(),
			source,
		})
	}

	/// Returns the raw template.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl TryFrom<String> for RealmTemplate {
	type Error = ProviderConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<RealmTemplate> for String {
	fn from(value: RealmTemplate) -> Self {
		value.0
	}
}
impl Display for RealmTemplate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
