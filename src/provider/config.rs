//! Provider configuration data structures shared by all flows.
//!
//! The module exposes the validated [`ProviderConfig`], its builder, the serde-friendly
//! [`ProviderSettings`] surface, and the realm URL template used to derive endpoints.

/// Builder API for assembling provider configs.
pub mod builder;
/// Provider-specific quirk toggles.
pub mod quirks;
/// Deserializable option surface (files, environment).
pub mod settings;
/// Realm URL templates and endpoint actions.
pub mod template;

pub use builder::*;
pub use quirks::*;
pub use settings::*;
pub use template::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, RealmName, ScopeSet, Secret},
};

/// Realm used when none is configured.
pub const DEFAULT_REALM: &str = "solvro";
/// Realm template used when neither a base URL nor every explicit endpoint is configured.
pub const DEFAULT_PROVIDER_BASE_URL: &str =
	"https://auth.solvro.pl/realms/{realm}/protocol/openid-connect/{action}";
/// Name of the cookie carrying the anti-forgery state.
pub const DEFAULT_STATE_COOKIE_NAME: &str = "keycloak_oauth_state";
/// Lifetime of the state cookie; bounds how long a login flow may take.
pub const DEFAULT_STATE_COOKIE_MAX_AGE: Duration = Duration::minutes(10);

/// Endpoint set resolved for the realm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint users are redirected to.
	pub authorize: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
	/// Userinfo endpoint used to fetch profile claims.
	pub userinfo: Url,
}
impl ProviderEndpoints {
	/// Returns the endpoint for an action.
	pub fn get(&self, action: EndpointAction) -> &Url {
		match action {
			EndpointAction::Authorize => &self.authorize,
			EndpointAction::Token => &self.token,
			EndpointAction::UserInfo => &self.userinfo,
		}
	}
}

/// Whether a login must yield an email address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailPolicy {
	/// Profiles without `email` are accepted.
	#[default]
	Optional,
	/// Profiles without `email` fail with [`ProfileError::MissingEmail`](crate::error::ProfileError::MissingEmail).
	Required,
}

/// `SameSite` attribute of the state cookie.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
	/// Sent on top-level navigations back from the provider.
	#[default]
	Lax,
	/// Never sent cross-site; breaks most redirect flows.
	Strict,
	/// Always sent; requires `Secure`.
	None,
}
impl SameSite {
	/// Returns the attribute value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Lax => "Lax",
			Self::Strict => "Strict",
			Self::None => "None",
		}
	}
}

/// Attributes of the single-use state cookie.
///
/// One cookie name per driver means one active login flow per browser: a second redirect
/// overwrites the first flow's state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCookieConfig {
	/// Cookie name.
	pub name: String,
	/// Cookie lifetime.
	pub max_age: Duration,
	/// Cookie path; defaults to the callback path so the cookie only travels to the callback.
	pub path: String,
	/// Whether the cookie is marked `Secure`.
	pub secure: bool,
	/// `SameSite` attribute.
	pub same_site: SameSite,
}
impl StateCookieConfig {
	/// Derives cookie attributes scoped to the callback URL.
	pub fn for_callback(callback_url: &Url) -> Self {
		Self {
			name: DEFAULT_STATE_COOKIE_NAME.into(),
			max_age: DEFAULT_STATE_COOKIE_MAX_AGE,
			path: callback_url.path().to_owned(),
			secure: callback_url.scheme() == "https",
			same_site: SameSite::default(),
		}
	}
}

/// Immutable provider configuration consumed by the driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderConfig {
	/// OAuth 2.0 client identifier.
	pub client_id: ClientId,
	/// Confidential client secret; redacted in `Debug`.
	#[serde(skip)]
	pub client_secret: Secret,
	/// Absolute callback (redirect) URL registered with the realm.
	pub callback_url: Url,
	/// Realm the endpoints were derived for; `None` when no endpoint came from a `{realm}`
	/// template and no realm was configured.
	pub realm: Option<RealmName>,
	/// Resolved endpoints.
	pub endpoints: ProviderEndpoints,
	/// Requested scopes; always contains `openid`.
	pub scopes: ScopeSet,
	/// State cookie attributes.
	pub state_cookie: StateCookieConfig,
	/// Email presence policy.
	pub email_policy: EmailPolicy,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderConfig {
	/// Creates a new builder.
	pub fn builder() -> ProviderConfigBuilder {
		ProviderConfigBuilder::new()
	}
}
