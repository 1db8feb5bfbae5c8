// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, IdentifierError, RealmName, ScopeSet, ScopeValidationError, Secret},
	provider::{
		DEFAULT_PROVIDER_BASE_URL, DEFAULT_REALM, EmailPolicy, EndpointAction, ProviderConfig,
		ProviderEndpoints, ProviderQuirks, RealmTemplate, StateCookieConfig,
	},
};

/// Errors raised while constructing or validating provider configs.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderConfigError {
	/// Client identifier is required.
	#[error("Missing client identifier.")]
	MissingClientId,
	/// Client identifier failed validation.
	#[error("Client identifier is invalid.")]
	InvalidClientId(#[source] IdentifierError),
	/// Client secret is required for the confidential code exchange.
	#[error("Missing client secret.")]
	MissingClientSecret,
	/// Callback URL is required.
	#[error("Missing callback URL.")]
	MissingCallbackUrl,
	/// Callback URL cannot be parsed as an absolute URL.
	#[error("Callback URL is invalid.")]
	InvalidCallbackUrl(#[source] url::ParseError),
	/// The realm template needs a realm but none resolved.
	#[error("Missing realm name.")]
	MissingRealm,
	/// Realm failed validation.
	#[error("Realm name is invalid.")]
	InvalidRealm(#[source] IdentifierError),
	/// The realm template has no `{action}` placeholder.
	#[error("Provider base URL `{template}` is missing the {{action}} placeholder.")]
	TemplateMissingAction {
		/// Template that failed validation.
		template: String,
	},
	/// No explicit URL and no base template for a required endpoint.
	#[error("Missing {endpoint} endpoint and no provider base URL to derive it from.")]
	MissingEndpoint {
		/// Which endpoint is missing.
		endpoint: &'static str,
	},
	/// An endpoint URL could not be parsed.
	#[error("The {endpoint} endpoint URL is invalid.")]
	InvalidEndpointUrl {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A configured scope is not a valid scope token.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[source] ScopeValidationError),
	/// Reject scope delimiters that are control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
	/// State cookie attributes are unusable.
	#[error("State cookie is invalid: {reason}.")]
	InvalidStateCookie {
		/// Why the cookie attributes were rejected.
		reason: &'static str,
	},
}

/// Builder for [`ProviderConfig`] values.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
	/// OAuth 2.0 client identifier.
	pub client_id: Option<String>,
	/// Confidential client secret.
	pub client_secret: Option<Secret>,
	/// Absolute callback URL.
	pub callback_url: Option<Url>,
	/// Realm URL template; falls back to [`DEFAULT_PROVIDER_BASE_URL`] when allowed.
	pub provider_base_url: Option<String>,
	/// Whether [`DEFAULT_PROVIDER_BASE_URL`] may be used when no template is set.
	pub use_default_base_url: bool,
	/// Realm name; falls back to [`DEFAULT_REALM`].
	pub realm: Option<String>,
	/// Explicit authorization endpoint.
	pub authorize_url: Option<Url>,
	/// Explicit token endpoint.
	pub token_url: Option<Url>,
	/// Explicit userinfo endpoint.
	pub userinfo_url: Option<Url>,
	/// Requested scopes (`openid` is always added).
	pub scopes: ScopeSet,
	/// State cookie override; defaults to [`StateCookieConfig::for_callback`].
	pub state_cookie: Option<StateCookieConfig>,
	/// Email presence policy.
	pub email_policy: EmailPolicy,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderConfigBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self {
			client_id: None,
			client_secret: None,
			callback_url: None,
			provider_base_url: None,
			use_default_base_url: true,
			realm: None,
			authorize_url: None,
			token_url: None,
			userinfo_url: None,
			scopes: ScopeSet::openid(),
			state_cookie: None,
			email_policy: EmailPolicy::default(),
			quirks: ProviderQuirks::default(),
		}
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(Secret::new(secret));

		self
	}

	/// Sets the callback URL.
	pub fn callback_url(mut self, url: Url) -> Self {
		self.callback_url = Some(url);

		self
	}

	/// Sets the realm URL template (`{realm}` and `{action}` placeholders).
	pub fn provider_base_url(mut self, template: impl Into<String>) -> Self {
		self.provider_base_url = Some(template.into());

		self
	}

	/// Disables the built-in base URL so every endpoint must be explicit or templated.
	pub fn without_default_base_url(mut self) -> Self {
		self.use_default_base_url = false;

		self
	}

	/// Sets the realm name.
	pub fn realm(mut self, realm: impl Into<String>) -> Self {
		self.realm = Some(realm.into());

		self
	}

	/// Overrides the authorization endpoint.
	pub fn authorize_url(mut self, url: Url) -> Self {
		self.authorize_url = Some(url);

		self
	}

	/// Overrides the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Overrides the userinfo endpoint.
	pub fn userinfo_url(mut self, url: Url) -> Self {
		self.userinfo_url = Some(url);

		self
	}

	/// Overrides the requested scopes.
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Overrides the state cookie attributes.
	pub fn state_cookie(mut self, cookie: StateCookieConfig) -> Self {
		self.state_cookie = Some(cookie);

		self
	}

	/// Overrides the email presence policy.
	pub fn email_policy(mut self, policy: EmailPolicy) -> Self {
		self.email_policy = policy;

		self
	}

	/// Overrides the provider quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ProviderConfig, ProviderConfigError> {
		let client_id = self
			.client_id
			.ok_or(ProviderConfigError::MissingClientId)
			.and_then(|id| ClientId::new(id).map_err(ProviderConfigError::InvalidClientId))?;
		let client_secret = self
			.client_secret
			.filter(|secret| !secret.is_empty())
			.ok_or(ProviderConfigError::MissingClientSecret)?;
		let callback_url = self.callback_url.ok_or(ProviderConfigError::MissingCallbackUrl)?;
		let template = match self.provider_base_url {
			Some(template) => Some(RealmTemplate::new(template)?),
			None if self.use_default_base_url =>
				Some(RealmTemplate::new(DEFAULT_PROVIDER_BASE_URL)?),
			None => None,
		};
		let needs_realm = template.as_ref().is_some_and(|template| {
			template.uses_realm()
				&& [&self.authorize_url, &self.token_url, &self.userinfo_url]
					.iter()
					.any(|explicit| explicit.is_none())
		});
		let realm = resolve_realm(self.realm, needs_realm)?;
		let derive = |explicit: Option<Url>, action: EndpointAction| match (explicit, &template) {
			(Some(url), _) => Ok(url),
			(None, Some(template)) => template.resolve(realm.as_ref(), action),
			(None, None) => Err(ProviderConfigError::MissingEndpoint { endpoint: action.label() }),
		};
		let endpoints = ProviderEndpoints {
			authorize: derive(self.authorize_url, EndpointAction::Authorize)?,
			token: derive(self.token_url, EndpointAction::Token)?,
			userinfo: derive(self.userinfo_url, EndpointAction::UserInfo)?,
		};
		let state_cookie =
			self.state_cookie.unwrap_or_else(|| StateCookieConfig::for_callback(&callback_url));
		let config = ProviderConfig {
			client_id,
			client_secret,
			callback_url,
			realm,
			endpoints,
			scopes: self.scopes.with_openid(),
			state_cookie,
			email_policy: self.email_policy,
			quirks: self.quirks,
		};

		config.validate()?;

		Ok(config)
	}
}
impl Default for ProviderConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ProviderConfig {
	/// Validates invariants for the config.
	fn validate(&self) -> Result<(), ProviderConfigError> {
		for action in EndpointAction::ALL {
			validate_endpoint(action.label(), self.endpoints.get(action))?;
		}

		validate_scope_delimiter(self.quirks.scope_delimiter)?;
		validate_state_cookie(&self.state_cookie)?;

		Ok(())
	}
}

/// A realm is mandatory only when a template will substitute it; otherwise an unset or empty
/// realm resolves to `None`.
fn resolve_realm(
	realm: Option<String>,
	needed: bool,
) -> Result<Option<RealmName>, ProviderConfigError> {
	let raw = match realm {
		Some(raw) if raw.is_empty() && !needed => return Ok(None),
		Some(raw) => raw,
		None if needed => DEFAULT_REALM.to_owned(),
		None => return Ok(None),
	};

	RealmName::new(raw).map(Some).map_err(|e| match e {
		IdentifierError::Empty { .. } => ProviderConfigError::MissingRealm,
		e => ProviderConfigError::InvalidRealm(e),
	})
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderConfigError> {
	if url.scheme() == "https" || (url.scheme() == "http" && is_loopback(url)) {
		Ok(())
	} else {
		Err(ProviderConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.is_ok_and(|ip| ip.is_loopback()),
		None => false,
	}
}

fn validate_scope_delimiter(delimiter: char) -> Result<(), ProviderConfigError> {
	if delimiter.is_control() {
		Err(ProviderConfigError::InvalidScopeDelimiter { delimiter })
	} else {
		Ok(())
	}
}

fn validate_state_cookie(cookie: &StateCookieConfig) -> Result<(), ProviderConfigError> {
	let is_separator = |c: char| c.is_whitespace() || c.is_control() || "=;,".contains(c);

	if cookie.name.is_empty() || cookie.name.contains(is_separator) {
		return Err(ProviderConfigError::InvalidStateCookie { reason: "name is not a cookie token" });
	}
	if !cookie.max_age.is_positive() {
		return Err(ProviderConfigError::InvalidStateCookie { reason: "max-age must be positive" });
	}
	if !cookie.path.starts_with('/') {
		return Err(ProviderConfigError::InvalidStateCookie { reason: "path must be absolute" });
	}
	if cookie.path.contains(|c: char| c.is_whitespace() || c.is_control() || ";,".contains(c)) {
		return Err(ProviderConfigError::InvalidStateCookie {
			reason: "path contains a cookie separator",
		});
	}

	Ok(())
}
