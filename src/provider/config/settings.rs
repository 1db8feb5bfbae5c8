// std
use std::env;
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	provider::{EmailPolicy, ProviderConfig, ProviderConfigBuilder, ProviderConfigError},
};

/// Deserializable option surface for [`ProviderConfig`].
///
/// Field names follow the camelCase option names used by web-framework configs (`clientId`,
/// `keycloakUrl`, `accessTokenUrl`, ...), so settings can be loaded from JSON or TOML files
/// or from the environment via [`ProviderSettings::from_env`].
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderSettings {
	/// OAuth 2.0 client identifier.
	pub client_id: Option<String>,
	/// Confidential client secret.
	pub client_secret: Option<String>,
	/// Absolute callback URL.
	pub callback_url: Option<String>,
	/// Realm URL template.
	#[serde(alias = "keycloakUrl")]
	pub provider_base_url: Option<String>,
	/// Realm name.
	pub realm: Option<String>,
	/// Explicit authorization endpoint.
	pub authorize_url: Option<String>,
	/// Explicit token endpoint.
	#[serde(alias = "tokenUrl")]
	pub access_token_url: Option<String>,
	/// Explicit userinfo endpoint.
	pub user_info_url: Option<String>,
	/// Requested scopes, space-delimited.
	pub scopes: Option<String>,
	/// Whether an email claim is mandatory.
	pub require_email: Option<bool>,
}
impl ProviderSettings {
	/// Reads `{prefix}_CLIENT_ID`, `{prefix}_CLIENT_SECRET`, `{prefix}_CALLBACK_URL`, `{prefix}_URL`,
	/// `{prefix}_REALM`, `{prefix}_AUTHORIZE_URL`, `{prefix}_TOKEN_URL`, `{prefix}_USERINFO_URL`,
	/// `{prefix}_SCOPES`, and `{prefix}_REQUIRE_EMAIL`. Unset or empty variables stay `None`.
	pub fn from_env(prefix: &str) -> Self {
		Self::from_lookup(|name| env::var(format!("{prefix}_{name}")).ok())
	}

	/// Same as [`from_env`](Self::from_env) but reads from an arbitrary lookup function.
	pub fn from_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

		Self {
			client_id: read("CLIENT_ID"),
			client_secret: read("CLIENT_SECRET"),
			callback_url: read("CALLBACK_URL"),
			provider_base_url: read("URL"),
			realm: read("REALM"),
			authorize_url: read("AUTHORIZE_URL"),
			access_token_url: read("TOKEN_URL"),
			user_info_url: read("USERINFO_URL"),
			scopes: read("SCOPES"),
			require_email: read("REQUIRE_EMAIL").map(|value| {
				matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
			}),
		}
	}

	/// Converts the raw settings into a builder, parsing every URL.
	pub fn into_builder(self) -> Result<ProviderConfigBuilder, ProviderConfigError> {
		let mut builder = ProviderConfig::builder();

		if let Some(client_id) = self.client_id {
			builder = builder.client_id(client_id);
		}
		if let Some(secret) = self.client_secret {
			builder = builder.client_secret(secret);
		}
		if let Some(callback) = self.callback_url {
			builder = builder.callback_url(
				Url::parse(&callback).map_err(ProviderConfigError::InvalidCallbackUrl)?,
			);
		}
		if let Some(template) = self.provider_base_url {
			builder = builder.provider_base_url(template);
		}
		if let Some(realm) = self.realm {
			builder = builder.realm(realm);
		}
		if let Some(url) = self.authorize_url {
			builder = builder.authorize_url(parse_endpoint("authorization", &url)?);
		}
		if let Some(url) = self.access_token_url {
			builder = builder.token_url(parse_endpoint("token", &url)?);
		}
		if let Some(url) = self.user_info_url {
			builder = builder.userinfo_url(parse_endpoint("userinfo", &url)?);
		}
		if let Some(scopes) = self.scopes {
			builder = builder
				.scopes(ScopeSet::from_str(&scopes).map_err(ProviderConfigError::InvalidScope)?);
		}
		if self.require_email == Some(true) {
			builder = builder.email_policy(EmailPolicy::Required);
		}

		Ok(builder)
	}
}
impl Debug for ProviderSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderSettings")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("callback_url", &self.callback_url)
			.field("provider_base_url", &self.provider_base_url)
			.field("realm", &self.realm)
			.field("authorize_url", &self.authorize_url)
			.field("access_token_url", &self.access_token_url)
			.field("user_info_url", &self.user_info_url)
			.field("scopes", &self.scopes)
			.field("require_email", &self.require_email)
			.finish()
	}
}
impl TryFrom<ProviderSettings> for ProviderConfig {
	type Error = ProviderConfigError;

	fn try_from(settings: ProviderSettings) -> Result<Self, Self::Error> {
		settings.into_builder()?.build()
	}
}

fn parse_endpoint(endpoint: &'static str, raw: &str) -> Result<Url, ProviderConfigError> {
	Url::parse(raw).map_err(|source| ProviderConfigError::InvalidEndpointUrl { endpoint, source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ScopeValidationError;

	#[test]
	fn deserializes_framework_style_option_names() {
		let settings: ProviderSettings = serde_json::from_value(serde_json::json!({
			"clientId": "myclient",
			"clientSecret": "shh",
			"callbackUrl": "http://localhost:3333/auth/keycloak/callback",
			"keycloakUrl": "http://localhost:8080/realms/{realm}/protocol/openid-connect/{action}",
			"realm": "myrealm",
			"accessTokenUrl": "http://localhost:8080/custom/token"
		}))
		.expect("Settings should deserialize.");
		let config = ProviderConfig::try_from(settings).expect("Settings should build a config.");

		assert_eq!(
			config.endpoints.authorize.as_str(),
			"http://localhost:8080/realms/myrealm/protocol/openid-connect/auth"
		);
		assert_eq!(config.endpoints.token.as_str(), "http://localhost:8080/custom/token");
		assert!(!config.state_cookie.secure);
	}

	#[test]
	fn lookup_reads_prefixed_variables() {
		let vars = HashMap::from([
			("CLIENT_ID", "web-planer"),
			("CLIENT_SECRET", "shh"),
			("CALLBACK_URL", "https://app.example/cb"),
			("REALM", "acme"),
			("SCOPES", "profile email"),
			("REQUIRE_EMAIL", "true"),
			("TOKEN_URL", " "),
		]);
		let settings = ProviderSettings::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

		assert_eq!(settings.access_token_url, None);
		assert!(!format!("{settings:?}").contains("shh"));

		let config = ProviderConfig::try_from(settings).expect("Env settings should build.");

		assert_eq!(config.realm.as_ref().map(|realm| realm.as_ref()), Some("acme"));
		assert_eq!(config.scopes.normalized(), "email openid profile");
		assert_eq!(config.email_policy, EmailPolicy::Required);
	}

	#[test]
	fn malformed_scopes_fail_instead_of_falling_back() {
		let settings = ProviderSettings {
			client_id: Some("web-planer".into()),
			client_secret: Some("shh".into()),
			callback_url: Some("https://app.example/cb".into()),
			scopes: Some("profile \"email".into()),
			..Default::default()
		};
		let err = settings.into_builder().expect_err("Quoted scopes must be rejected.");

		assert!(matches!(
			err,
			ProviderConfigError::InvalidScope(ScopeValidationError::InvalidCharacter { ref scope })
				if scope == "\"email"
		));
	}

	#[test]
	fn unparsable_urls_are_reported_per_endpoint() {
		let settings = ProviderSettings {
			client_id: Some("web-planer".into()),
			client_secret: Some("shh".into()),
			callback_url: Some("https://app.example/cb".into()),
			user_info_url: Some("::nope::".into()),
			..Default::default()
		};
		let err = settings.into_builder().expect_err("Bad URL must be rejected.");

		assert!(matches!(err, ProviderConfigError::InvalidEndpointUrl { endpoint: "userinfo", .. }));
	}
}
