//! Authorization redirect URL composition.

// self
use crate::{_prelude::*, ext::CookieDirective, flows::StateToken, provider::ProviderConfig};

/// Redirect returned by [`Driver::redirect`](crate::flows::Driver::redirect).
///
/// Send the user agent to `url` and attach `set_cookie` to the same response.
#[derive(Clone, Debug)]
pub struct RedirectInstruction {
	/// Fully-formed authorization URL.
	pub url: Url,
	/// State value embedded in `url`.
	pub state: StateToken,
	/// Directive storing `state` in the state cookie.
	pub set_cookie: CookieDirective,
}

/// Composes the authorization URL for `state`.
///
/// Pure function of its inputs: `client_id`, `redirect_uri`, `response_type=code`, `scope`, and
/// `state` are appended (URL-encoded) to the configured authorization endpoint.
pub fn build_authorize_url(config: &ProviderConfig, state: &StateToken) -> Url {
	let mut url = config.endpoints.authorize.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("client_id", config.client_id.as_ref());
	pairs.append_pair("redirect_uri", config.callback_url.as_str());
	pairs.append_pair("response_type", "code");

	if let Some(scope) = config.scopes.join(config.quirks.scope_delimiter) {
		pairs.append_pair("scope", &scope);
	}

	pairs.append_pair("state", state.as_str());

	drop(pairs);

	url
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> ProviderConfig {
		ProviderConfig::builder()
			.client_id("web-planer")
			.client_secret("shh")
			.callback_url(
				Url::parse("https://app.example.com/auth/keycloak/callback?from=login")
					.expect("Callback fixture should parse."),
			)
			.provider_base_url("https://idp.example/realms/{realm}/protocol/openid-connect/{action}")
			.realm("acme")
			.build()
			.expect("Config fixture should build.")
	}

	#[test]
	fn appends_encoded_parameters_in_order() {
		let state = StateToken::generate();
		let url = build_authorize_url(&config(), &state);

		assert_eq!(url.path(), "/realms/acme/protocol/openid-connect/auth");
		assert_eq!(
			url.query(),
			Some(
				format!(
					"client_id=web-planer\
					 &redirect_uri=https%3A%2F%2Fapp.example.com%2Fauth%2Fkeycloak%2Fcallback%3Ffrom%3Dlogin\
					 &response_type=code&scope=openid&state={}",
					state.as_str()
				)
				.as_str()
			)
		);
	}

	#[test]
	fn is_deterministic_for_a_given_state() {
		let config = config();
		let state = StateToken::generate();

		assert_eq!(build_authorize_url(&config, &state), build_authorize_url(&config, &state));
	}
}
