//! Server-side authorization code exchange.

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, CONTENT_TYPE},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Secret, TokenType},
	error::{ConfigError, TokenExchangeError},
	flows::Driver,
	http::{ProviderHttpClient, TransportErrorMapper},
	obs::{self, FlowOutcome, FlowSpan, FlowStage},
	provider::EndpointAction,
};

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	token_type: Option<String>,
	expires_in: Option<i64>,
	refresh_token: Option<String>,
	id_token: Option<String>,
	scope: Option<String>,
}
impl TokenResponse {
	fn into_access_token(self) -> AccessToken {
		AccessToken {
			token: Secret::new(self.access_token),
			token_type: TokenType::from_response(self.token_type.as_deref()),
			expires_in: self.expires_in.map(Duration::seconds),
			refresh_token: self.refresh_token.map(Secret::new),
			id_token: self.id_token.map(Secret::new),
			scope: self.scope,
		}
	}
}

impl<C, M> Driver<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges an authorization code for an access token.
	///
	/// Posts `grant_type=authorization_code`, `code`, `redirect_uri`, `client_id`, and
	/// `client_secret` as a form body to the token endpoint. Any non-2xx answer becomes
	/// [`TokenExchangeError::Rejected`]; a 2xx answer without a usable token becomes
	/// [`TokenExchangeError::Malformed`]. Codes are single-use, so nothing here retries.
	pub async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
		const STAGE: FlowStage = FlowStage::TokenExchange;

		let span = FlowSpan::new(STAGE);

		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let result = span.instrument(self.exchange_code_inner(code)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(STAGE, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(STAGE, FlowOutcome::Failure),
		}

		result
	}

	async fn exchange_code_inner(&self, code: &str) -> Result<AccessToken> {
		let request = self.token_request(code)?;
		let (response, metadata) = self
			.dispatch(EndpointAction::Token, request)
			.await
			.map_err(TokenExchangeError::from)?;
		let status = response.status().as_u16();
		let body = response.into_body();

		if !(200..300).contains(&status) {
			obs::log_endpoint_rejection(FlowStage::TokenExchange, status);

			return Err(TokenExchangeError::Rejected {
				status,
				body: String::from_utf8_lossy(&body).into_owned(),
				retry_after: metadata.and_then(|meta| meta.retry_after),
			}
			.into());
		}

		let mut de = serde_json::Deserializer::from_slice(&body);
		let parsed: TokenResponse = serde_path_to_error::deserialize(&mut de).map_err(|source| {
			TokenExchangeError::Malformed {
				status,
				body: String::from_utf8_lossy(&body).into_owned(),
				source,
			}
		})?;

		Ok(parsed.into_access_token())
	}

	fn token_request(&self, code: &str) -> Result<Request<Vec<u8>>, ConfigError> {
		let form = Serializer::new(String::new())
			.append_pair("grant_type", "authorization_code")
			.append_pair("code", code)
			.append_pair("redirect_uri", self.config.callback_url.as_str())
			.append_pair("client_id", self.config.client_id.as_ref())
			.append_pair("client_secret", self.config.client_secret.expose())
			.finish();
		let request = Request::builder()
			.method(Method::POST)
			.uri(self.config.endpoints.token.as_str())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json")
			.body(form.into_bytes())?;

		Ok(request)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_responses_normalize_bearer_casing() {
		let parsed: TokenResponse = serde_json::from_str(
			r#"{"access_token":"tok123","token_type":"Bearer","expires_in":300,"session_state":"x"}"#,
		)
		.expect("Token response fixture should parse.");
		let token = parsed.into_access_token();

		assert!(token.is_bearer());
		assert_eq!(token.token.expose(), "tok123");
		assert_eq!(token.expires_in, Some(Duration::minutes(5)));
		assert!(token.refresh_token.is_none());
	}

	#[test]
	fn token_responses_keep_foreign_types() {
		let parsed: TokenResponse =
			serde_json::from_str(r#"{"access_token":"tok123","token_type":"DPoP"}"#)
				.expect("Token response fixture should parse.");

		assert_eq!(parsed.into_access_token().token_type, TokenType::Other("DPoP".into()));
	}
}
