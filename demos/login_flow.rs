//! Walks through a complete login against a simulated realm: redirect, callback checks,
//! code exchange, profile normalization, and the local upsert-by-email.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use reqwest::{Client, redirect::Policy};
use url::Url;
// self
use keycloak_login::{
	ext::{CookieStore, MemoryCookieStore, MemoryUserStore, UserStore},
	flows::{CallbackQuery, ReqwestDriver},
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	provider::{ProviderConfig, ProviderSettings},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let realm = MockServer::start_async().await;

	realm
		.mock_async(|when, then| {
			when.method(POST).path("/realms/solvro/protocol/openid-connect/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"token_type\":\"bearer\"}");
		})
		.await;
	realm
		.mock_async(|when, then| {
			when.method(GET)
				.path("/realms/solvro/protocol/openid-connect/userinfo")
				.header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(
				"{\"sub\":\"d93e1772\",\"email\":\"testuser@gmail.com\",\"email_verified\":true,\"preferred_username\":\"testuser\",\"given_name\":\"Test\",\"family_name\":\"User\"}",
			);
		})
		.await;

	let settings = ProviderSettings {
		client_id: Some("web-planer".into()),
		client_secret: Some("demo-secret".into()),
		callback_url: Some("http://localhost:3333/auth/keycloak/callback".into()),
		provider_base_url: Some(format!(
			"{}/realms/{{realm}}/protocol/openid-connect/{{action}}",
			realm.base_url()
		)),
		require_email: Some(true),
		..Default::default()
	};
	// The simulated realm serves a self-signed certificate; production code uses `ReqwestDriver::new`.
	let client = Client::builder()
		.redirect(Policy::none())
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()?;
	let driver = ReqwestDriver::with_http_client(
		ProviderConfig::try_from(settings)?,
		ReqwestHttpClient::with_client(client),
		Arc::new(ReqwestTransportErrorMapper),
	);
	let users = MemoryUserStore::default();
	let mut browser = MemoryCookieStore::default();

	// GET /auth/keycloak/redirect
	let redirect = driver.redirect();

	println!("Redirect to {}.", redirect.url);
	println!("Set-Cookie: {}", redirect.set_cookie.to_header_value());

	browser.set(redirect.set_cookie);

	// The realm sends the browser back with a code.
	let callback_url = Url::parse(&format!(
		"http://localhost:3333/auth/keycloak/callback?code=demo-code&state={}",
		redirect.state.as_str()
	))?;
	// GET /auth/keycloak/callback
	let request = driver.load_callback(CallbackQuery::from_url(&callback_url), &mut browser);

	if driver.access_denied(&request) {
		println!("You have cancelled the login process.");

		return Ok(());
	}
	if driver.state_mismatch(&request) {
		println!("We are unable to verify the request. Please try again.");

		return Ok(());
	}
	if let Some(error) = driver.get_error(&request) {
		println!("The realm answered with `{error}`.");

		return Ok(());
	}

	let identity = driver.user(&request).await?;
	let user = users.find_or_create_by_email(identity.require_email()?, &identity).await?;

	println!("Signed in {} as local user #{} ({:?}).", identity.id, user.id, user.full_name);

	// Replaying the same callback fails: the state cookie was consumed.
	let replay = driver.load_callback(CallbackQuery::from_url(&callback_url), &mut browser);

	match driver.user(&replay).await {
		Ok(_) => println!("Replay unexpectedly succeeded."),
		Err(e) => println!("Replay rejected: {e}"),
	}

	Ok(())
}
