#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use keycloak_login::{
	_preludet::*,
	auth::{EmailVerificationState, TokenType},
	error::{ProfileError, TokenExchangeError},
	ext::{CookieStore, MemoryCookieStore},
	flows::{CallbackOutcome, CallbackQuery},
};

const TOKEN_PATH: &str = "/realms/acme/protocol/openid-connect/token";
const USERINFO_PATH: &str = "/realms/acme/protocol/openid-connect/userinfo";

fn build_driver(server: &MockServer) -> ReqwestTestDriver {
	build_reqwest_test_driver(
		test_config_builder(&server.base_url())
			.build()
			.expect("Provider config should build for the mock realm."),
	)
}

/// Runs `redirect()` and returns a jar holding the state cookie plus the issued state.
fn start_login(driver: &ReqwestTestDriver) -> (MemoryCookieStore, String) {
	let mut jar = MemoryCookieStore::default();
	let url = driver.redirect_with(&mut jar);
	let state = url
		.query_pairs()
		.find(|(key, _)| key == "state")
		.map(|(_, value)| value.into_owned())
		.expect("Authorization URL should carry a state parameter.");

	(jar, state)
}

#[tokio::test]
async fn callback_exchanges_code_and_normalizes_profile() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);
	let (mut jar, state) = start_login(&driver);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", "abc")
				.form_urlencoded_tuple("redirect_uri", TEST_CALLBACK_URL)
				.form_urlencoded_tuple("client_id", TEST_CLIENT_ID)
				.form_urlencoded_tuple("client_secret", TEST_CLIENT_SECRET);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok123\",\"token_type\":\"bearer\"}");
		})
		.await;
	let userinfo_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(USERINFO_PATH)
				.header("authorization", "Bearer tok123")
				.header("accept", "application/json");
			then.status(200).header("content-type", "application/json").body(
				"{\"sub\":\"u1\",\"email\":\"a@b.com\",\"email_verified\":true,\"preferred_username\":\"alice\"}",
			);
		})
		.await;
	let request = driver.load_callback(
		CallbackQuery::from_pairs([("code", "abc"), ("state", state.as_str())]),
		&mut jar,
	);
	let identity = driver.user(&request).await.expect("Login should produce an identity.");

	token_mock.assert_async().await;
	userinfo_mock.assert_async().await;

	assert_eq!(identity.id, "u1");
	assert_eq!(identity.email.as_deref(), Some("a@b.com"));
	assert_eq!(identity.email_verification_state, EmailVerificationState::Verified);
	assert_eq!(identity.nick_name.as_deref(), Some("alice"));
	assert_eq!(identity.name.as_deref(), Some("alice"));
	assert_eq!(identity.avatar_url, None);
	assert_eq!(identity.token.token.expose(), "tok123");
	assert_eq!(identity.token.token_type, TokenType::Bearer);
	assert!(jar.is_cleared("keycloak_oauth_state"));
}

#[tokio::test]
async fn replayed_callback_is_a_state_mismatch() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);
	let (mut jar, state) = start_login(&driver);
	let query = CallbackQuery::from_pairs([("code", "abc"), ("state", state.as_str())]);
	let first = driver.load_callback(query.clone(), &mut jar);
	let replay = driver.load_callback(query, &mut jar);

	assert!(matches!(driver.classify(&first), CallbackOutcome::SuccessCandidate { .. }));
	assert_eq!(driver.classify(&replay), CallbackOutcome::StateMismatch);
	assert!(matches!(driver.user(&replay).await, Err(Error::StateMismatch)));
}

#[tokio::test]
async fn failed_classification_performs_no_network_calls() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok123\",\"token_type\":\"bearer\"}");
		})
		.await;
	let (mut jar, state) = start_login(&driver);
	let denied = driver.load_callback(
		CallbackQuery::from_pairs([("error", "user_denied"), ("state", state.as_str())]),
		&mut jar,
	);

	assert!(driver.access_denied(&denied));
	assert!(matches!(driver.user(&denied).await, Err(Error::AccessDenied)));

	let (mut jar, _) = start_login(&driver);
	let forged = driver
		.load_callback(CallbackQuery::from_pairs([("code", "abc"), ("state", "forged")]), &mut jar);

	assert!(driver.state_mismatch(&forged));
	assert!(!driver.access_denied(&forged));
	assert!(matches!(driver.user(&forged).await, Err(Error::StateMismatch)));

	let (mut jar, state) = start_login(&driver);
	let failed = driver.load_callback(
		CallbackQuery::from_pairs([
			("error", "invalid_scope"),
			("error_description", "Invalid scopes: openid nope"),
			("state", state.as_str()),
		]),
		&mut jar,
	);

	assert!(driver.has_error(&failed));
	assert_eq!(driver.get_error(&failed), Some("invalid_scope"));

	match driver.user(&failed).await {
		Err(Error::Provider { code, description }) => {
			assert_eq!(code, "invalid_scope");
			assert_eq!(description.as_deref(), Some("Invalid scopes: openid nope"));
		},
		other => panic!("Expected a provider error, got {other:?}."),
	}

	token_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn rejected_code_is_terminal_and_skips_userinfo() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"Code not valid\"}",
			);
		})
		.await;
	let userinfo_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH);
			then.status(200).header("content-type", "application/json").body("{\"sub\":\"u1\"}");
		})
		.await;
	let (mut jar, state) = start_login(&driver);
	let request = driver.load_callback(
		CallbackQuery::from_pairs([("code", "used"), ("state", state.as_str())]),
		&mut jar,
	);
	let err = driver.user(&request).await.expect_err("Rejected codes must fail the login.");

	token_mock.assert_calls_async(1).await;
	userinfo_mock.assert_calls_async(0).await;

	let Error::TokenExchange(exchange) = err else {
		panic!("Expected a token exchange error, got {err:?}.");
	};

	assert!(matches!(exchange, TokenExchangeError::Rejected { status: 400, .. }));
	assert_eq!(exchange.status(), Some(400));
	assert_eq!(exchange.oauth_error().as_deref(), Some("invalid_grant"));
	assert!(!Error::TokenExchange(exchange).is_retryable());
}

#[tokio::test]
async fn malformed_token_body_is_reported_with_status() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token_type\":\"bearer\"}");
		})
		.await;

	let err = driver.exchange_code("abc").await.expect_err("Bodies without a token must fail.");

	assert!(matches!(
		err,
		Error::TokenExchange(TokenExchangeError::Malformed { status: 200, .. })
	));
}

#[tokio::test]
async fn exchange_surfaces_foreign_token_types_unchanged() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok123\",\"token_type\":\"DPoP\",\"expires_in\":300}");
		})
		.await;

	let token = driver.exchange_code("abc").await.expect("Exchange should succeed.");

	assert_eq!(token.token_type, TokenType::Other("DPoP".into()));
	assert_eq!(token.expires_in, Some(Duration::seconds(300)));
}

#[tokio::test]
async fn user_from_token_skips_classification_and_exchange() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);
	let userinfo_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH).header("authorization", "Bearer held-token");
			then.status(200).header("content-type", "application/json").body(
				"{\"sub\":\"u2\",\"name\":\"Bob Builder\",\"given_name\":\"Bob\",\"family_name\":\"Builder\",\"email_verified\":false}",
			);
		})
		.await;
	let identity =
		driver.user_from_token("held-token").await.expect("Token login should succeed.");

	userinfo_mock.assert_async().await;

	assert_eq!(identity.id, "u2");
	assert_eq!(identity.name.as_deref(), Some("Bob Builder"));
	assert_eq!(identity.first_name.as_deref(), Some("Bob"));
	assert_eq!(identity.last_name.as_deref(), Some("Builder"));
	assert_eq!(identity.email, None);
	assert_eq!(identity.email_verification_state, EmailVerificationState::Unverified);
	assert_eq!(identity.token.token.expose(), "held-token");
	assert!(identity.token.is_bearer());
}

#[tokio::test]
async fn userinfo_failures_are_classified() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);
	let mut expired = server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH).header("authorization", "Bearer expired");
			then.status(401).body("{\"error\":\"invalid_token\"}");
		})
		.await;
	let err = driver.user_from_token("expired").await.expect_err("Expired tokens must fail.");

	assert!(matches!(err, Error::Profile(ProfileError::Rejected { status: 401, .. })));

	expired.delete_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":42,\"email_verified\":\"yes\"}");
		})
		.await;

	let err = driver.user_from_token("tok123").await.expect_err("Schema drift must fail.");

	match err {
		Error::Profile(ProfileError::InvalidSchema { details }) => {
			assert!(details.contains("`sub` must be a string"));
			assert!(details.contains("`email_verified` must be a boolean"));
		},
		other => panic!("Expected a schema error, got {other:?}."),
	}
}

#[tokio::test]
async fn throttled_exchange_carries_retry_after() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(429).header("retry-after", "30").body("slow down");
		})
		.await;

	let err = driver.exchange_code("abc").await.expect_err("Throttled exchanges must fail.");
	let Error::TokenExchange(exchange) = err else {
		panic!("Expected a token exchange error, got {err:?}.");
	};

	assert_eq!(exchange.status(), Some(429));
	assert_eq!(exchange.retry_after(), Some(Duration::seconds(30)));
}

#[tokio::test]
async fn empty_subject_is_a_schema_error() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH);
			then.status(200).header("content-type", "application/json").body("{\"sub\":\"\"}");
		})
		.await;

	let err = driver.user_from_token("tok123").await.expect_err("Empty subjects must fail.");

	assert!(matches!(
		err,
		Error::Profile(ProfileError::InvalidSchema { ref details }) if details.contains("`sub`")
	));
	assert!(!err.is_retryable());
}

#[tokio::test]
async fn unreachable_userinfo_is_retryable() {
	let server = MockServer::start_async().await;
	let config = test_config_builder(&server.base_url())
		.userinfo_url(Url::parse("http://127.0.0.1:9/userinfo").expect("URL should parse."))
		.build()
		.expect("Provider config should build.");
	let driver = build_reqwest_test_driver(config);
	let err = driver.user_from_token("tok123").await.expect_err("Closed ports must fail.");

	assert!(matches!(err, Error::Profile(ProfileError::Transport(_))));
	assert!(err.is_retryable());
}

#[tokio::test]
async fn state_cookie_lives_in_the_callers_jar_only() {
	let server = MockServer::start_async().await;
	let driver = build_driver(&server);
	let first = driver.redirect();
	let second = driver.redirect();

	assert_ne!(first.state, second.state);

	let mut jar = MemoryCookieStore::default();

	jar.set(second.set_cookie.clone());

	let request = driver.load_callback(
		CallbackQuery::from_pairs([("code", "abc"), ("state", first.state.as_str())]),
		&mut jar,
	);

	// One cookie slot: the second redirect replaced the first flow's state.
	assert!(driver.state_mismatch(&request));
}
