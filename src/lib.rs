//! Keycloak-realm OAuth 2.0 login driver: CSRF-bound redirects, typed callback outcomes,
//! server-side code exchange, and normalized OpenID Connect profiles.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod ext;
pub mod flows;
pub mod http;
pub mod obs;
pub mod provider;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		flows::Driver,
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
		provider::{ProviderConfig, ProviderConfigBuilder},
	};

	/// Driver type alias used by reqwest-backed integration tests.
	pub type ReqwestTestDriver = Driver<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Client identifier shared by integration test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-it";
	/// Client secret shared by integration test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-it";
	/// Callback URL shared by integration test fixtures.
	pub const TEST_CALLBACK_URL: &str = "https://app.example.com/auth/callback";

	/// Returns a config builder whose realm template points at `base` (typically an `httpmock`
	/// server URL such as `http://127.0.0.1:4000`).
	pub fn test_config_builder(base: &str) -> ProviderConfigBuilder {
		ProviderConfig::builder()
			.client_id(TEST_CLIENT_ID)
			.client_secret(TEST_CLIENT_SECRET)
			.callback_url(
				Url::parse(TEST_CALLBACK_URL).expect("Test callback URL should parse successfully."),
			)
			.provider_base_url(format!("{base}/realms/{{realm}}/protocol/openid-connect/{{action}}"))
			.realm("acme")
	}

	/// Builds a non-redirecting reqwest client that accepts the self-signed certificates
	/// produced by `httpmock`.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a reqwest-backed [`Driver`] for the provided config.
	pub fn build_reqwest_test_driver(config: ProviderConfig) -> ReqwestTestDriver {
		Driver::with_http_client(
			config,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map as JsonMap, Value as JsonValue};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
