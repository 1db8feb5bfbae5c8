//! Demonstrates plugging a non-reqwest HTTP stack into the driver.
//!
//! 1. Implement [`ProviderHttpClient`] so the transport records [`ResponseMetadata`] via the
//!    provided [`ResponseMetadataSlot`].
//! 2. Provide a [`TransportErrorMapper`] that turns the transport's own errors into
//!    [`TransportError`] values labeled by endpoint.
//! 3. Pass both to [`Driver::with_http_client`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use color_eyre::Result;
use time::Duration;
use url::Url;
// self
use keycloak_login::{
	error::TransportError,
	flows::Driver,
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot, TransportErrorMapper},
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	provider::{EndpointAction, ProviderConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ProviderConfig::builder()
		.client_id("web-planer")
		.client_secret("demo-secret")
		.callback_url(Url::parse("https://app.example.com/auth/keycloak/callback")?)
		.provider_base_url("https://idp.example.com/realms/{realm}/protocol/openid-connect/{action}")
		.realm("solvro")
		.build()?;
	let mapper = Arc::new(MockTransportErrorMapper);
	let driver: Driver<MockHttpClient, MockTransportErrorMapper> =
		Driver::with_http_client(config.clone(), MockHttpClient::Canned, Arc::clone(&mapper));
	let token = driver.exchange_code("demo-code").await?;
	let identity = driver.fetch_profile(token).await?;

	println!("Signed in {} ({:?}) through the mock transport.", identity.id, identity.email);

	let offline: Driver<MockHttpClient, MockTransportErrorMapper> =
		Driver::with_http_client(config, MockHttpClient::Offline, mapper);

	match offline.user_from_token("held-token").await {
		Ok(_) => println!("Mock transport unexpectedly produced a profile."),
		Err(e) if e.is_retryable() => println!("Retryable transport failure: {e}"),
		Err(e) => println!("Terminal failure: {e}"),
	}

	Ok(())
}

#[derive(Debug)]
struct OfflineError;
impl Display for OfflineError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("network is unreachable")
	}
}
impl StdError for OfflineError {}

#[derive(Clone, Copy)]
enum MockHttpClient {
	Canned,
	Offline,
}
impl ProviderHttpClient for MockHttpClient {
	type Handle = MockHttpHandle;
	type TransportError = OfflineError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		MockHttpHandle { slot, client: *self }
	}
}

struct MockHttpHandle {
	slot: ResponseMetadataSlot,
	client: MockHttpClient,
}
impl<'a> AsyncHttpClient<'a> for MockHttpHandle {
	type Error = HttpClientError<OfflineError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let client = self.client;

		Box::pin(async move {
			slot.take();

			if let MockHttpClient::Offline = client {
				slot.store(ResponseMetadata { status: None, retry_after: Some(Duration::seconds(5)) });

				return Err(HttpClientError::Reqwest(Box::new(OfflineError)));
			}

			slot.store(ResponseMetadata { status: Some(200), retry_after: None });

			let body: &[u8] = if request.uri().path().ends_with("/token") {
				b"{\"access_token\":\"mock-access\",\"token_type\":\"Bearer\",\"expires_in\":300}"
			} else {
				b"{\"sub\":\"u1\",\"email\":\"a@b.com\",\"email_verified\":true,\"preferred_username\":\"alice\"}"
			};

			Ok(HttpResponse::new(body.to_vec()))
		})
	}
}

struct MockTransportErrorMapper;
impl TransportErrorMapper<OfflineError> for MockTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: EndpointAction,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<OfflineError>,
	) -> TransportError {
		if let Some(retry_after) = metadata.and_then(|meta| meta.retry_after) {
			println!("The {} call suggested retrying after {retry_after}.", endpoint.label());
		}

		match error {
			HttpClientError::Reqwest(inner) => TransportError::network(endpoint.label(), *inner),
			other => TransportError::Other {
				endpoint: endpoint.label(),
				message: other.to_string(),
			},
		}
	}
}
