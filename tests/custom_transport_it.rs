#![cfg(feature = "reqwest")]

// self
use keycloak_login::{
	_preludet::*,
	error::{ProfileError, TokenExchangeError, TransportError},
	flows::Driver,
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot, TransportErrorMapper},
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	provider::EndpointAction,
};

#[derive(Debug)]
enum FakeTransportError {
	Unavailable,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Unavailable => write!(f, "Transport unavailable."),
		}
	}
}
impl StdError for FakeTransportError {}

#[derive(Clone, Copy)]
struct FakeHttpClient {
	retry_after: Duration,
}
impl ProviderHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { slot, retry_after: self.retry_after }
	}
}

struct FakeHttpHandle {
	slot: ResponseMetadataSlot,
	retry_after: Duration,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, _request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let retry_after = self.retry_after;

		Box::pin(async move {
			assert!(
				slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);
			slot.store(ResponseMetadata { status: Some(503), retry_after: Some(retry_after) });

			Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Unavailable)))
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	calls: Arc<Mutex<Vec<(EndpointAction, Option<ResponseMetadata>)>>>,
}
impl RecordingTransportErrorMapper {
	fn recorded(&self) -> Vec<(EndpointAction, Option<ResponseMetadata>)> {
		self.calls.lock().clone()
	}
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: EndpointAction,
		metadata: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> TransportError {
		self.calls.lock().push((endpoint, metadata.cloned()));

		match err {
			HttpClientError::Reqwest(inner) => TransportError::network(endpoint.label(), *inner),
			other => TransportError::Other {
				endpoint: endpoint.label(),
				message: format!("Unhandled HTTP client error: {other:?}"),
			},
		}
	}
}

fn build_driver(
	mapper: RecordingTransportErrorMapper,
) -> Driver<FakeHttpClient, RecordingTransportErrorMapper> {
	let config = test_config_builder("https://idp.example").build().expect("Config should build.");

	Driver::with_http_client(
		config,
		FakeHttpClient { retry_after: Duration::seconds(30) },
		mapper,
	)
}

#[tokio::test]
async fn transport_failures_are_mapped_per_endpoint() {
	let mapper = RecordingTransportErrorMapper::default();
	let driver = build_driver(mapper.clone());
	let err = driver.exchange_code("abc").await.expect_err("Fake transport always fails.");

	assert!(matches!(
		err,
		Error::TokenExchange(TokenExchangeError::Transport(TransportError::Network {
			endpoint: "token",
			..
		}))
	));
	assert!(!err.is_retryable());

	let err = driver.user_from_token("tok123").await.expect_err("Fake transport always fails.");

	assert!(matches!(
		err,
		Error::Profile(ProfileError::Transport(TransportError::Network {
			endpoint: "userinfo",
			..
		}))
	));
	assert!(err.is_retryable());

	let recorded = mapper.recorded();

	assert_eq!(recorded.len(), 2);
	assert_eq!(recorded[0].0, EndpointAction::Token);
	assert_eq!(recorded[1].0, EndpointAction::UserInfo);
	assert!(recorded.iter().all(|(_, meta)| {
		meta.as_ref().and_then(|meta| meta.retry_after) == Some(Duration::seconds(30))
	}));
}
