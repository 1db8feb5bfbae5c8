//! Transport primitives for the token and userinfo calls.
//!
//! The module exposes [`ProviderHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so downstream crates can integrate custom HTTP clients
//! without losing the driver's instrumentation hooks. Implementations call
//! [`ResponseMetadataSlot::take`] before dispatching a request and
//! [`ResponseMetadataSlot::store`] once an HTTP status or retry hint is known, and a
//! [`TransportErrorMapper`] turns transport failures into [`TransportError`] values.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError, provider::EndpointAction};

/// Abstraction over HTTP transports capable of calling the provider's token and userinfo
/// endpoints while publishing response metadata.
///
/// The trait is the driver's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so one client can serve concurrent login attempts, and the
/// handles they return must own whatever state is required so their request futures remain
/// `Send` for the lifetime of the in-flight call. Redirects must not be followed.
pub trait ProviderHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request so stale
	///   information never leaks across retries.
	/// - Once an HTTP response provides status headers, save them with
	///   [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Maps HTTP transport failures into [`TransportError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted while calling `endpoint`.
	fn map_transport_error(
		&self,
		endpoint: EndpointAction,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> TransportError;
}

/// Captures metadata from the most recent HTTP response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
///
/// The driver creates a fresh slot for each outbound call and reads the captured metadata
/// as soon as the call resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Reqwest-backed [`ProviderHttpClient`].
///
/// [`ReqwestHttpClient::try_new`] disables redirect following. Configure a custom
/// [`ReqwestClient`] the same way before handing it to [`ReqwestHttpClient::with_client`],
/// and attach a request timeout there since the driver does not impose one.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps a preconfigured reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that never follows redirects.
	pub fn try_new() -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl ProviderHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ReqwestHandle { client: self.0.clone(), slot }
	}
}

/// Per-call handle returned by [`ReqwestHttpClient`]; records status and `Retry-After`.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl ReqwestHandle {
	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError<ReqwestError>> {
		self.slot.take();

		let request = reqwest::Request::try_from(request).map_err(Box::new)?;
		let response = self.client.execute(request).await.map_err(Box::new)?;
		let status = response.status();
		let headers = response.headers().clone();

		self.slot.store(ResponseMetadata {
			status: Some(status.as_u16()),
			retry_after: retry_after(&headers),
		});

		let body = response.bytes().await.map_err(Box::new)?;
		let mut converted = HttpResponse::new(body.to_vec());

		*converted.status_mut() = status;
		*converted.headers_mut() = headers;

		Ok(converted)
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(self.send(request))
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: EndpointAction,
		_metadata: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> TransportError {
		let label = endpoint.label();

		match err {
			HttpClientError::Reqwest(inner) if inner.is_timeout() =>
				TransportError::Timeout { endpoint: label },
			HttpClientError::Reqwest(inner) => TransportError::network(label, *inner),
			HttpClientError::Http(inner) => TransportError::network(label, inner),
			HttpClientError::Io(inner) => TransportError::Io(inner),
			HttpClientError::Other(message) => TransportError::Other { endpoint: label, message },
			_ => TransportError::Other {
				endpoint: label,
				message: "unknown transport failure".into(),
			},
		}
	}
}

/// Reads `Retry-After` as delta-seconds or an HTTP date; past dates yield `None`.
#[cfg(feature = "reqwest")]
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	match raw.parse::<i64>() {
		Ok(secs) if secs >= 0 => Some(Duration::seconds(secs)),
		Ok(_) => None,
		Err(_) => OffsetDateTime::parse(raw, &Rfc2822)
			.ok()
			.map(|at| at - OffsetDateTime::now_utc())
			.filter(|delta| delta.is_positive()),
	}
}
