//! Login flow stages and the [`Driver`] facade that chains them.
//!
//! A login is two requests. [`Driver::redirect`] issues a state token and the authorization
//! URL. On the callback, [`Driver::load_callback`] captures the query and consumes the state
//! cookie once, and [`Driver::user`] classifies the snapshot, exchanges the code, and fetches
//! the profile, stopping at the first failing stage.

pub mod authorize;
pub mod callback;
pub mod state;

mod exchange;
mod profile;

pub use authorize::*;
pub use callback::*;
pub use profile::normalize_profile;
pub use state::*;

// crates.io
use oauth2::{AsyncHttpClient, HttpRequest, HttpResponse};
// self
use crate::{
	_prelude::*,
	auth::CanonicalIdentity,
	error::TransportError,
	ext::{ClaimsValidator, CookieStore, ProfileValidator},
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot, TransportErrorMapper},
	obs::{self, FlowOutcome, FlowSpan, FlowStage},
	provider::{EndpointAction, ProviderConfig},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Driver specialized for the crate's default reqwest transport stack.
pub type ReqwestDriver = Driver<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Authorization Code driver for a single realm client.
///
/// The driver is immutable after construction and holds no per-login state, so one instance
/// can serve concurrent logins. The only cross-request state is the state cookie, which lives
/// in the caller's [`CookieStore`]. Construction never touches cookies.
#[derive(Clone)]
pub struct Driver<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Validated provider configuration.
	pub config: ProviderConfig,
	/// HTTP client used for the token and userinfo calls.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Userinfo schema validator.
	pub validator: Arc<dyn ProfileValidator>,
	state_codec: StateCodec,
}
impl<C, M> Driver<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a driver that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: ProviderConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let state_codec = StateCodec::new(config.state_cookie.clone());

		Self {
			config,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			validator: Arc::new(ClaimsValidator::default()),
			state_codec,
		}
	}

	/// Replaces the userinfo schema validator.
	pub fn with_validator(mut self, validator: impl 'static + ProfileValidator) -> Self {
		self.validator = Arc::new(validator);

		self
	}

	/// State codec bound to the configured cookie.
	pub fn state_codec(&self) -> &StateCodec {
		&self.state_codec
	}

	/// Issues a fresh state token and the authorization URL carrying it.
	///
	/// No network call is made. The caller must attach
	/// [`RedirectInstruction::set_cookie`] to the redirect response.
	pub fn redirect(&self) -> RedirectInstruction {
		const STAGE: FlowStage = FlowStage::Redirect;

		let _guard = FlowSpan::new(STAGE).entered();

		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let (state, set_cookie) = self.state_codec.issue();
		let url = build_authorize_url(&self.config, &state);

		obs::record_flow_outcome(STAGE, FlowOutcome::Success);

		RedirectInstruction { url, state, set_cookie }
	}

	/// Same as [`redirect`](Self::redirect), storing the state cookie in `cookies` directly.
	pub fn redirect_with<S>(&self, cookies: &mut S) -> Url
	where
		S: ?Sized + CookieStore,
	{
		let RedirectInstruction { url, set_cookie, .. } = self.redirect();

		cookies.set(set_cookie);

		url
	}

	/// Captures a callback: stores `query` and consumes (reads, then clears) the state cookie.
	///
	/// Call this once per callback request and pass the snapshot to the query helpers and
	/// [`user`](Self::user). Loading the same callback again after the cookie was cleared
	/// yields a snapshot that classifies as [`CallbackOutcome::StateMismatch`].
	pub fn load_callback<S>(&self, query: CallbackQuery, cookies: &mut S) -> CallbackRequest
	where
		S: ?Sized + CookieStore,
	{
		let state_cookie = self.state_codec.take(cookies);

		CallbackRequest::new(query, state_cookie)
	}

	/// Classifies a callback snapshot.
	pub fn classify(&self, request: &CallbackRequest) -> CallbackOutcome {
		const STAGE: FlowStage = FlowStage::Callback;

		let _guard = FlowSpan::new(STAGE).entered();

		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let outcome = callback::classify(request, &self.config.quirks);

		obs::log_callback_outcome(outcome.as_str());

		match outcome {
			CallbackOutcome::SuccessCandidate { .. } =>
				obs::record_flow_outcome(STAGE, FlowOutcome::Success),
			_ => obs::record_flow_outcome(STAGE, FlowOutcome::Failure),
		}

		outcome
	}

	/// True when the user cancelled the login at the provider.
	pub fn access_denied(&self, request: &CallbackRequest) -> bool {
		request.access_denied(&self.config.quirks)
	}

	/// True when the callback state does not match the captured state cookie.
	pub fn state_mismatch(&self, request: &CallbackRequest) -> bool {
		request.state_mismatch()
	}

	/// True when the callback carries a provider error or lacks a code.
	pub fn has_error(&self, request: &CallbackRequest) -> bool {
		request.error_code().is_some()
	}

	/// Provider error code, [`MISSING_CODE_ERROR`] when the code is absent, or `None`.
	pub fn get_error<'a>(&self, request: &'a CallbackRequest) -> Option<&'a str> {
		request.error_code()
	}

	/// Runs the whole callback pipeline: classification, code exchange, and profile fetch.
	///
	/// Returns at the first failing stage without issuing later network calls; a denied,
	/// mismatched, or erroneous callback performs no I/O at all.
	pub async fn user(&self, request: &CallbackRequest) -> Result<CanonicalIdentity> {
		let code = self.classify(request).into_code()?;
		let token = self.exchange_code(&code).await?;

		self.fetch_profile(token).await
	}

	/// Fetches the profile for a token the caller already holds, skipping classification and
	/// exchange.
	pub async fn user_from_token(&self, token: &str) -> Result<CanonicalIdentity> {
		self.fetch_profile_from_raw_token(token).await
	}

	/// Sends `request` and returns the response with whatever metadata the transport captured.
	async fn dispatch(
		&self,
		endpoint: EndpointAction,
		request: HttpRequest,
	) -> Result<(HttpResponse, Option<ResponseMetadata>), TransportError> {
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());

		match handle.call(request).await {
			Ok(response) => Ok((response, slot.take())),
			Err(e) => Err(self.transport_mapper.map_transport_error(
				endpoint,
				slot.take().as_ref(),
				e,
			)),
		}
	}
}
#[cfg(feature = "reqwest")]
impl Driver<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a driver backed by a reqwest client that never follows redirects.
	///
	/// The driver attaches no request timeout; wrap [`user`](Self::user) in one (for example
	/// `tokio::time::timeout`) or pass a configured client to
	/// [`with_http_client`](Self::with_http_client).
	///
	/// Fails only when the reqwest client cannot be built (TLS backend initialization).
	pub fn new(config: ProviderConfig) -> Result<Self, crate::error::ConfigError> {
		Ok(Self::with_http_client(
			config,
			ReqwestHttpClient::try_new()?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for Driver<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Driver")
			.field("client_id", &self.config.client_id)
			.field("realm", &self.config.realm)
			.field("endpoints", &self.config.endpoints)
			.field("state_cookie", &self.config.state_cookie.name)
			.finish()
	}
}
