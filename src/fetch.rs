//! Client Credentials exchange: one POST to the authorization server, one validated
//! [`Credential`] (or one [`FetchError`]) back.
//!
//! The fetcher never retries. Retry policy belongs to the refresh scheduler, which drives any
//! [`CredentialSource`]; [`CredentialFetcher`] is the HTTP-backed implementation.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		HeaderMap, Method, Request, StatusCode,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
	},
};
use time::format_description::well_known::Rfc2822;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialBuilderError},
	clock::{Clock, SystemClock},
	config::ClientConfig,
	error::{FetchError, TransportError},
	http::{TokenHttpClient, TransportErrorMapper},
	obs::{self, FetchOutcome, Stage, StageSpan},
};
#[cfg(feature = "reqwest")]
use crate::{
	config::RefreshPolicy,
	error::ConfigError,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";
const BODY_PREVIEW_LIMIT: usize = 512;

/// Boxed future returned by [`CredentialSource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Credential, FetchError>> + 'a + Send>>;

/// Anything able to produce a fresh [`Credential`] on demand.
pub trait CredentialSource
where
	Self: 'static + Send + Sync,
{
	/// Performs one acquisition attempt.
	fn fetch(&self) -> FetchFuture<'_>;
}

#[cfg(feature = "reqwest")]
/// Fetcher specialized for the crate's default reqwest transport stack.
pub type ReqwestFetcher = CredentialFetcher<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Performs the OAuth 2.0 `client_credentials` grant against a single authorization server.
///
/// The client id and secret travel as HTTP Basic auth, the body is
/// `grant_type=client_credentials`, and each call is bounded by the request timeout.
#[derive(Clone)]
pub struct CredentialFetcher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors.
	pub transport_mapper: Arc<M>,
	client: ClientConfig,
	request_timeout: Duration,
	clock: Arc<dyn Clock>,
}
impl<C, M> CredentialFetcher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(10);

	/// Creates a fetcher that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		client: ClientConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			client,
			request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
			clock: Arc::new(SystemClock),
		}
	}

	/// Overrides the bound on a single exchange (defaults to 10 seconds).
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = if timeout.is_positive() { timeout } else { Duration::ZERO };

		self
	}

	/// Overrides the clock used to stamp fetch instants.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Client configuration this fetcher authenticates with.
	pub fn client(&self) -> &ClientConfig {
		&self.client
	}

	/// Performs one `client_credentials` exchange.
	///
	/// `expires_at` of the returned credential is the instant taken just before the request is
	/// sent plus the granted `expires_in`.
	pub async fn fetch_credential(&self) -> Result<Credential, FetchError> {
		let span = StageSpan::new(Stage::Fetch);

		obs::record_fetch_outcome(FetchOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = self.build_request()?;
				let fetched_at = self.clock.now();
				let response = tokio::time::timeout(
					self.request_timeout.unsigned_abs(),
					self.http_client.execute(request),
				)
				.await
				.map_err(|_| TransportError::Timeout)?
				.map_err(|err| self.transport_mapper.map_transport_error(err))?;

				map_token_response(response, fetched_at, self.clock.now())
			})
			.await;

		match &result {
			Ok(_) => obs::record_fetch_outcome(FetchOutcome::Success),
			Err(_) => obs::record_fetch_outcome(FetchOutcome::Failure),
		}

		result
	}

	fn build_request(&self) -> Result<HttpRequest, FetchError> {
		let credentials =
			format!("{}:{}", self.client.client_id, self.client.client_secret.expose());
		let body = form_urlencoded::Serializer::new(String::new())
			.append_pair("grant_type", "client_credentials")
			.finish();
		let request = Request::builder()
			.method(Method::POST)
			.uri(self.client.auth_url.as_str())
			.header(AUTHORIZATION, format!("Basic {}", STANDARD.encode(credentials)))
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.header(ACCEPT, JSON_CONTENT_TYPE)
			.body(body.into_bytes())?;

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl CredentialFetcher<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a fetcher with its own reqwest transport, bounded by `policy.request_timeout`.
	pub fn new(client: ClientConfig, policy: &RefreshPolicy) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::new(policy.request_timeout)?;

		Ok(Self::with_http_client(client, http_client, ReqwestTransportErrorMapper)
			.with_request_timeout(policy.request_timeout))
	}
}
impl<C, M> CredentialSource for CredentialFetcher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fetch(&self) -> FetchFuture<'_> {
		Box::pin(self.fetch_credential())
	}
}
impl<C, M> Debug for CredentialFetcher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialFetcher")
			.field("client", &self.client)
			.field("request_timeout", &self.request_timeout)
			.field("clock", &self.clock)
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	token_type: Option<String>,
	expires_in: i64,
}

/// Maps a raw token endpoint response into a [`Credential`].
///
/// `fetched_at` anchors the expiry; `now` is only used to resolve an absolute `Retry-After`.
pub fn map_token_response(
	response: HttpResponse,
	fetched_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<Credential, FetchError> {
	let status = response.status();

	if status != StatusCode::OK {
		return Err(FetchError::AuthRejected {
			status: status.as_u16(),
			body: body_preview(response.body()),
			retry_after: parse_retry_after(response.headers(), now),
		});
	}

	let mut deserializer = serde_json::Deserializer::from_slice(response.body());
	let decoded: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| FetchError::MalformedResponse { source, status: status.as_u16() })?;

	if decoded.access_token.trim().is_empty() {
		return Err(FetchError::EmptyToken);
	}
	if decoded.expires_in <= 0 {
		return Err(FetchError::InvalidExpiry { expires_in: decoded.expires_in });
	}

	let mut builder = Credential::builder()
		.access_token(decoded.access_token)
		.issued_at(fetched_at)
		.expires_in(Duration::seconds(decoded.expires_in));

	if let Some(token_type) = decoded.token_type {
		builder = builder.token_type(token_type);
	}

	builder.build().map_err(|err| match err {
		CredentialBuilderError::MissingAccessToken => FetchError::EmptyToken,
		_ => FetchError::InvalidExpiry { expires_in: decoded.expires_in },
	})
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.len() <= BODY_PREVIEW_LIMIT {
		return text.to_owned();
	}

	let mut end = BODY_PREVIEW_LIMIT;

	while !text.is_char_boundary(end) {
		end -= 1;
	}

	format!("{}...", &text[..end])
}

fn parse_retry_after(headers: &HeaderMap, now: OffsetDateTime) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - now;

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
