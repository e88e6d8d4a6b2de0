//! Transport primitives for the client-credentials exchange.
//!
//! [`TokenHttpClient`] is the crate's only dependency on an HTTP stack. It speaks the
//! `oauth2` crate's [`HttpRequest`]/[`HttpResponse`] vocabulary so alternative transports can
//! be plugged in without touching the fetcher, and a [`TransportErrorMapper`] turns the
//! transport's own failures into [`FetchError`] values.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{HttpClientError, HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy as RedirectPolicy;
// self
use crate::{_prelude::*, error::FetchError};
#[cfg(feature = "reqwest")]
use crate::error::{ConfigError, TransportError};

/// Boxed future returned by [`TokenHttpClient::execute`].
pub type HttpFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError<E>>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing the token exchange.
///
/// Implementations must return the full response (status, headers, body) for every status
/// code; classifying non-200 answers is the fetcher's job. The returned future must own or
/// borrow only `self`, so the fetcher can bound it with a timeout and drop it on cancellation.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and collects the response body.
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError>;
}

/// Maps HTTP transport failures into [`FetchError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a fetch error.
	fn map_transport_error(&self, error: HttpClientError<E>) -> FetchError;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints answer directly, so the default client does not follow redirects; configure
/// any custom [`ReqwestClient`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with redirects disabled and `timeout` applied to every request.
	pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(RedirectPolicy::none())
			.timeout(timeout.unsigned_abs())
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		Box::pin(async move {
			let response =
				self.0.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> FetchError {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_timeout() =>
				TransportError::Timeout.into(),
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Http(inner) => FetchError::Request(inner),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) =>
				TransportError::network(OtherTransportError(message)).into(),
			other => TransportError::network(OtherTransportError(format!("{other:?}"))).into(),
		}
	}
}

#[cfg(feature = "reqwest")]
#[derive(Debug, ThisError)]
#[error("HTTP client error: {0}.")]
struct OtherTransportError(String);

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::TransportError;

	#[derive(Debug, ThisError)]
	#[error("fake transport failure")]
	struct FakeError;

	struct RecordingMapper;
	impl TransportErrorMapper<FakeError> for RecordingMapper {
		fn map_transport_error(&self, error: HttpClientError<FakeError>) -> FetchError {
			match error {
				HttpClientError::Io(inner) => TransportError::Io(inner).into(),
				_ => TransportError::network(FakeError).into(),
			}
		}
	}

	#[test]
	fn custom_mappers_classify_transport_failures() {
		let mapper = RecordingMapper;
		let io = mapper.map_transport_error(HttpClientError::Io(std::io::Error::other("reset")));

		assert!(matches!(io, FetchError::Network(TransportError::Io(_))));

		let other = mapper.map_transport_error(HttpClientError::Other("boom".into()));

		assert!(matches!(other, FetchError::Network(TransportError::Network { .. })));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_mapper_keeps_generic_messages() {
		let err = ReqwestTransportErrorMapper
			.map_transport_error(HttpClientError::Other("socket closed".into()));
		let FetchError::Network(TransportError::Network { source }) = err else {
			panic!("Generic transport errors should map to network failures.");
		};

		assert!(source.to_string().contains("socket closed"));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn builds_default_reqwest_client() {
		assert!(ReqwestHttpClient::new(Duration::seconds(5)).is_ok());
	}
}
