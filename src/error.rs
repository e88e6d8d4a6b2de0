//! Error types shared across the fetcher, cache, scheduler, and configuration layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Startup configuration problem; fatal.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential exchange failed; the scheduler retries these.
	#[error(transparent)]
	Fetch(#[from] FetchError),
	/// No usable credential is cached.
	#[error(transparent)]
	Credential(#[from] CredentialError),
}

/// Configuration and validation failures raised once at construction.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Required environment variable is not set.
	#[error("Environment variable `{name}` is not set.")]
	MissingVar {
		/// Variable name.
		name: &'static str,
	},
	/// Required setting is present but blank.
	#[error("Setting `{name}` must not be empty.")]
	EmptyValue {
		/// Setting name.
		name: &'static str,
	},
	/// Dotenv file could not be loaded.
	#[error("Environment file could not be loaded.")]
	EnvFile {
		/// Underlying dotenv failure.
		#[source]
		source: dotenvy::Error,
	},
	/// Authorization URL cannot be parsed.
	#[error("Authorization URL is invalid.")]
	InvalidAuthUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Authorization URL must use HTTPS unless it points at a loopback host.
	#[error("The authorization URL must use HTTPS: {url}.")]
	InsecureAuthUrl {
		/// Offending URL.
		url: String,
	},
	/// Refresh policy values are inconsistent.
	#[error("Refresh policy is invalid: {reason}.")]
	InvalidPolicy {
		/// Which constraint failed.
		reason: &'static str,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures of a single credential exchange.
#[derive(Debug, ThisError)]
pub enum FetchError {
	/// Transport failure or timeout before a response arrived.
	#[error(transparent)]
	Network(#[from] TransportError),
	/// Authorization server answered with a non-200 status.
	#[error("Authorization server rejected the request with status {status}: {body}")]
	AuthRejected {
		/// HTTP status code.
		status: u16,
		/// Truncated response body for diagnostics.
		body: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Response body could not be decoded as a token response.
	#[error("Authorization server returned a malformed token response.")]
	MalformedResponse {
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Response decoded but carried a blank access token.
	#[error("Authorization server returned an empty access token.")]
	EmptyToken,
	/// Response carried a lifetime that cannot produce a future expiry.
	#[error("Authorization server returned a non-positive expires_in ({expires_in}).")]
	InvalidExpiry {
		/// Raw `expires_in` value.
		expires_in: i64,
	},
	/// Token request could not be assembled.
	#[error("Token request could not be built.")]
	Request(#[from] oauth2::http::Error),
}
impl FetchError {
	/// Returns `true` when the exchange hit the request timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Network(TransportError::Timeout))
	}

	/// HTTP status code of the failed response, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::AuthRejected { status, .. } | Self::MalformedResponse { status, .. } =>
				Some(*status),
			_ => None,
		}
	}

	/// Retry-After hint supplied by the authorization server.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::AuthRejected { retry_after, .. } => *retry_after,
			_ => None,
		}
	}

	/// Stable label suitable for span or metric fields.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Network(_) => "network",
			Self::AuthRejected { .. } => "auth_rejected",
			Self::MalformedResponse { .. } => "malformed_response",
			Self::EmptyToken => "empty_token",
			Self::InvalidExpiry { .. } => "invalid_expiry",
			Self::Request(_) => "request",
		}
	}
}

/// Transport-level failures (network, timeout, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the authorization server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete within the configured timeout.
	#[error("Request to the authorization server timed out.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the authorization server.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Reasons a caller cannot be handed a token.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialError {
	/// No fetch has succeeded yet.
	#[error("No credential has been fetched yet.")]
	Absent,
	/// Cached credential passed its expiry and no refresh has succeeded since.
	#[error("Cached credential expired at {expired_at} and has not been renewed.")]
	Stale {
		/// Expiry instant of the stale credential.
		expired_at: OffsetDateTime,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn fetch_error_accessors_expose_diagnostics() {
		let rejected = FetchError::AuthRejected {
			status: 429,
			body: "slow down".into(),
			retry_after: Some(Duration::seconds(5)),
		};

		assert_eq!(rejected.status(), Some(429));
		assert_eq!(rejected.retry_after(), Some(Duration::seconds(5)));
		assert_eq!(rejected.kind(), "auth_rejected");
		assert!(!rejected.is_timeout());
		assert!(rejected.to_string().contains("slow down"));

		let timeout = FetchError::from(TransportError::Timeout);

		assert!(timeout.is_timeout());
		assert_eq!(timeout.status(), None);
		assert_eq!(timeout.kind(), "network");
	}

	#[test]
	fn crate_error_keeps_source_chain() {
		let io = std::io::Error::other("connection reset");
		let err: Error = FetchError::from(TransportError::from(io)).into();

		assert!(matches!(err, Error::Fetch(FetchError::Network(TransportError::Io(_)))));

		let source = StdError::source(&err)
			.expect("Transparent fetch errors should expose the IO error as their source.");

		assert_eq!(source.to_string(), "connection reset");
	}
}
