//! Startup configuration: client credentials, authorization endpoint, and refresh policy.
//!
//! Everything here is validated once, at construction. A [`ConfigError`] is the only fatal
//! error in the crate; nothing is re-checked per refresh cycle.

// std
use std::{net::IpAddr, path::Path};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Environment variable holding the OAuth client identifier.
pub const ENV_CLIENT_ID: &str = "CLIENT_ID";
/// Environment variable holding the OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "CLIENT_SECRET";
/// Environment variable holding the authorization (token) endpoint.
pub const ENV_AUTH_URL: &str = "URL_AUTH";

/// Client identity plus the endpoint it authenticates against.
#[derive(Clone)]
pub struct ClientConfig {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: TokenSecret,
	/// Authorization server token endpoint.
	pub auth_url: Url,
}
impl ClientConfig {
	/// Validates and assembles a client configuration.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		auth_url: &str,
	) -> Result<Self, ConfigError> {
		let client_id = non_empty(ENV_CLIENT_ID, client_id.into())?;
		let client_secret = TokenSecret::new(non_empty(ENV_CLIENT_SECRET, client_secret.into())?);
		let auth_url = parse_auth_url(auth_url)?;

		Ok(Self { client_id, client_secret, auth_url })
	}

	/// Reads `CLIENT_ID`, `CLIENT_SECRET`, and `URL_AUTH` from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads a dotenv file (e.g. `tidal.env`) into the process environment, then behaves like
	/// [`from_env`](Self::from_env). Variables already set in the environment win.
	pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile { source })?;

		Self::from_env()
	}

	/// Builds the configuration from an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar { name });
		let client_id = required(ENV_CLIENT_ID)?;
		let client_secret = required(ENV_CLIENT_SECRET)?;
		let auth_url = required(ENV_AUTH_URL)?;

		Self::new(client_id, client_secret, &auth_url)
	}
}
impl Debug for ClientConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfig")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("auth_url", &self.auth_url.as_str())
			.finish()
	}
}

/// Timing knobs for the refresh scheduler and the fetcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
	/// How long before expiry a new credential is fetched.
	pub refresh_margin: Duration,
	/// Floor applied when the margin swallows the whole token lifetime.
	pub min_refresh_delay: Duration,
	/// First retry delay after a failed fetch.
	pub initial_backoff: Duration,
	/// Upper bound for the retry delay.
	pub max_backoff: Duration,
	/// Bound on a single exchange with the authorization server.
	pub request_timeout: Duration,
}
impl RefreshPolicy {
	const DEFAULT_INITIAL_BACKOFF: Duration = Duration::seconds(1);
	const DEFAULT_MAX_BACKOFF: Duration = Duration::seconds(60);
	const DEFAULT_MIN_REFRESH_DELAY: Duration = Duration::seconds(1);
	const DEFAULT_REFRESH_MARGIN: Duration = Duration::seconds(60);
	const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(10);

	/// Overrides the refresh margin (defaults to 60 seconds).
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = clamp_non_negative(margin);

		self
	}

	/// Overrides the minimum refresh delay (defaults to 1 second).
	pub fn with_min_refresh_delay(mut self, delay: Duration) -> Self {
		self.min_refresh_delay = clamp_non_negative(delay);

		self
	}

	/// Overrides the backoff bounds (default 1 second doubling up to 60 seconds).
	pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
		self.initial_backoff = clamp_non_negative(initial);
		self.max_backoff = clamp_non_negative(max);

		self
	}

	/// Overrides the request timeout (defaults to 10 seconds).
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = clamp_non_negative(timeout);

		self
	}

	/// Checks that the policy can drive a scheduler without spinning.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.initial_backoff.is_positive() {
			return Err(ConfigError::InvalidPolicy { reason: "initial backoff must be positive" });
		}
		if self.max_backoff < self.initial_backoff {
			return Err(ConfigError::InvalidPolicy {
				reason: "max backoff must not be shorter than the initial backoff",
			});
		}
		if !self.request_timeout.is_positive() {
			return Err(ConfigError::InvalidPolicy { reason: "request timeout must be positive" });
		}
		if !self.min_refresh_delay.is_positive() {
			return Err(ConfigError::InvalidPolicy {
				reason: "minimum refresh delay must be positive",
			});
		}

		Ok(())
	}
}
impl Default for RefreshPolicy {
	fn default() -> Self {
		Self {
			refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
			min_refresh_delay: Self::DEFAULT_MIN_REFRESH_DELAY,
			initial_backoff: Self::DEFAULT_INITIAL_BACKOFF,
			max_backoff: Self::DEFAULT_MAX_BACKOFF,
			request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
		}
	}
}

fn clamp_non_negative(value: Duration) -> Duration {
	if value.is_negative() { Duration::ZERO } else { value }
}

fn non_empty(name: &'static str, value: String) -> Result<String, ConfigError> {
	if value.trim().is_empty() { Err(ConfigError::EmptyValue { name }) } else { Ok(value) }
}

fn parse_auth_url(raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidAuthUrl { source })?;

	match url.scheme() {
		"https" => Ok(url),
		"http" if is_loopback(&url) => Ok(url),
		_ => Err(ConfigError::InsecureAuthUrl { url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.map(|ip| ip.is_loopback())
			.unwrap_or(false),
		None => false,
	}
}
