//! Immutable bearer credential issued by the client-credentials exchange.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Token type assumed when the authorization server omits `token_type`.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Lifecycle status for a credential at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// The issued-at instant is still in the future.
	Pending,
	/// Credential is usable.
	Active,
	/// Credential reached its expiry instant.
	Expired,
}

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// No access token value was provided, or it was blank.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// No expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Expiry does not lie after the issued-at instant.
	#[error("Expiry must be later than the issued-at instant.")]
	NonPositiveLifetime,
	/// Relative expiry overflows the supported date range.
	#[error("Expiry exceeds the supported date range.")]
	ExpiryOutOfRange,
}

/// Bearer credential with an absolute expiry.
///
/// A `Credential` can only be obtained from [`CredentialBuilder::build`], which guarantees a
/// non-blank access token and an expiry strictly after the issued-at instant. Deserialization
/// goes through the same builder, so a persisted credential that violates either rule is
/// rejected on load.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredCredential")]
pub struct Credential {
	access_token: TokenSecret,
	token_type: String,
	issued_at: OffsetDateTime,
	expires_at: OffsetDateTime,
}
impl Credential {
	/// Returns a builder for constructing validated credentials.
	pub fn builder() -> CredentialBuilder {
		CredentialBuilder::default()
	}

	/// Access token secret; callers must avoid logging it.
	pub fn access_token(&self) -> &TokenSecret {
		&self.access_token
	}

	/// Token type reported by the authorization server (usually `Bearer`).
	pub fn token_type(&self) -> &str {
		&self.token_type
	}

	/// Instant the credential was fetched.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	/// Absolute expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Lifetime granted by the authorization server.
	pub fn expires_in(&self) -> Duration {
		self.expires_at - self.issued_at
	}

	/// Time left before expiry, measured from `now`; negative once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		if instant < self.issued_at {
			return CredentialStatus::Pending;
		}
		if instant >= self.expires_at {
			return CredentialStatus::Expired;
		}

		CredentialStatus::Active
	}

	/// Returns `true` if the credential has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expired)
	}

	/// Short, stable digest of the access token for log correlation.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.access_token.expose().as_bytes());

		STANDARD_NO_PAD.encode(&digest[..9])
	}
}
impl TryFrom<StoredCredential> for Credential {
	type Error = CredentialBuilderError;

	fn try_from(stored: StoredCredential) -> Result<Self, Self::Error> {
		Credential::builder()
			.access_token(stored.access_token.expose())
			.token_type(stored.token_type)
			.issued_at(stored.issued_at)
			.expires_at(stored.expires_at)
			.build()
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[derive(Deserialize)]
struct StoredCredential {
	access_token: TokenSecret,
	token_type: String,
	issued_at: OffsetDateTime,
	expires_at: OffsetDateTime,
}

/// Builder for [`Credential`].
#[derive(Clone, Debug, Default)]
pub struct CredentialBuilder {
	access_token: Option<TokenSecret>,
	token_type: Option<String>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the token type; defaults to [`DEFAULT_TOKEN_TYPE`].
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let access_token = self
			.access_token
			.filter(|token| !token.is_blank())
			.ok_or(CredentialBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(CredentialBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(CredentialBuilderError::MissingExpiry),
		};

		if expires_at <= issued_at {
			return Err(CredentialBuilderError::NonPositiveLifetime);
		}

		let token_type = self
			.token_type
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.into());

		Ok(Credential { access_token, token_type, issued_at, expires_at })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn builder_derives_expiry_from_lifetime() {
		let credential = Credential::builder()
			.access_token("secret")
			.token_type("bearer")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Credential builder should support relative expiry calculations.");

		assert_eq!(credential.expires_at(), macros::datetime!(2025-01-01 01:00 UTC));
		assert_eq!(credential.expires_in(), Duration::hours(1));
		assert_eq!(credential.token_type(), "bearer");
	}

	#[test]
	fn builder_rejects_partial_credentials() {
		let blank = Credential::builder().access_token("  ").expires_in(Duration::minutes(1)).build();

		assert_eq!(blank.unwrap_err(), CredentialBuilderError::MissingAccessToken);

		let no_expiry = Credential::builder().access_token("token").build();

		assert_eq!(no_expiry.unwrap_err(), CredentialBuilderError::MissingExpiry);

		let past = Credential::builder()
			.access_token("token")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2024-12-31 23:00 UTC))
			.build();

		assert_eq!(past.unwrap_err(), CredentialBuilderError::NonPositiveLifetime);
	}

	#[test]
	fn status_transitions_cover_all_states() {
		let credential = Credential::builder()
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Credential builder should succeed for status transitions.");

		assert_eq!(
			credential.status_at(macros::datetime!(2024-12-31 23:59 UTC)),
			CredentialStatus::Pending
		);
		assert_eq!(
			credential.status_at(macros::datetime!(2025-01-01 00:30 UTC)),
			CredentialStatus::Active
		);
		assert!(credential.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert_eq!(
			credential.remaining_at(macros::datetime!(2025-01-01 00:59 UTC)),
			Duration::minutes(1)
		);
	}

	#[test]
	fn persisted_credentials_reload_through_the_builder() {
		let credential = Credential::builder()
			.access_token("persisted")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Credential builder should succeed.");
		let stored = serde_json::to_value(&credential).expect("Credential should serialize.");
		let reloaded: Credential =
			serde_json::from_value(stored.clone()).expect("Stored credential should reload.");

		assert_eq!(reloaded, credential);

		let mut inverted = stored.clone();

		inverted["issued_at"] = stored["expires_at"].clone();
		inverted["expires_at"] = stored["issued_at"].clone();

		assert!(serde_json::from_value::<Credential>(inverted).is_err());

		let mut blank = stored;

		blank["access_token"] = serde_json::Value::from(" ");

		assert!(serde_json::from_value::<Credential>(blank).is_err());
	}

	#[test]
	fn debug_and_fingerprint_hide_the_token() {
		let credential = Credential::builder()
			.access_token("very-secret-token")
			.expires_in(Duration::minutes(5))
			.build()
			.expect("Credential builder should succeed.");
		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("very-secret-token"));
		assert_eq!(credential.token_type(), DEFAULT_TOKEN_TYPE);
		assert_eq!(credential.fingerprint().len(), 12);
		assert!(!credential.fingerprint().contains("very-secret-token"));
	}
}
