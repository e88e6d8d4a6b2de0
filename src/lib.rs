//! Self-refreshing OAuth 2.0 client-credentials bearer tokens.
//!
//! A background task keeps one credential renewed ahead of its expiry and backs off while the
//! provider fails.
//!
//! The crate is built from three pieces:
//!
//! - [`fetch::CredentialFetcher`] performs the `client_credentials` exchange and maps the
//!   response into a validated [`auth::Credential`].
//! - [`cache::CredentialCache`] is the single, thread-safe slot holding the current credential.
//! - [`refresh::RefreshScheduler`] runs in the background, renews the credential before it
//!   expires, retries with bounded backoff, and stops on cancellation.
//!
//! Downstream callers only ever see a [`refresh::TokenHandle`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod obs;
pub mod refresh;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		auth::Credential,
		clock::{Clock, MonotonicClock},
		error::FetchError,
		fetch::{CredentialSource, FetchFuture},
	};

	/// Builds a credential issued at `clock.now()` that lives for `expires_in`.
	pub fn credential_at(clock: &dyn Clock, token: &str, expires_in: Duration) -> Credential {
		Credential::builder()
			.access_token(token)
			.issued_at(clock.now())
			.expires_in(expires_in)
			.build()
			.expect("Test credential should be valid.")
	}

	/// One scripted response for [`ScriptedSource`].
	#[derive(Debug)]
	pub enum Scripted {
		/// Issue a credential with the provided token and lifetime.
		Issue(&'static str, Duration),
		/// Fail with the provided error.
		Fail(FetchError),
	}

	/// Deterministic [`CredentialSource`] that replays a script and records the instant of
	/// every call.
	///
	/// Once the script is exhausted every further call fails with [`FetchError::EmptyToken`].
	#[derive(Debug)]
	pub struct ScriptedSource {
		clock: MonotonicClock,
		script: Mutex<VecDeque<Scripted>>,
		calls: Mutex<Vec<OffsetDateTime>>,
	}
	impl ScriptedSource {
		/// Creates a source that shares `clock` with the scheduler under test.
		pub fn new<I>(clock: MonotonicClock, script: I) -> Self
		where
			I: IntoIterator<Item = Scripted>,
		{
			Self {
				clock,
				script: Mutex::new(script.into_iter().collect()),
				calls: Default::default(),
			}
		}

		/// Instants at which `fetch` was invoked.
		pub fn calls(&self) -> Vec<OffsetDateTime> {
			self.calls.lock().clone()
		}

		/// Number of times `fetch` was invoked.
		pub fn call_count(&self) -> usize {
			self.calls.lock().len()
		}
	}
	impl CredentialSource for ScriptedSource {
		fn fetch(&self) -> FetchFuture<'_> {
			let now = self.clock.now();

			self.calls.lock().push(now);

			let next = self.script.lock().pop_front();

			Box::pin(async move {
				match next {
					Some(Scripted::Issue(token, expires_in)) =>
						Ok(credential_at(&self.clock, token, expires_in)),
					Some(Scripted::Fail(err)) => Err(err),
					None => Err(FetchError::EmptyToken),
				}
			})
		}
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	#[cfg(any(test, feature = "test"))] pub use parking_lot::Mutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::Result;
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
