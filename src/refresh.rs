//! Background renewal of the cached credential.
//!
//! [`RefreshScheduler`] owns the only write path into a [`CredentialCache`]. After every
//! successful fetch it sleeps until `expires_at - refresh_margin`, fetches again, and repeats
//! for as long as the process lives. Failed fetches never end the loop: the existing credential
//! stays in place, the retry is delayed by a bounded [`Backoff`], and once the credential
//! passes its expiry the cache is flagged stale so [`TokenHandle`] callers get
//! [`CredentialError::Stale`] instead of an expired token. A [`CancellationToken`] interrupts
//! the loop at any point.

pub mod backoff;

mod metrics;

pub use backoff::*;
pub use metrics::*;

// crates.io
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	cache::CredentialCache,
	clock::{Clock, SystemClock},
	config::RefreshPolicy,
	error::{ConfigError, CredentialError, FetchError},
	fetch::CredentialSource,
	obs::{self, Stage, StageSpan},
};
#[cfg(feature = "reqwest")]
use crate::{config::ClientConfig, fetch::ReqwestFetcher};

/// Lifecycle of the refresh loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchedulerState {
	/// No fetch has succeeded yet.
	Uninitialized,
	/// The cached credential was installed by the latest fetch.
	Active,
	/// The latest fetch failed; the previous credential is kept while retries continue.
	Degraded,
	/// Cancelled; no further fetches happen.
	Stopped,
}
impl SchedulerState {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SchedulerState::Uninitialized => "uninitialized",
			SchedulerState::Active => "active",
			SchedulerState::Degraded => "degraded",
			SchedulerState::Stopped => "stopped",
		}
	}
}
impl Display for SchedulerState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Delay between installing a credential with `expires_in` left and renewing it.
///
/// Equals `expires_in - margin`, clamped at zero.
pub fn refresh_delay(expires_in: Duration, margin: Duration) -> Duration {
	let delay = expires_in - margin;

	if delay.is_negative() { Duration::ZERO } else { delay }
}

/// Read-only view of the cached credential handed to downstream callers.
#[derive(Clone, Debug)]
pub struct TokenHandle {
	cache: CredentialCache,
	clock: Arc<dyn Clock>,
}
impl TokenHandle {
	/// Creates a view over `cache` that evaluates expiry with `clock`.
	pub fn new(cache: CredentialCache, clock: Arc<dyn Clock>) -> Self {
		Self { cache, clock }
	}

	/// Returns the current credential if it is present and not stale.
	pub fn current_credential(&self) -> Result<Arc<Credential>, CredentialError> {
		let (credential, stale) = self.cache.snapshot();
		let credential = credential.ok_or(CredentialError::Absent)?;

		if stale || credential.is_expired_at(self.clock.now()) {
			return Err(CredentialError::Stale { expired_at: credential.expires_at() });
		}

		Ok(credential)
	}

	/// Returns the current access token if it is present and not stale.
	pub fn current_token(&self) -> Result<TokenSecret, CredentialError> {
		Ok(self.current_credential()?.access_token().clone())
	}

	/// Returns `Bearer <token>` for an `Authorization` header.
	pub fn authorization_header(&self) -> Result<String, CredentialError> {
		Ok(format!("Bearer {}", self.current_token()?.expose()))
	}
}

/// Long-lived task that keeps a [`CredentialCache`] populated with a fresh credential.
///
/// The fetcher and the scheduler should share one [`Clock`] so that `expires_at` and the
/// scheduler's notion of "now" agree.
pub struct RefreshScheduler<S>
where
	S: ?Sized + CredentialSource,
{
	source: Arc<S>,
	cache: CredentialCache,
	policy: RefreshPolicy,
	clock: Arc<dyn Clock>,
	state: watch::Sender<SchedulerState>,
	metrics: Arc<RefreshMetrics>,
}
impl<S> RefreshScheduler<S>
where
	S: ?Sized + CredentialSource,
{
	/// Creates a scheduler around `source` with a fresh cache and the system clock.
	pub fn new(source: impl Into<Arc<S>>, policy: RefreshPolicy) -> Result<Self, ConfigError> {
		policy.validate()?;

		let (state, _) = watch::channel(SchedulerState::Uninitialized);

		Ok(Self {
			source: source.into(),
			cache: CredentialCache::default(),
			policy,
			clock: Arc::new(SystemClock),
			state,
			metrics: Default::default(),
		})
	}

	/// Writes into `cache` instead of a private one.
	pub fn with_cache(mut self, cache: CredentialCache) -> Self {
		self.cache = cache;

		self
	}

	/// Overrides the clock used for expiry decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Read-only view for downstream callers.
	pub fn token_handle(&self) -> TokenHandle {
		TokenHandle::new(self.cache.clone(), self.clock.clone())
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SchedulerState {
		*self.state.borrow()
	}

	/// Shared counters for this scheduler.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// Spawns the loop on the current tokio runtime with a private cancellation token.
	pub fn spawn(self) -> RefreshTask {
		self.spawn_with(CancellationToken::new())
	}

	/// Spawns the loop on the current tokio runtime.
	///
	/// Cancelling `parent` (for example an application-wide shutdown token) stops the loop;
	/// dropping or shutting down the returned task never cancels `parent`.
	pub fn spawn_with(self, parent: CancellationToken) -> RefreshTask {
		let cancel = parent.child_token();
		let handle = self.token_handle();
		let state = self.state.subscribe();
		let metrics = self.metrics.clone();
		let cache = self.cache.clone();
		let join = tokio::spawn(self.run(cancel.clone()));

		RefreshTask { handle, state, metrics, cache, cancel, join: Some(join) }
	}

	/// Runs the loop on the calling task until `cancel` fires.
	pub async fn run(self, cancel: CancellationToken) {
		let span = StageSpan::new(Stage::Refresh);

		span.instrument(async move {
			let mut backoff = Backoff::new(self.policy.initial_backoff, self.policy.max_backoff);

			loop {
				self.metrics.record_attempt();

				let outcome = tokio::select! {
					biased;
					_ = cancel.cancelled() => break,
					outcome = self.source.fetch() => outcome,
				};
				let delay = match outcome {
					Ok(credential) => self.install(credential, &mut backoff),
					Err(err) => self.recover(err, &mut backoff),
				};

				tokio::select! {
					biased;
					_ = cancel.cancelled() => break,
					_ = tokio::time::sleep(delay.unsigned_abs()) => {},
				}
			}

			self.transition(SchedulerState::Stopped);
			obs::scheduler_stopped(self.metrics.attempts());
		})
		.await
	}

	fn install(&self, credential: Credential, backoff: &mut Backoff) -> Duration {
		backoff.reset();
		self.metrics.record_success();

		let remaining = credential.remaining_at(self.clock.now());
		let delay = match refresh_delay(remaining, self.policy.refresh_margin) {
			delay if delay.is_zero() => self.policy.min_refresh_delay,
			delay => delay,
		};

		obs::credential_installed(&credential.fingerprint(), credential.expires_at(), delay);

		self.cache.set(credential);
		self.transition(SchedulerState::Active);

		delay
	}

	fn recover(&self, err: FetchError, backoff: &mut Backoff) -> Duration {
		let streak = self.metrics.record_failure();
		let mut delay = backoff.next_delay();

		if let Some(hint) = err.retry_after() {
			delay = delay.max(hint).min(backoff.max());
		}
		if let Some(current) = self.cache.get() {
			let remaining = current.remaining_at(self.clock.now());

			if remaining.is_positive() {
				delay = delay.min(remaining);
			} else if self.cache.mark_stale() {
				obs::credential_stale(current.expires_at());
			}

			self.transition(SchedulerState::Degraded);
		}

		obs::fetch_failed(&err, delay, streak);

		delay
	}

	fn transition(&self, next: SchedulerState) {
		if self.state.send_replace(next) != next {
			obs::record_state_transition(next.as_str());
		}
	}
}
#[cfg(feature = "reqwest")]
impl RefreshScheduler<ReqwestFetcher> {
	/// Builds a scheduler backed by the default reqwest fetcher.
	pub fn from_config(client: ClientConfig, policy: RefreshPolicy) -> Result<Self, ConfigError> {
		let fetcher = ReqwestFetcher::new(client, &policy)?;

		Self::new(fetcher, policy)
	}
}
impl<S> Debug for RefreshScheduler<S>
where
	S: ?Sized + CredentialSource,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshScheduler")
			.field("policy", &self.policy)
			.field("state", &self.state())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Handle to a spawned [`RefreshScheduler`].
///
/// Dropping the handle cancels the loop; call [`shutdown`](Self::shutdown) to also wait for it
/// and clear the cache.
#[derive(Debug)]
pub struct RefreshTask {
	handle: TokenHandle,
	state: watch::Receiver<SchedulerState>,
	metrics: Arc<RefreshMetrics>,
	cache: CredentialCache,
	cancel: CancellationToken,
	join: Option<JoinHandle<()>>,
}
impl RefreshTask {
	/// Read-only view for downstream callers.
	pub fn token_handle(&self) -> TokenHandle {
		self.handle.clone()
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SchedulerState {
		*self.state.borrow()
	}

	/// Counters for the running loop.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Token that stops this loop (and only this loop) when cancelled.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Waits for the first credential to be installed.
	///
	/// Returns the caller-facing error if the loop stopped first or the credential is already
	/// stale by the time this resolves. There is no upper bound: while the authorization server
	/// keeps rejecting (a wrong secret, for example) this never resolves. Startup code should
	/// prefer [`ready_within`](Self::ready_within).
	pub async fn ready(&self) -> Result<(), CredentialError> {
		let mut state = self.state.clone();
		let _ = state.wait_for(|state| *state != SchedulerState::Uninitialized).await;

		self.handle.current_credential().map(|_| ())
	}

	/// Like [`ready`](Self::ready), but gives up after `timeout` with
	/// [`CredentialError::Absent`].
	pub async fn ready_within(&self, timeout: Duration) -> Result<(), CredentialError> {
		tokio::time::timeout(timeout.unsigned_abs(), self.ready())
			.await
			.unwrap_or(Err(CredentialError::Absent))
	}

	/// Cancels the loop, waits for it to finish, and clears the cache.
	pub async fn shutdown(mut self) {
		self.cancel.cancel();

		if let Some(join) = self.join.take() {
			let _ = join.await;
		}

		self.cache.clear();
	}
}
impl Drop for RefreshTask {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}
