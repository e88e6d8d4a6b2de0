// self
use crate::{_prelude::*, error::FetchError, obs::Stage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// A span builder used by the fetcher and the scheduler.
#[derive(Clone, Debug)]
pub struct StageSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the provided stage.
	pub fn new(stage: Stage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("bearer_keeper.refresh", stage = stage.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a freshly installed credential and when it will be renewed.
pub fn credential_installed(fingerprint: &str, expires_at: OffsetDateTime, refresh_in: Duration) {
	#[cfg(feature = "tracing")]
	tracing::info!(fingerprint, %expires_at, %refresh_in, "credential installed");
	#[cfg(not(feature = "tracing"))]
	let _ = (fingerprint, expires_at, refresh_in);
}

/// Logs a failed fetch together with the scheduled retry.
pub fn fetch_failed(error: &FetchError, retry_in: Duration, consecutive_failures: u64) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		kind = error.kind(),
		status = error.status(),
		%retry_in,
		consecutive_failures,
		"credential fetch failed: {error}"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (error, retry_in, consecutive_failures);
}

/// Logs that the cached credential expired without a successful renewal.
pub fn credential_stale(expired_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::error!(%expired_at, "cached credential expired without renewal");
	#[cfg(not(feature = "tracing"))]
	let _ = expired_at;
}

/// Logs the scheduler shutting down.
pub fn scheduler_stopped(attempts: u64) {
	#[cfg(feature = "tracing")]
	tracing::debug!(attempts, "refresh scheduler stopped");
	#[cfg(not(feature = "tracing"))]
	let _ = attempts;
}
