//! Time sources used to stamp fetches and evaluate expiry.

// crates.io
use tokio::time::Instant;
// self
use crate::_prelude::*;

/// Source of the current instant.
pub trait Clock
where
	Self: 'static + Send + Sync + Debug,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Clock anchored to the wall clock once and advanced by tokio's monotonic [`Instant`].
///
/// Immune to wall-clock jumps, and follows tokio's paused/advanced time inside tests, so the
/// scheduler's sleeps and the credential expiry are measured on the same timeline.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
	origin: OffsetDateTime,
	started: Instant,
}
impl MonotonicClock {
	/// Anchors a new clock at the current wall-clock instant.
	pub fn new() -> Self {
		Self::anchored_at(OffsetDateTime::now_utc())
	}

	/// Anchors a new clock at `origin`.
	pub fn anchored_at(origin: OffsetDateTime) -> Self {
		Self { origin, started: Instant::now() }
	}
}
impl Default for MonotonicClock {
	fn default() -> Self {
		Self::new()
	}
}
impl Clock for MonotonicClock {
	fn now(&self) -> OffsetDateTime {
		self.origin + self.started.elapsed()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn monotonic_clock_follows_tokio_time() {
		let clock = MonotonicClock::anchored_at(macros::datetime!(2025-01-01 00:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 00:00 UTC));

		tokio::time::advance(std::time::Duration::from_secs(90)).await;

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 00:01:30 UTC));
	}
}
