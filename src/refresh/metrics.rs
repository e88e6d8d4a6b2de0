// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for the refresh loop.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	consecutive_failures: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of fetch attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of fetches that installed a credential.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed fetches.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the length of the current failure streak; zero after a success.
	pub fn consecutive_failures(&self) -> u64 {
		self.consecutive_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
		self.consecutive_failures.store(0, Ordering::Relaxed);
	}

	/// Records a failure and returns the updated streak length.
	pub(crate) fn record_failure(&self) -> u64 {
		self.failure.fetch_add(1, Ordering::Relaxed);

		self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
	}
}
