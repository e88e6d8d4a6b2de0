//! Optional observability helpers for the fetcher and the refresh loop.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `bearer_keeper.refresh` with a `stage` field, plus
//!   events when a credential is installed, a fetch fails, the credential goes stale, or the
//!   scheduler stops. Access tokens are never logged; the credential fingerprint is.
//! - Enable `metrics` to increment `bearer_keeper_fetch_total` (labeled by `outcome`) for every
//!   fetch attempt/success/failure and `bearer_keeper_state_total` (labeled by `state`) for
//!   every scheduler state transition.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// A single credential exchange.
	Fetch,
	/// The background refresh loop.
	Refresh,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Fetch => "fetch",
			Stage::Refresh => "refresh",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchOutcome {
	/// Entry to the fetcher.
	Attempt,
	/// Credential obtained.
	Success,
	/// Failure reported back to the scheduler.
	Failure,
}
impl FetchOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FetchOutcome::Attempt => "attempt",
			FetchOutcome::Success => "success",
			FetchOutcome::Failure => "failure",
		}
	}
}
impl Display for FetchOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
