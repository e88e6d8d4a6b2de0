// self
use crate::obs::FetchOutcome;

/// Records a fetch outcome via the global metrics recorder (when enabled).
pub fn record_fetch_outcome(outcome: FetchOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("bearer_keeper_fetch_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records a scheduler state transition via the global metrics recorder (when enabled).
pub fn record_state_transition(state: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("bearer_keeper_state_total", "state" => state).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = state;
	}
}
