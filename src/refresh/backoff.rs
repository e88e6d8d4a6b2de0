//! Bounded exponential backoff for failed fetches.

// self
use crate::_prelude::*;

/// Doubling retry delay, capped at `max`, reset after every success.
///
/// Delays handed out by [`next_delay`](Self::next_delay) never decrease until
/// [`reset`](Self::reset) is called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
	initial: Duration,
	max: Duration,
	current: Duration,
}
impl Backoff {
	/// Creates a backoff starting at `initial` and never exceeding `max`.
	pub fn new(initial: Duration, max: Duration) -> Self {
		let initial = if initial.is_negative() { Duration::ZERO } else { initial };
		let max = if max < initial { initial } else { max };

		Self { initial, max, current: initial }
	}

	/// Returns the delay for the next retry and advances the sequence.
	pub fn next_delay(&mut self) -> Duration {
		let delay = self.current;

		self.current = self.current.saturating_mul(2).min(self.max);

		delay
	}

	/// Delay the next call to [`next_delay`](Self::next_delay) will return.
	pub fn peek(&self) -> Duration {
		self.current
	}

	/// Upper bound of the sequence.
	pub fn max(&self) -> Duration {
		self.max
	}

	/// Restarts the sequence at the initial delay.
	pub fn reset(&mut self) {
		self.current = self.initial;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn delays_double_until_the_cap() {
		let mut backoff = Backoff::new(Duration::seconds(1), Duration::seconds(60));
		let delays: Vec<i64> = (0..9).map(|_| backoff.next_delay().whole_seconds()).collect();

		assert_eq!(delays, [1, 2, 4, 8, 16, 32, 60, 60, 60]);
	}

	#[test]
	fn delays_never_decrease_before_reset() {
		let mut backoff = Backoff::new(Duration::milliseconds(250), Duration::seconds(7));
		let mut previous = Duration::ZERO;

		for _ in 0..64 {
			let delay = backoff.next_delay();

			assert!(delay >= previous);
			assert!(delay <= backoff.max());

			previous = delay;
		}
	}

	#[test]
	fn reset_returns_to_initial_delay() {
		let mut backoff = Backoff::new(Duration::seconds(1), Duration::seconds(60));

		backoff.next_delay();
		backoff.next_delay();

		assert_eq!(backoff.peek(), Duration::seconds(4));

		backoff.reset();

		assert_eq!(backoff.next_delay(), Duration::seconds(1));
	}

	#[test]
	fn inverted_bounds_collapse_to_initial() {
		let mut backoff = Backoff::new(Duration::seconds(5), Duration::seconds(1));

		assert_eq!(backoff.next_delay(), Duration::seconds(5));
		assert_eq!(backoff.next_delay(), Duration::seconds(5));
	}
}
