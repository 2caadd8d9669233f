//! Exponential backoff counter.
//!
//! [`Backoff`] is a small value type: [`advance`](Backoff::advance) returns the
//! current value together with the next state, and the [`Iterator`] impl
//! threads that state for callers that prefer a loop.

/// Exponential counter capped at `interval`.
///
/// The produced sequence is non-decreasing and saturates at `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: u64,
    exponent: u64,
    interval: u64,
}

impl Backoff {
    /// Create a counter starting at `current`, multiplied by `exponent` on each
    /// step and never exceeding `interval` after the first step.
    pub const fn new(current: u64, exponent: u64, interval: u64) -> Self {
        Self {
            current,
            exponent,
            interval,
        }
    }

    /// The value the next step will yield, without advancing.
    pub fn peek(&self) -> u64 {
        self.current
    }

    /// Return the current value and the advanced state.
    #[must_use]
    pub fn advance(self) -> (u64, Self) {
        let next = Self {
            current: self.current.saturating_mul(self.exponent).min(self.interval),
            ..self
        };
        (self.current, next)
    }
}

impl Iterator for Backoff {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let (value, next) = self.advance();
        *self = next;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_saturates_at_interval() {
        let values: Vec<u64> = Backoff::new(1, 2, 100).take(10).collect();
        assert_eq!(values, vec![1, 2, 4, 8, 16, 32, 64, 100, 100, 100]);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut backoff = Backoff::new(1, 2, 100);
        assert_eq!(backoff.peek(), 1);
        assert_eq!(backoff.peek(), 1);
        assert_eq!(backoff.next(), Some(1));
        assert_eq!(backoff.peek(), 2);
        assert_eq!(backoff.peek(), 2);
    }

    #[test]
    fn test_advance_leaves_original_untouched() {
        let start = Backoff::new(3, 3, 50);
        let (value, next) = start.advance();
        assert_eq!(value, 3);
        assert_eq!(next.peek(), 9);
        assert_eq!(start.peek(), 3);
    }

    #[test]
    fn test_exponent_one_is_constant() {
        let values: Vec<u64> = Backoff::new(5, 1, 100).take(4).collect();
        assert_eq!(values, vec![5, 5, 5, 5]);
    }

    #[test]
    fn test_start_above_interval_drops_to_interval() {
        let values: Vec<u64> = Backoff::new(500, 2, 120).take(3).collect();
        assert_eq!(values, vec![500, 120, 120]);
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let mut backoff = Backoff::new(u64::MAX / 2 + 1, 4, u64::MAX);
        backoff.next();
        assert_eq!(backoff.peek(), u64::MAX);
    }
}
