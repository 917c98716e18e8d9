use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// Implement this trait to control how the client should
/// behave when reconnecting after an unintentional disconnect.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - The consecutive-failure count (0-indexed, reset to 0
    ///   after a successful open)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Reset the strategy state (called after successful connection)
    fn reset(&mut self);

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Stepped backoff reconnection strategy
///
/// The delay is a step function of the consecutive-failure count:
///
/// | attempts | delay |
/// |---|---|
/// | n < 5 | 1s |
/// | 5 ≤ n < 15 | 5s |
/// | 15 ≤ n < 100 | 10s |
/// | n ≥ 100 | 60s |
///
/// Reconnection is unbounded: the strategy never gives up. This is the
/// default for a long-lived client where the caller owns the lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteppedBackoff;

impl SteppedBackoff {
    pub fn new() -> Self {
        Self
    }
}

impl ReconnectionStrategy for SteppedBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        let millis = match attempt {
            0..=4 => 1_000,
            5..=14 => 5_000,
            15..=99 => 10_000,
            _ => 60_000,
        };
        Some(Duration::from_millis(millis))
    }

    fn reset(&mut self) {
        // No state to reset for stepped backoff
    }

    fn should_reconnect(&self, _attempt: usize) -> bool {
        true
    }
}

/// Fixed delay reconnection strategy
///
/// Always waits the same amount of time between reconnection attempts.
/// Useful for tests and for callers that want a bounded retry budget.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    /// Create a new fixed delay strategy
    ///
    /// # Arguments
    /// * `delay` - The fixed delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn reset(&mut self) {
        // No state to reset for fixed delay
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}
