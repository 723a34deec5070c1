//! Reconnect schedule for the streaming connection.
//!
//! Bounded exponential backoff: the n-th consecutive attempt waits
//! `initial_delay * multiplier^(n-1)`, capped at `max_delay`. After
//! `max_attempts` the schedule is exhausted until `reset`.

use std::time::Duration;

use salesline_types::config::ReconnectConfig;

#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectBackoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }
        let delay = self.delay_for(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// Called after a successful open.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.config.max_attempts
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self.config.multiplier.max(1.0);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let millis = (self.config.initial_delay_ms as f64) * multiplier.powi(exponent);
        let capped = millis.min(self.config.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32) -> ReconnectConfig {
        ReconnectConfig {
            max_attempts,
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_delays_grow_and_cap() {
        let mut backoff = ReconnectBackoff::new(config(6));
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
    }

    #[test]
    fn test_bounded_attempts() {
        let mut backoff = ReconnectBackoff::new(config(2));
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
        assert!(backoff.is_exhausted());
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut backoff = ReconnectBackoff::new(config(1));
        backoff.next_delay();
        assert!(backoff.is_exhausted());

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_zero_attempts_never_schedules() {
        let mut backoff = ReconnectBackoff::new(config(0));
        assert!(backoff.next_delay().is_none());
    }
}
