use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff between attempts at the same block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failure in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier applied per additional consecutive failure
    pub backoff_multiplier: f64,
    /// Spread delays by up to ±5%
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl BackoffPolicy {
    /// No waiting at all; used by tests and one-shot replays
    pub fn immediate() -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay to wait after `consecutive_failures` failures in a row
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay_ms as f64;
        let exponent = (consecutive_failures - 1).min(i32::MAX as u32) as i32;
        let exponential_delay = base_delay * self.backoff_multiplier.powi(exponent);
        let capped_delay = exponential_delay.min(self.max_delay_ms as f64);

        let final_delay = if self.jitter {
            let jitter_factor = 0.1;
            let jitter = capped_delay * jitter_factor * (rand::random::<f64>() - 0.5);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay / 1000.0)
    }
}

/// Tracks consecutive failures of one block and decides when to raise the
/// liveness alarm
#[derive(Debug, Clone)]
pub struct FailureTracker {
    policy: BackoffPolicy,
    alarm_after: u32,
    consecutive_failures: u32,
}

impl FailureTracker {
    pub fn new(policy: BackoffPolicy, alarm_after: u32) -> Self {
        Self {
            policy,
            alarm_after: alarm_after.max(1),
            consecutive_failures: 0,
        }
    }

    /// Register a failure and return the delay before the next attempt
    pub fn record_failure(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.policy.delay_for(self.consecutive_failures)
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// True on the `alarm_after`-th failure and every `alarm_after` failures after it
    pub fn should_alarm(&self) -> bool {
        self.consecutive_failures > 0 && self.consecutive_failures % self.alarm_after == 0
    }
}
