//! Reconnect backoff policy.

use crate::error::{Result, SyncError};
use std::time::Duration;

/// Exponential backoff configuration for automatic reconnects.
#[derive(Clone, Copy, Debug)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for the computed delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub factor: f64,
    /// Jitter blend in `0.0..=1.0`; `0.0` is fully deterministic.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            jitter: 0.3,
        }
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<()> {
        if self.initial_delay.is_zero() {
            return Err(SyncError::InvalidConfig(
                "initial reconnect delay must be > 0".into(),
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(SyncError::InvalidConfig(
                "max reconnect delay must be >= initial delay".into(),
            ));
        }
        if self.factor < 1.0 || !self.factor.is_finite() {
            return Err(SyncError::InvalidConfig(
                "backoff factor must be >= 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) || !self.jitter.is_finite() {
            return Err(SyncError::InvalidConfig(
                "jitter must be between 0.0 and 1.0".into(),
            ));
        }
        Ok(())
    }
}

/// Delay before reconnect attempt `attempt` (0-based).
pub fn delay_for_attempt(config: BackoffConfig, attempt: u32) -> Duration {
    let initial = config.initial_delay.as_secs_f64();
    let max = config.max_delay.as_secs_f64();
    let exponent = config.factor.powf(f64::from(attempt));
    let base = (initial * exponent).min(max);

    if config.jitter == 0.0 {
        return Duration::from_secs_f64(base);
    }

    use rand::Rng;
    let mut rng = rand::thread_rng();
    let randomized = rng.gen_range(0.0..=base);
    let blended = base * (1.0 - config.jitter) + randomized * config.jitter;
    Duration::from_secs_f64(blended)
}
