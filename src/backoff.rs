// src/backoff.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategies for job retries. Delays are kept in milliseconds so the
/// stored job record stays readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackoffStrategy {
    Fixed { delay_ms: u64 },
    Exponential { base_ms: u64, max_ms: Option<u64> },
}

impl BackoffStrategy {
    pub fn fixed(delay: Duration) -> Self {
        BackoffStrategy::Fixed {
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn exponential(base: Duration) -> Self {
        BackoffStrategy::Exponential {
            base_ms: base.as_millis() as u64,
            max_ms: None,
        }
    }

    /// Cap the delay of an exponential strategy. No effect on `Fixed`.
    pub fn with_max(self, max: Duration) -> Self {
        match self {
            BackoffStrategy::Exponential { base_ms, .. } => BackoffStrategy::Exponential {
                base_ms,
                max_ms: Some(max.as_millis() as u64),
            },
            fixed => fixed,
        }
    }

    /// Delay before the next attempt, given the 1-indexed attempt that just
    /// failed. Attempt 0 is treated as 1.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            BackoffStrategy::Exponential { base_ms, max_ms } => {
                let exponent = attempt.max(1) - 1;
                let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
                let delay = base_ms.saturating_mul(factor);
                Duration::from_millis(max_ms.map_or(delay, |max| delay.min(max)))
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            BackoffStrategy::Fixed { .. } => Ok(()),
            BackoffStrategy::Exponential { base_ms, max_ms } => {
                if *base_ms == 0 {
                    return Err("exponential backoff needs a base delay above zero".into());
                }
                match max_ms {
                    Some(max) if max < base_ms => Err(format!(
                        "backoff max delay {}ms is below base delay {}ms",
                        max, base_ms
                    )),
                    _ => Ok(()),
                }
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential {
            base_ms: 2000,
            max_ms: None,
        }
    }
}

/// Convenience type alias
pub type Backoff = BackoffStrategy;

/// Retry delay after `attempt` failed under `policy`.
pub fn next_delay(attempt: u32, policy: &BackoffStrategy) -> Duration {
    policy.calculate_delay(attempt)
}
