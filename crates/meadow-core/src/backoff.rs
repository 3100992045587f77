//! Reconnection delay policy.
//!
//! The session consults the policy each time a transport closes without being
//! asked to. Attempts are 1-based: the first reconnect after a drop is
//! attempt 1.

use std::time::Duration;

use rand::Rng;

/// Delay between a drop and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// First delay of the exponential policy.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Growth factor of the exponential policy.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Ceiling of the exponential policy.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Jitter factor of the exponential policy (0.0-1.0).
pub const DEFAULT_JITTER: f64 = 0.2;

/// How long to wait before reconnecting, and when to give up.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconnectPolicy {
    /// Constant delay, unbounded attempts.
    Fixed {
        /// Delay before every attempt
        delay: Duration,
    },
    /// `initial * multiplier^(attempt - 1)`, capped at `max_delay`.
    Exponential {
        /// Delay before the first attempt
        initial: Duration,
        /// Growth factor per attempt
        multiplier: f64,
        /// Ceiling applied after jitter
        max_delay: Duration,
        /// Symmetric jitter factor: 0.2 varies the delay by ±20%
        jitter: f64,
        /// Give up after this many attempts. `None` retries forever.
        max_attempts: Option<u32>,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed { delay: DEFAULT_RECONNECT_DELAY }
    }
}

impl ReconnectPolicy {
    /// Exponential policy with default parameters and no attempt limit.
    pub fn exponential() -> Self {
        Self::Exponential {
            initial: DEFAULT_INITIAL_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_JITTER,
            max_attempts: None,
        }
    }

    /// Delay before `attempt`. `None` once the policy has given up.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Option<Duration> {
        match *self {
            Self::Fixed { delay } => Some(delay),
            Self::Exponential { initial, multiplier, max_delay, jitter, max_attempts } => {
                if max_attempts.is_some_and(|max| attempt > max) {
                    return None;
                }

                let exponent = attempt.saturating_sub(1).min(63) as i32;
                let ceiling = max_delay.as_secs_f64();
                let growth = multiplier.max(1.0).powi(exponent);
                let base = (initial.as_secs_f64() * growth).min(ceiling);

                let jitter = jitter.clamp(0.0, 1.0);
                let factor = if jitter > 0.0 {
                    1.0 + (rng.r#gen::<f64>() * 2.0 - 1.0) * jitter
                } else {
                    1.0
                };

                Some(Duration::from_secs_f64((base * factor).clamp(0.0, ceiling)))
            },
        }
    }

    /// Attempt limit, if any.
    pub fn max_attempts(&self) -> Option<u32> {
        match self {
            Self::Fixed { .. } => None,
            Self::Exponential { max_attempts, .. } => *max_attempts,
        }
    }
}
