//! Retry policy wrapped explicitly around the one-request primitive.
use crate::error::RequestError;
use crate::transport::Clock;
use anyhow::{Result, bail};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff for transient request failures.
///
/// Delay before retry `n` (1-based) is `initial * multiplier^(n-1)`, capped at
/// `max_backoff`. The schedule never decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total tries per request, including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 4_000,
            max_backoff_ms: 10_000,
            multiplier: 2,
        }
    }
}

/// A request that failed for good, with the number of tries it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted {
    pub attempts: u32,
    pub cause: RequestError,
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.multiplier == 0 {
            bail!("retry.multiplier must be at least 1");
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            bail!("retry.max_backoff_ms must not be below retry.initial_backoff_ms");
        }
        Ok(())
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Run `op` until it succeeds, fails terminally, or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number. Backoff sleeps happen only
    /// between attempts, never after the last one.
    pub fn run<T, F>(&self, clock: &dyn Clock, mut op: F) -> Result<T, Exhausted>
    where
        F: FnMut(u32) -> Result<T, RequestError>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(cause) if !cause.is_transient() => {
                    debug!("terminal error on attempt {}: {}", attempt, cause);
                    return Err(Exhausted { attempts: attempt, cause });
                }
                Err(cause) if attempt >= max => {
                    warn!("giving up after {} attempt(s): {}", attempt, cause);
                    return Err(Exhausted { attempts: attempt, cause });
                }
                Err(cause) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, max, cause, delay
                    );
                    clock.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
