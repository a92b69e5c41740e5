// Fixed-delay retry policy shared by every upload entry point.

use crate::error::LanzouError;
use std::time::Duration;
use tracing::warn;

/// At most `max_attempts` tries with `delay` between consecutive tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// What happened after the policy ran.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    /// Every attempt came back empty or failed; `last_error` is the error of
    /// the final attempt, if it raised one.
    Exhausted {
        attempts: u32,
        last_error: Option<LanzouError>,
    },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it yields `Ok(Some(_))` or the attempts run out.
    ///
    /// `op` receives the 1-based attempt number. `Ok(None)` and `Err(_)`
    /// both count as a failed attempt. `sleep` is called between attempts,
    /// never after the last one.
    pub fn run<T, F, S>(&self, mut op: F, mut sleep: S) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Result<Option<T>, LanzouError>,
        S: FnMut(Duration),
    {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            match op(attempt) {
                Ok(Some(value)) => return RetryOutcome::Succeeded { value, attempts: attempt },
                Ok(None) => {
                    warn!(attempt, max = self.max_attempts, "attempt produced no result");
                    last_error = None;
                }
                Err(e) => {
                    warn!(attempt, max = self.max_attempts, "attempt failed: {}", e);
                    last_error = Some(e);
                }
            }
            if attempt < self.max_attempts {
                warn!("retrying in {:?}", self.delay);
                sleep(self.delay);
            }
        }
        RetryOutcome::Exhausted {
            attempts: self.max_attempts,
            last_error,
        }
    }
}
