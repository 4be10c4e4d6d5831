use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    agent::error::AutofillError,
    fill::delay::{Delay, ThreadDelay},
};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
const API_RETRY_MS: u64 = 2000;
const NETWORK_BASE_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    Retry(Duration),
    Fail,
}

/// Retry policy around remote calls. Only `Remote` errors are retried:
/// network failures back off exponentially, throttling and server errors
/// honor `Retry-After`.
pub struct ErrorRecovery {
    pub max_retries: u32,
    delay: Box<dyn Delay>,
}

impl Default for ErrorRecovery {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, Box::new(ThreadDelay))
    }
}

impl ErrorRecovery {
    pub fn new(max_retries: u32, delay: Box<dyn Delay>) -> Self {
        Self { max_retries, delay }
    }

    /// What to do after `error` on the attempt numbered `attempt` (0-based).
    pub fn decide(&self, error: &AutofillError, attempt: u32) -> RecoveryAction {
        if attempt >= self.max_retries {
            return RecoveryAction::Fail;
        }

        match error {
            AutofillError::Remote { status: None, .. } => {
                let factor = 2u64.saturating_pow(attempt);
                RecoveryAction::Retry(Duration::from_millis(factor.saturating_mul(NETWORK_BASE_MS)))
            }
            AutofillError::Remote {
                status: Some(status),
                retry_after,
                ..
            } if *status == 429 || *status == 404 || (500..600).contains(status) => {
                let wait = retry_after
                    .map(Duration::from_secs)
                    .unwrap_or(Duration::from_millis(API_RETRY_MS));
                RecoveryAction::Retry(wait)
            }
            _ => RecoveryAction::Fail,
        }
    }

    /// Run `op` until it succeeds or the policy gives up.
    pub fn run<T, F>(&self, mut op: F) -> Result<T, AutofillError>
    where
        F: FnMut() -> Result<T, AutofillError>,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "remote call recovered");
                    }
                    return Ok(value);
                }
                Err(e) => match self.decide(&e, attempt) {
                    RecoveryAction::Retry(wait) => {
                        warn!(attempt, wait_ms = wait.as_millis() as u64, error = %e, "retrying remote call");
                        self.delay.pause(wait);
                        attempt += 1;
                    }
                    RecoveryAction::Fail => return Err(e),
                },
            }
        }
    }
}
