use std::fmt;
use std::future::Future;
use std::time::Duration;

use kiosk_signature::SignatureError;
use tracing::warn;

use crate::error::KioskError;

/// Collaborator errors that say whether they were a timeout.
pub trait Transient: fmt::Display {
    fn is_timeout(&self) -> bool;
}

impl Transient for SignatureError {
    fn is_timeout(&self) -> bool {
        SignatureError::is_timeout(self)
    }
}

/// Bounded timeout and retry applied to every collaborator call.
///
/// Only timeout-class failures are retried: the call exceeding `timeout`,
/// or the collaborator reporting a timeout itself. Anything else is
/// returned on the first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,

    /// Attempts after the first.
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each one after.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            max_retries: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails with a non-timeout error, or
    /// `max_retries + 1` attempts have timed out.
    pub async fn run<T, E, F, Fut>(&self, collaborator: &'static str, mut op: F) -> Result<T, KioskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Into<KioskError>,
    {
        let attempts = self.max_retries.saturating_add(1);
        let mut last = String::new();

        for attempt in 0..attempts {
            if attempt > 0 {
                let backoff = self.backoff_before(attempt);
                warn!(collaborator, attempt, ?backoff, error = %last, "kiosk: retrying after timeout");
                tokio::time::sleep(backoff).await;
            }

            match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(v)) => return Ok(v),
                Ok(Err(e)) if e.is_timeout() => last = e.to_string(),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => last = format!("no response within {:?}", self.timeout),
            }
        }

        Err(KioskError::CollaboratorTimeout {
            collaborator,
            attempts,
            message: last,
        })
    }

    /// Delay before attempt `attempt` (1 is the first retry). Saturates
    /// instead of overflowing.
    fn backoff_before(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor)
    }
}
