//! Startup retry with exponential backoff.

use anyhow::{anyhow, Result};
use std::fmt::Display;
use std::future::Future;
use tokio::time::{sleep, timeout, Duration};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound for a single attempt, including the readiness probe.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Wait before the attempt following `attempt` (1-based):
    /// initial, 2x, 4x, ... capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts;

    for attempt in 1..=max_attempts {
        info!("🔄 Attempting to {}... (attempt {}/{})", what, attempt, max_attempts);

        let failure = match timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("attempt timed out after {:?}", policy.attempt_timeout),
        };

        if attempt < max_attempts {
            let wait = policy.backoff_for(attempt);
            warn!(
                "⚠️  Failed to {}: {}. Retrying in {:?} (attempt {}/{})...",
                what, failure, wait, attempt, max_attempts
            );
            sleep(wait).await;
        } else {
            error!("❌ Failed to {} after {} attempts: {}", what, max_attempts, failure);
            return Err(anyhow!("Failed to {} after {} attempts: {}", what, max_attempts, failure));
        }
    }

    Err(anyhow!("Failed to {}: no attempts allowed", what))
}
