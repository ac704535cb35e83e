//! Bounded exponential-backoff polling for an external resource to become ready.

use crate::error::ReadinessError;
use std::future::Future;
use std::time::Duration;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);
/// Default cap on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);
/// Default number of retries after the first probe.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone)]
pub struct ReadinessPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ReadinessPolicy {
    /// Delay after the given zero-based failed attempt: doubles each time, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Result of a single readiness probe
#[derive(Debug)]
pub enum Probe<T> {
    Ready(T),
    NotReady(String),
    Fatal(anyhow::Error),
}

/// Call `probe` until it reports ready, sleeping `delay_for(attempt)` between
/// tries. Gives up after `max_retries` retries.
pub async fn wait_until_ready<T, F, Fut>(
    policy: &ReadinessPolicy,
    mut probe: F,
) -> Result<T, ReadinessError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        match probe(attempt).await {
            Probe::Ready(value) => {
                if attempt > 0 {
                    tracing::info!("Resource ready after {} retries", attempt);
                }
                return Ok(value);
            }
            Probe::Fatal(e) => return Err(ReadinessError::Fatal(e)),
            Probe::NotReady(reason) => {
                if attempt >= policy.max_retries {
                    return Err(ReadinessError::Exhausted {
                        attempts: attempt + 1,
                        last_reason: reason,
                    });
                }

                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    "Not ready (attempt {}): {}; retrying in {:?}",
                    attempt + 1,
                    reason,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
