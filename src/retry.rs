//! Retry executor for chain reads
//!
//! Wraps a single asynchronous RPC operation and retries transient
//! failures (timeouts, malformed responses, rate limiting) with
//! exponential backoff. Anything else propagates immediately.

use crate::rpc::RpcError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry budget and initial backoff delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (must be >= 1)
    pub attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

/// Run `op`, retrying transient errors per the policy.
///
/// `label` names the operation in log output. The last error is returned
/// once the attempt budget is exhausted.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RpcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.attempts => {
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    label, attempt, policy.attempts, delay, err
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
