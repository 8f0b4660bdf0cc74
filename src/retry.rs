use rand::Rng;
use std::{future::Future, time::Duration};

/// RetryPolicy
///
/// Bounds for the exponential backoff applied to database calls. The delay before
/// attempt `n + 1` is `base_delay * 2^(n - 1)`, capped at `max_delay`, then scaled by a
/// random jitter factor in `[0.5, 1.0]` so that concurrent callers do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// backoff_delay
///
/// Computes the sleep before the attempt following `attempt` (1-based). `jitter` is clamped
/// into `[0.5, 1.0]`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, jitter: f64) -> Duration {
    // Shift is bounded so the multiplication cannot overflow before the cap applies.
    let exponent = attempt.saturating_sub(1).min(20);
    let raw = policy.base_delay.saturating_mul(1u32 << exponent);
    raw.min(policy.max_delay).mul_f64(jitter.clamp(0.5, 1.0))
}

/// is_retryable
///
/// Classifies a database error as transient. Pool acquisition timeouts, broken
/// connections, serialization failures, deadlocks, and server-side connection limits
/// are worth another attempt; constraint violations and bad queries are not.
pub fn is_retryable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_retryable_code(&code)),
        _ => false,
    }
}

fn is_retryable_code(code: &str) -> bool {
    // 40001 serialization_failure, 40P01 deadlock_detected, 57P01 admin_shutdown,
    // 53300 too_many_connections, 08xxx connection_exception.
    matches!(code, "40001" | "40P01" | "57P01" | "53300") || code.starts_with("08")
}

/// retry_if
///
/// Runs `op` until it succeeds, fails with an error `should_retry` rejects, or the policy's
/// attempts are exhausted. Each retry is logged at WARN with the operation name.
pub async fn retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                let jitter = rand::thread_rng().gen_range(0.5..=1.0);
                let delay = backoff_delay(policy, attempt, jitter);
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// with_retry
///
/// `retry_if` specialised to sqlx calls with the standard retryable classification.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    op: F,
) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    retry_if(policy, operation, is_retryable, op).await
}
