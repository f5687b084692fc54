//! Timeout and polling helpers for scenario bodies
//!
//! These sit inside a guarded body. An elapsed deadline surfaces as
//! [`E2eError::Timeout`], which known issues can match like any other
//! failure.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Run `operation`, failing with `E2eError::Timeout` if it takes longer
/// than `limit`.
pub async fn with_timeout<F, T>(label: &str, limit: Duration, operation: F) -> E2eResult<T>
where
    F: Future<Output = E2eResult<T>>,
{
    match timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} did not finish within {} ms", label, limit.as_millis());
            Err(E2eError::Timeout(format!("{} after {} ms", label, limit.as_millis())))
        }
    }
}

/// Poll `check` every `interval` until it succeeds or `limit` elapses.
///
/// Meant for eventually-consistent reads (alarm lists, dashboard tiles).
/// On timeout the last failure's message is kept in the timeout error.
pub async fn eventually<F, Fut, T>(
    label: &str,
    limit: Duration,
    interval: Duration,
    mut check: F,
) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let last = match check().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if start.elapsed() + interval > limit {
            warn!("{} still failing after {} attempts: {}", label, attempts, last);
            return Err(E2eError::Timeout(format!(
                "{} after {} ms ({} attempts, last error: {})",
                label,
                limit.as_millis(),
                attempts,
                last
            )));
        }

        debug!("{} attempt {} failed: {}", label, attempts, last);
        sleep(interval).await;
    }
}
