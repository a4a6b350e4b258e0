// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded exponential backoff for transient persistence failures

use std::future::Future;
use std::time::Duration;

/// Backoff schedule for retrying transient failures.
///
/// The interval grows by `backoff_coefficient` per attempt, capped at
/// `max_interval`. The loop stops when `max_attempts` is reached or the
/// total elapsed time exceeds `expiration`, whichever comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
    pub expiration: Option<Duration>,
}

impl RetryPolicy {
    /// Default schedule for persistence operations: 50ms doubling to a
    /// 2s cap, at most 5 attempts within 10s.
    pub fn persistence_default() -> Self {
        Self {
            initial_interval: Duration::from_millis(50),
            backoff_coefficient: 2.0,
            max_interval: Duration::from_secs(2),
            max_attempts: 5,
            expiration: Some(Duration::from_secs(10)),
        }
    }

    /// Sleep interval before retry number `attempt` (1-based: the wait
    /// after the first failure is `interval_for(1)`).
    fn interval_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_coefficient.powi(attempt.saturating_sub(1) as i32);
        let millis = (self.initial_interval.as_millis() as f64 * factor).round();
        let capped = millis.min(self.max_interval.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

/// Run `op`, retrying while `is_retryable` approves the error and the
/// policy has budget left. Exhaustion surfaces the last error.
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, is_retryable: P, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let started = tokio::time::Instant::now();
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= policy.max_attempts {
                    return Err(err);
                }
                let interval = policy.interval_for(attempt);
                if let Some(expiration) = policy.expiration {
                    if started.elapsed() + interval > expiration {
                        return Err(err);
                    }
                }
                tracing::debug!(attempt, error = %err, "retrying transient persistence failure");
                tokio::time::sleep(interval).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
