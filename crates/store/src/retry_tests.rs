// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::StoreError;
use std::sync::atomic::{AtomicU32, Ordering};

#[tokio::test(start_paused = true)]
async fn succeeds_after_transient_failures() {
    let calls = AtomicU32::new(0);
    let result: Result<u32, StoreError> =
        retry(&RetryPolicy::persistence_default(), StoreError::is_transient, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StoreError::Timeout("slow".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_errors_surface_immediately() {
    let calls = AtomicU32::new(0);
    let result: Result<(), StoreError> =
        retry(&RetryPolicy::persistence_default(), StoreError::is_transient, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::ConditionFailed { expected: 1, actual: 2 }) }
        })
        .await;
    assert!(matches!(result, Err(StoreError::ConditionFailed { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_surfaces_last_error() {
    let calls = AtomicU32::new(0);
    let result: Result<(), StoreError> =
        retry(&RetryPolicy::persistence_default(), StoreError::is_transient, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(StoreError::Unavailable(format!("attempt {n}"))) }
        })
        .await;
    match result {
        Err(StoreError::Unavailable(msg)) => assert_eq!(msg, "attempt 4"),
        other => panic!("expected Unavailable, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn intervals_grow_and_cap() {
    let policy = RetryPolicy::persistence_default();
    assert_eq!(policy.interval_for(1), Duration::from_millis(50));
    assert_eq!(policy.interval_for(2), Duration::from_millis(100));
    assert_eq!(policy.interval_for(3), Duration::from_millis(200));
    // Far attempts are capped at max_interval
    assert_eq!(policy.interval_for(20), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn expiration_bounds_the_loop() {
    let policy = RetryPolicy {
        initial_interval: Duration::from_secs(8),
        backoff_coefficient: 2.0,
        max_interval: Duration::from_secs(8),
        max_attempts: 10,
        expiration: Some(Duration::from_secs(5)),
    };
    let calls = AtomicU32::new(0);
    let result: Result<(), StoreError> = retry(&policy, StoreError::is_transient, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(StoreError::Busy("throttled".into())) }
    })
    .await;
    assert!(matches!(result, Err(StoreError::Busy(_))));
    // First interval (8s) would already overshoot the 5s expiration
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
