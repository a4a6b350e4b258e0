// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    timeout          = { StoreError::Timeout("t".into()), true },
    busy             = { StoreError::Busy("b".into()), true },
    unavailable      = { StoreError::Unavailable("u".into()), true },
    condition_failed = { StoreError::ConditionFailed { expected: 1, actual: 2 }, false },
    not_found        = { StoreError::NotFound("wf".into()), false },
    corrupt          = { StoreError::Corrupt("c".into()), false },
)]
fn transient_classification(error: StoreError, expected: bool) {
    assert_eq!(error.is_transient(), expected);
}

#[test]
fn serialization_errors_are_not_transient() {
    let bad = serde_json::from_str::<i64>("not json").unwrap_err();
    let error = StoreError::from(bad);
    assert!(!error.is_transient());
}

#[test]
fn condition_failed_is_identified() {
    let error = StoreError::ConditionFailed { expected: 11, actual: 14 };
    assert!(error.is_condition_failed());
    assert!(!StoreError::NotFound("x".into()).is_condition_failed());
}

#[test]
fn condition_failed_message_names_both_sides() {
    let error = StoreError::ConditionFailed { expected: 11, actual: 14 };
    let message = error.to_string();
    assert!(message.contains("11"));
    assert!(message.contains("14"));
}
