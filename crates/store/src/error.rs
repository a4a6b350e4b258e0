// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error taxonomy and the transient classifier

use thiserror::Error;

/// Errors surfaced by an [`crate::ExecutionStore`].
///
/// `ConditionFailed` and `Serialization` are terminal for the operation
/// that produced them and must never be retried; the remaining transient
/// variants are classified by [`StoreError::is_transient`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed: the stored `next_event_id`
    /// did not match the request condition.
    #[error("condition mismatch: expected next_event_id {expected}, stored {actual}")]
    ConditionFailed { expected: i64, actual: i64 },

    #[error("workflow execution not found: {0}")]
    NotFound(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The store is shedding load; back off and retry.
    #[error("storage busy: {0}")]
    Busy(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Transient errors are retried in place by the persistence retry
    /// wrappers; everything else propagates on first sight.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Busy(_) | Self::Unavailable(_))
    }

    pub fn is_condition_failed(&self) -> bool {
        matches!(self, Self::ConditionFailed { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
