// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level error taxonomy

use crate::domain::DomainError;
use crate::mutable_state::StateError;
use crate::serialization::SerializationError;
use chronicle_store::StoreError;
use thiserror::Error;

/// Errors surfaced by [`crate::ExecutionContext`] operations.
///
/// `Conflict` is the one sentinel callers are expected to branch on: the
/// workflow changed underneath the transaction, so reload and retry the
/// decision. Discriminate with [`EngineError::is_conflict`], never by
/// message.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The store rejected the optimistic-concurrency condition on either
    /// the history append or the execution update.
    #[error("workflow execution changed underneath the update; reload and retry")]
    Conflict,

    /// An operation that requires loaded mutable state ran on an empty
    /// context.
    #[error("mutable state not loaded")]
    StateNotLoaded,

    /// Continue-as-new was asked to start a successor run with no initial
    /// history events.
    #[error("continue-as-new produced no initial history")]
    EmptyInitialHistory,

    #[error("domain resolution failed: {0}")]
    Domain(#[from] DomainError),

    #[error("history serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    #[error("mutable state error: {0}")]
    State(#[from] StateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}
