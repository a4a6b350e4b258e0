// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution store contract

use crate::error::StoreError;
use crate::requests::{
    AppendHistoryEventsRequest, DeleteWorkflowHistoryRequest, GetWorkflowExecutionRequest,
    GetWorkflowExecutionResponse, ResetMutableStateRequest, UpdateWorkflowExecutionRequest,
};
use async_trait::async_trait;

/// Persistence backend for workflow executions and their histories.
///
/// Implementations must be safe for concurrent use; per-execution write
/// ordering is enforced above this trait by the execution context's
/// single-writer lock plus the `condition` token on every write.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn get_workflow_execution(
        &self,
        request: GetWorkflowExecutionRequest,
    ) -> Result<GetWorkflowExecutionResponse, StoreError>;

    /// Conditioned update of the execution record plus its task queues
    /// and pending-info deltas. Fails with
    /// [`StoreError::ConditionFailed`] when the stored `next_event_id`
    /// differs from `request.condition`.
    async fn update_workflow_execution(
        &self,
        request: UpdateWorkflowExecutionRequest,
    ) -> Result<(), StoreError>;

    /// Appends one contiguous batch of serialized history events under a
    /// transaction ID.
    async fn append_history_events(
        &self,
        request: AppendHistoryEventsRequest,
    ) -> Result<(), StoreError>;

    /// Replaces the full mutable state under a condition.
    async fn reset_mutable_state(&self, request: ResetMutableStateRequest)
        -> Result<(), StoreError>;

    /// Removes a run's history outright. Used to reclaim the history of a
    /// continue-as-new successor whose execution record was never written.
    async fn delete_workflow_history(
        &self,
        request: DeleteWorkflowHistoryRequest,
    ) -> Result<(), StoreError>;
}
