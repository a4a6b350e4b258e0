// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response shapes for the execution store

use crate::types::{
    ActivityInfo, BufferedReplicationBatch, ChildExecutionInfo, ExecutionInfo, ReplicationState,
    RequestCancelInfo, SignalInfo, TimerInfo, WorkflowSnapshot,
};
use chronicle_core::{
    DomainId, HistoryEvent, ReplicationTask, TimerTask, TransferTask, WorkflowExecution,
};
use smol_str::SmolStr;

#[derive(Debug, Clone)]
pub struct GetWorkflowExecutionRequest {
    pub domain_id: DomainId,
    pub execution: WorkflowExecution,
}

#[derive(Debug, Clone)]
pub struct GetWorkflowExecutionResponse {
    pub snapshot: WorkflowSnapshot,
}

/// Appends one contiguous batch of already-serialized history events.
#[derive(Debug, Clone)]
pub struct AppendHistoryEventsRequest {
    pub domain_id: DomainId,
    pub execution: WorkflowExecution,
    pub first_event_id: i64,
    pub transaction_id: i64,
    /// Speculative (transient) batches precede the main batch under the
    /// same transaction ID and may be discarded on replay.
    pub is_transient_batch: bool,
    pub event_count: usize,
    /// Encoded event batch; opaque to the store.
    pub events: Vec<u8>,
}

/// The conditioned write closing one update session.
///
/// `condition` must equal the stored `next_event_id` or the store answers
/// [`crate::StoreError::ConditionFailed`].
#[derive(Debug, Clone)]
pub struct UpdateWorkflowExecutionRequest {
    pub execution_info: ExecutionInfo,
    pub replication_state: Option<ReplicationState>,
    pub condition: i64,

    pub transfer_tasks: Vec<TransferTask>,
    pub timer_tasks: Vec<TimerTask>,
    pub replication_tasks: Vec<ReplicationTask>,
    pub delete_timer_task: Option<TimerTask>,

    pub upsert_activities: Vec<ActivityInfo>,
    pub delete_activity_ids: Vec<i64>,
    pub upsert_timers: Vec<TimerInfo>,
    pub delete_timer_ids: Vec<SmolStr>,
    pub upsert_children: Vec<ChildExecutionInfo>,
    pub delete_child_ids: Vec<i64>,
    pub upsert_cancel_requests: Vec<RequestCancelInfo>,
    pub delete_cancel_request_ids: Vec<i64>,
    pub upsert_signals: Vec<SignalInfo>,
    pub delete_signal_ids: Vec<i64>,
    pub upsert_signal_requested_ids: Vec<SmolStr>,
    pub delete_signal_requested_ids: Vec<SmolStr>,

    pub new_buffered_events: Vec<HistoryEvent>,
    pub clear_buffered_events: bool,
    pub new_buffered_replication_batch: Option<BufferedReplicationBatch>,
    pub deleted_buffered_replication_id: Option<i64>,

    pub continue_as_new: bool,
    /// The run is closing; the store may expire the current-run pointer
    /// after `finish_execution_ttl_secs`.
    pub finish_execution: bool,
    pub finish_execution_ttl_secs: i64,
}

/// Replaces the full mutable state under a condition (conflict resolution).
#[derive(Debug, Clone)]
pub struct ResetMutableStateRequest {
    pub condition: i64,
    pub snapshot: WorkflowSnapshot,
}

/// Reclaims the history of a run that never gained an execution record
/// (orphaned continue-as-new cleanup).
#[derive(Debug, Clone)]
pub struct DeleteWorkflowHistoryRequest {
    pub domain_id: DomainId,
    pub execution: WorkflowExecution,
}
