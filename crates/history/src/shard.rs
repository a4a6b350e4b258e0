// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shard controller contract.
//!
//! A shard is the unit of execution ownership: it hosts many workflow
//! runs, fronts the store for their writes, and fans out history-event
//! notifications. Execution contexts hold only a borrowed handle to it;
//! the shard's execution cache owns the contexts.

use crate::config::HistoryConfig;
use crate::domain::{ClusterMetadata, DomainCache};
use async_trait::async_trait;
use chronicle_core::{DomainId, WorkflowExecution};
use chronicle_store::{
    AppendHistoryEventsRequest, ResetMutableStateRequest, StoreError,
    UpdateWorkflowExecutionRequest,
};

/// Published after every successful commit that may have grown a run's
/// history. Fired strictly after the commit it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEventNotification {
    pub domain_id: DomainId,
    pub execution: WorkflowExecution,
    pub last_first_event_id: i64,
    pub next_event_id: i64,
    pub is_running: bool,
}

#[async_trait]
pub trait ShardContext: Send + Sync {
    fn shard_id(&self) -> u32;

    fn config(&self) -> &HistoryConfig;

    fn domain_cache(&self) -> &dyn DomainCache;

    fn cluster_metadata(&self) -> &dyn ClusterMetadata;

    /// Monotone transaction IDs for history appends.
    fn next_transaction_id(&self) -> i64;

    /// Appends one contiguous batch under a transaction ID. May layer
    /// per-shard bookkeeping before reaching the store.
    async fn append_history_events(
        &self,
        request: AppendHistoryEventsRequest,
    ) -> Result<(), StoreError>;

    /// Conditioned execution update (wraps the store).
    async fn update_workflow_execution(
        &self,
        request: UpdateWorkflowExecutionRequest,
    ) -> Result<(), StoreError>;

    /// Replaces the full mutable state under a condition.
    async fn reset_mutable_state(&self, request: ResetMutableStateRequest)
        -> Result<(), StoreError>;

    /// Wake watchers of this run's history.
    fn notify_new_history_event(&self, notification: HistoryEventNotification);
}
