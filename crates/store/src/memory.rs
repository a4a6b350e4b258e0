// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory execution store with fault injection for tests

use crate::error::StoreError;
use crate::requests::{
    AppendHistoryEventsRequest, DeleteWorkflowHistoryRequest, GetWorkflowExecutionRequest,
    GetWorkflowExecutionResponse, ResetMutableStateRequest, UpdateWorkflowExecutionRequest,
};
use crate::store::ExecutionStore;
use crate::types::WorkflowSnapshot;
use async_trait::async_trait;
use chronicle_core::{DomainId, RunId, WorkflowId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

type Key = (DomainId, WorkflowId, RunId);

/// Store operations that faults can be injected against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Update,
    Append,
    Reset,
    DeleteHistory,
}

/// A single-shot injected failure, consumed by the next matching call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Timeout,
    Busy,
    Unavailable,
    ConditionFailed,
}

/// One appended history batch, as the store received it.
#[derive(Debug, Clone)]
pub struct StoredBatch {
    pub first_event_id: i64,
    pub transaction_id: i64,
    pub is_transient: bool,
    pub event_count: usize,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    executions: HashMap<Key, WorkflowSnapshot>,
    histories: HashMap<Key, Vec<StoredBatch>>,
    faults: HashMap<StoreOp, VecDeque<Fault>>,
    updates: Vec<UpdateWorkflowExecutionRequest>,
    appends: Vec<AppendHistoryEventsRequest>,
    deleted_histories: Vec<Key>,
    get_count: u64,
}

impl Inner {
    fn take_fault(&mut self, op: StoreOp, condition: i64) -> Result<(), StoreError> {
        let fault = self.faults.get_mut(&op).and_then(VecDeque::pop_front);
        match fault {
            None => Ok(()),
            Some(Fault::Timeout) => Err(StoreError::Timeout("injected".into())),
            Some(Fault::Busy) => Err(StoreError::Busy("injected".into())),
            Some(Fault::Unavailable) => Err(StoreError::Unavailable("injected".into())),
            Some(Fault::ConditionFailed) => {
                Err(StoreError::ConditionFailed { expected: condition, actual: condition + 1 })
            }
        }
    }
}

/// Condition-checked in-memory [`ExecutionStore`].
///
/// Mirrors the contract of a real backend closely enough for engine
/// tests: conditioned updates, per-run history batches, and injectable
/// transient/condition failures. Execution records are seeded directly
/// (`seed`); record creation is not part of the store contract.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    inner: Mutex<Inner>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a workflow execution fixture.
    pub fn seed(&self, snapshot: WorkflowSnapshot) {
        let info = &snapshot.execution_info;
        let key = (info.domain_id.clone(), info.workflow_id.clone(), info.run_id.clone());
        self.inner.lock().executions.insert(key, snapshot);
    }

    /// Queue a failure for the next call of `op`. Repeated calls queue
    /// repeated failures.
    pub fn inject_fault(&self, op: StoreOp, fault: Fault) {
        self.inner.lock().faults.entry(op).or_default().push_back(fault);
    }

    pub fn snapshot(
        &self,
        domain_id: &DomainId,
        workflow_id: &WorkflowId,
        run_id: &RunId,
    ) -> Option<WorkflowSnapshot> {
        let key = (domain_id.clone(), workflow_id.clone(), run_id.clone());
        self.inner.lock().executions.get(&key).cloned()
    }

    /// All appended batches for a run, in append order.
    pub fn history(
        &self,
        domain_id: &DomainId,
        workflow_id: &WorkflowId,
        run_id: &RunId,
    ) -> Vec<StoredBatch> {
        let key = (domain_id.clone(), workflow_id.clone(), run_id.clone());
        self.inner.lock().histories.get(&key).cloned().unwrap_or_default()
    }

    /// Successful update requests, in commit order.
    pub fn updates(&self) -> Vec<UpdateWorkflowExecutionRequest> {
        self.inner.lock().updates.clone()
    }

    /// Successful append requests, in call order.
    pub fn appends(&self) -> Vec<AppendHistoryEventsRequest> {
        self.inner.lock().appends.clone()
    }

    pub fn deleted_histories(&self) -> Vec<(DomainId, WorkflowId, RunId)> {
        self.inner.lock().deleted_histories.clone()
    }

    /// Number of get calls served (including injected failures).
    pub fn get_count(&self) -> u64 {
        self.inner.lock().get_count
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn get_workflow_execution(
        &self,
        request: GetWorkflowExecutionRequest,
    ) -> Result<GetWorkflowExecutionResponse, StoreError> {
        let mut inner = self.inner.lock();
        inner.get_count += 1;
        inner.take_fault(StoreOp::Get, 0)?;
        let key = (
            request.domain_id.clone(),
            request.execution.workflow_id.clone(),
            request.execution.run_id.clone(),
        );
        let snapshot = inner
            .executions
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(request.execution.to_string()))?;
        Ok(GetWorkflowExecutionResponse { snapshot })
    }

    async fn update_workflow_execution(
        &self,
        request: UpdateWorkflowExecutionRequest,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault(StoreOp::Update, request.condition)?;
        let info = &request.execution_info;
        let key = (info.domain_id.clone(), info.workflow_id.clone(), info.run_id.clone());
        let stored = inner
            .executions
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", info.workflow_id, info.run_id)))?;

        let actual = stored.execution_info.next_event_id;
        if actual != request.condition {
            return Err(StoreError::ConditionFailed { expected: request.condition, actual });
        }

        stored.execution_info = request.execution_info.clone();
        stored.replication_state = request.replication_state.clone();

        for activity in &request.upsert_activities {
            stored.activities.insert(activity.schedule_id, activity.clone());
        }
        for id in &request.delete_activity_ids {
            stored.activities.remove(id);
        }
        for timer in &request.upsert_timers {
            stored.timers.insert(timer.timer_id.clone(), timer.clone());
        }
        for id in &request.delete_timer_ids {
            stored.timers.remove(id);
        }
        for child in &request.upsert_children {
            stored.children.insert(child.initiated_id, child.clone());
        }
        for id in &request.delete_child_ids {
            stored.children.remove(id);
        }
        for cancel in &request.upsert_cancel_requests {
            stored.cancel_requests.insert(cancel.initiated_id, cancel.clone());
        }
        for id in &request.delete_cancel_request_ids {
            stored.cancel_requests.remove(id);
        }
        for signal in &request.upsert_signals {
            stored.signals.insert(signal.initiated_id, signal.clone());
        }
        for id in &request.delete_signal_ids {
            stored.signals.remove(id);
        }
        for id in &request.upsert_signal_requested_ids {
            stored.signal_requested_ids.insert(id.clone());
        }
        for id in &request.delete_signal_requested_ids {
            stored.signal_requested_ids.remove(id);
        }

        if request.clear_buffered_events {
            stored.buffered_events.clear();
        }
        stored.buffered_events.extend(request.new_buffered_events.iter().cloned());
        if let Some(batch) = &request.new_buffered_replication_batch {
            stored.buffered_replication.insert(batch.first_event_id, batch.clone());
        }
        if let Some(id) = request.deleted_buffered_replication_id {
            stored.buffered_replication.remove(&id);
        }

        inner.updates.push(request);
        Ok(())
    }

    async fn append_history_events(
        &self,
        request: AppendHistoryEventsRequest,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault(StoreOp::Append, request.first_event_id)?;
        let key = (
            request.domain_id.clone(),
            request.execution.workflow_id.clone(),
            request.execution.run_id.clone(),
        );
        let batches = inner.histories.entry(key).or_default();
        // A batch re-written at an existing offset supersedes the earlier
        // one: the failed transaction that produced it never advanced the
        // execution record, so the newest transaction wins.
        if !request.is_transient_batch {
            batches.retain(|b| b.is_transient || b.first_event_id != request.first_event_id);
        }
        batches.push(StoredBatch {
            first_event_id: request.first_event_id,
            transaction_id: request.transaction_id,
            is_transient: request.is_transient_batch,
            event_count: request.event_count,
            data: request.events.clone(),
        });
        inner.appends.push(request);
        Ok(())
    }

    async fn reset_mutable_state(
        &self,
        request: ResetMutableStateRequest,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault(StoreOp::Reset, request.condition)?;
        let info = &request.snapshot.execution_info;
        let key = (info.domain_id.clone(), info.workflow_id.clone(), info.run_id.clone());
        let stored = inner
            .executions
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", info.workflow_id, info.run_id)))?;
        let actual = stored.execution_info.next_event_id;
        if actual != request.condition {
            return Err(StoreError::ConditionFailed { expected: request.condition, actual });
        }
        *stored = request.snapshot;
        Ok(())
    }

    async fn delete_workflow_history(
        &self,
        request: DeleteWorkflowHistoryRequest,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.take_fault(StoreOp::DeleteHistory, 0)?;
        let key = (
            request.domain_id.clone(),
            request.execution.workflow_id.clone(),
            request.execution.run_id.clone(),
        );
        inner.histories.remove(&key);
        inner.deleted_histories.push(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
