// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution context: transactional coordinator for one workflow run.
//!
//! A context owns the cached [`MutableState`] of a single
//! `(domain, workflow, run)` and translates store outcomes into
//! workflow-level semantics: success, conflict, transient retryable
//! failure, or fatal. Exactly one context exists per run on the owning
//! shard, and its cache hands it out behind a lock, so every operation
//! here runs single-writer.
//!
//! On any commit error the cached state is discarded; the in-memory view
//! can no longer be trusted against the store, and the next operation
//! reloads.

use crate::error::EngineError;
use crate::history_builder::HistoryBuilder;
use crate::mutable_state::MutableState;
use crate::serialization;
use crate::shard::{HistoryEventNotification, ShardContext};
use chronicle_core::{
    Clock, DomainId, HistoryEvent, TimerTask, TransferTask, WorkflowExecution,
};
use chronicle_store::{
    retry, AppendHistoryEventsRequest, DeleteWorkflowHistoryRequest, ExecutionStore,
    GetWorkflowExecutionRequest, ResetMutableStateRequest, StoreError,
    UpdateWorkflowExecutionRequest, WorkflowState,
};
use smol_str::SmolStr;
use std::sync::Arc;

/// Seconds per day, for converting a domain's retention into the TTL the
/// store attaches to a finished execution's current-run pointer.
pub const SECONDS_IN_DAY: i64 = 86_400;

/// A pre-formed event batch from a remote cluster, applied verbatim.
#[derive(Debug, Clone)]
pub struct ReplicateRequest {
    pub source_cluster: SmolStr,
    pub version: i64,
    pub history: Vec<HistoryEvent>,
}

pub struct ExecutionContext<C: Clock> {
    domain_id: DomainId,
    execution: WorkflowExecution,
    shard: Arc<dyn ShardContext>,
    store: Arc<dyn ExecutionStore>,
    clock: C,
    mutable_state: Option<MutableState<C>>,
    /// The run's `next_event_id` as of the last load or successful
    /// commit; every conditioned write carries it.
    update_condition: i64,
    /// Timer-deletion directive consumed by the next commit only.
    delete_timer_task: Option<TimerTask>,
}

impl<C: Clock> ExecutionContext<C> {
    pub fn new(
        domain_id: DomainId,
        execution: WorkflowExecution,
        shard: Arc<dyn ShardContext>,
        store: Arc<dyn ExecutionStore>,
        clock: C,
    ) -> Self {
        Self {
            domain_id,
            execution,
            shard,
            store,
            clock,
            mutable_state: None,
            update_condition: 0,
            delete_timer_task: None,
        }
    }

    pub fn execution(&self) -> &WorkflowExecution {
        &self.execution
    }

    /// The condition the next conditioned write will carry.
    pub fn update_condition(&self) -> i64 {
        self.update_condition
    }

    /// The cached state, if loaded. Callers mutate the state through
    /// this between `load` and `update`.
    pub fn mutable_state(&mut self) -> Option<&mut MutableState<C>> {
        self.mutable_state.as_mut()
    }

    /// Fetch (or reuse) the run's mutable state.
    ///
    /// A cache hit only refreshes the replication version; a miss fetches
    /// from the store under the transient-retry policy and records the
    /// stored `next_event_id` as the condition for the next write.
    pub async fn load(&mut self) -> Result<&mut MutableState<C>, EngineError> {
        if self.mutable_state.is_none() {
            let request = GetWorkflowExecutionRequest {
                domain_id: self.domain_id.clone(),
                execution: self.execution.clone(),
            };
            let response = self.get_with_retry(request).await.map_err(|err| {
                tracing::error!(
                    workflow_id = %self.execution.workflow_id,
                    run_id = %self.execution.run_id,
                    error = %err,
                    "failed to load workflow execution"
                );
                err
            })?;
            let state = MutableState::from_snapshot(response.snapshot, self.clock.clone());
            self.update_condition = state.next_event_id();
            self.mutable_state = Some(state);
        }
        self.update_replication_version()?;
        self.mutable_state.as_mut().ok_or(EngineError::StateNotLoaded)
    }

    /// Stamp the domain's current failover version onto a running,
    /// replicated workflow. Terminal runs keep the version they closed
    /// under.
    fn update_replication_version(&mut self) -> Result<(), EngineError> {
        let Some(state) = self.mutable_state.as_mut() else {
            return Ok(());
        };
        if !self.shard.cluster_metadata().is_global_domain_enabled()
            || state.replication_state().is_none()
            || !state.is_workflow_running()
        {
            return Ok(());
        }
        let entry = self.shard.domain_cache().get_domain_by_id(&self.domain_id)?;
        state.update_replication_state_version(entry.failover_version);
        Ok(())
    }

    /// Flush the open update session to the store.
    pub async fn update(
        &mut self,
        transfer_tasks: Vec<TransferTask>,
        timer_tasks: Vec<TimerTask>,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        let (create_replication_task, last_write_version) = match self.mutable_state.as_ref() {
            Some(state) => (state.replication_state().is_some(), state.current_version()),
            None => return Err(EngineError::StateNotLoaded),
        };
        self.commit(
            None,
            transfer_tasks,
            timer_tasks,
            create_replication_task,
            None,
            last_write_version,
            transaction_id,
        )
        .await
    }

    /// Write the caller's execution-context blob, then flush.
    ///
    /// The blob lands on the in-memory state before the commit boundary;
    /// callers must only reach this through the context's lock so no
    /// other path can observe the uncommitted value.
    pub async fn update_with_context(
        &mut self,
        context: Vec<u8>,
        transfer_tasks: Vec<TransferTask>,
        timer_tasks: Vec<TimerTask>,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        match self.mutable_state.as_mut() {
            Some(state) => state.set_execution_context(context),
            None => return Err(EngineError::StateNotLoaded),
        }
        self.update(transfer_tasks, timer_tasks, transaction_id).await
    }

    /// Record a timer-deletion directive for the next commit, then flush.
    pub async fn update_with_delete_timer(
        &mut self,
        delete_timer_task: TimerTask,
        transfer_tasks: Vec<TransferTask>,
        timer_tasks: Vec<TimerTask>,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        self.delete_timer_task = Some(delete_timer_task);
        self.update(transfer_tasks, timer_tasks, transaction_id).await
    }

    /// Apply a pre-formed event batch from a remote cluster.
    ///
    /// The remote batch is authoritative: `next_event_id` jumps to
    /// `last_event_id + 1` and the supplied events are appended verbatim
    /// instead of anything generated locally. No replication task is
    /// produced for an apply.
    pub async fn replicate(
        &mut self,
        request: ReplicateRequest,
        transfer_tasks: Vec<TransferTask>,
        timer_tasks: Vec<TimerTask>,
        last_event_id: i64,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        match self.mutable_state.as_mut() {
            Some(state) => state.set_next_event_id(last_event_id + 1),
            None => return Err(EngineError::StateNotLoaded),
        }
        let builder = HistoryBuilder::from_events(request.history);
        self.commit(
            Some(builder),
            transfer_tasks,
            timer_tasks,
            false,
            Some(request.source_cluster),
            request.version,
            transaction_id,
        )
        .await
    }

    /// Close the current run as continued-as-new and start its successor.
    ///
    /// The successor's initial history is appended first; the current
    /// run's terminal state, tasks, and bridging context blob then commit
    /// in one conditioned write. If that second step fails, the
    /// just-appended successor history is orphaned — it is deleted
    /// best-effort before the error surfaces.
    pub async fn continue_as_new(
        &mut self,
        context: Vec<u8>,
        mut new_state: MutableState<C>,
        transfer_tasks: Vec<TransferTask>,
        timer_tasks: Vec<TimerTask>,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        let new_execution = WorkflowExecution::new(
            new_state.execution_info().workflow_id.clone(),
            new_state.execution_info().run_id.clone(),
        );
        self.continue_as_new_helper(&mut new_state, transaction_id).await?;

        if let Err(err) =
            self.update_with_context(context, transfer_tasks, timer_tasks, transaction_id).await
        {
            let delete = DeleteWorkflowHistoryRequest {
                domain_id: self.domain_id.clone(),
                execution: new_execution.clone(),
            };
            if let Err(cleanup) = self.store.delete_workflow_history(delete).await {
                tracing::error!(
                    workflow_id = %new_execution.workflow_id,
                    new_run_id = %new_execution.run_id,
                    error = %cleanup,
                    "failed to delete orphaned continue-as-new history"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    /// Replication-path half of continue-as-new: append the successor's
    /// initial history only. The old run is persisted separately by the
    /// apply that carried the continued-as-new event.
    pub async fn replicate_continue_as_new(
        &mut self,
        mut new_state: MutableState<C>,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        self.continue_as_new_helper(&mut new_state, transaction_id).await
    }

    async fn continue_as_new_helper(
        &self,
        new_state: &mut MutableState<C>,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        let new_execution = WorkflowExecution::new(
            new_state.execution_info().workflow_id.clone(),
            new_state.execution_info().run_id.clone(),
        );
        let updates = new_state.close_update_session()?;
        if !updates.builder.has_events() {
            return Err(EngineError::EmptyInitialHistory);
        }
        self.append_batch(&new_execution, updates.builder.history(), false, transaction_id).await
    }

    /// Replace the run's mutable state with a rebuilt snapshot, then
    /// reload from the store so the cache reflects what was accepted.
    pub async fn reset(
        &mut self,
        reset_state: MutableState<C>,
    ) -> Result<&mut MutableState<C>, EngineError> {
        let request = ResetMutableStateRequest {
            condition: self.update_condition,
            snapshot: reset_state.reset_snapshot(),
        };
        let result = self.reset_with_retry(request).await;
        if let Err(err) = result {
            self.clear();
            return Err(match err {
                StoreError::ConditionFailed { .. } => EngineError::Conflict,
                other => {
                    tracing::error!(
                        workflow_id = %self.execution.workflow_id,
                        run_id = %self.execution.run_id,
                        update_condition = self.update_condition,
                        error = %other,
                        "reset mutable state failed"
                    );
                    EngineError::Store(other)
                }
            });
        }
        self.clear();
        self.load().await
    }

    /// Drop the cached state. The next operation reloads from the store.
    pub fn clear(&mut self) {
        self.mutable_state = None;
    }

    /// The commit path shared by update, replicate, and continue-as-new.
    ///
    /// Any error leaves the context empty (the state was taken out and is
    /// not put back), so the failure guard holds for every exit.
    #[allow(clippy::too_many_arguments)]
    async fn commit(
        &mut self,
        external_builder: Option<HistoryBuilder>,
        transfer_tasks: Vec<TransferTask>,
        timer_tasks: Vec<TimerTask>,
        create_replication_task: bool,
        source_cluster: Option<SmolStr>,
        last_write_version: i64,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        let mut state = self.mutable_state.take().ok_or(EngineError::StateNotLoaded)?;
        self.commit_inner(
            &mut state,
            external_builder,
            transfer_tasks,
            timer_tasks,
            create_replication_task,
            source_cluster,
            last_write_version,
            transaction_id,
        )
        .await?;
        self.mutable_state = Some(state);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn commit_inner(
        &mut self,
        state: &mut MutableState<C>,
        external_builder: Option<HistoryBuilder>,
        mut transfer_tasks: Vec<TransferTask>,
        mut timer_tasks: Vec<TimerTask>,
        create_replication_task: bool,
        source_cluster: Option<SmolStr>,
        last_write_version: i64,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        let mut updates = state.close_update_session()?;

        // Closing the session may flush buffered events and move
        // next_event_id, so the replication stamp happens only now.
        if state.replication_state().is_some() {
            let last_event_id = state.next_event_id() - 1;
            state.update_replication_state_last_event_id(
                source_cluster.as_deref(),
                last_write_version,
                last_event_id,
            );
        }

        // A caller-supplied builder (replication apply) wins over the
        // session's own events.
        let builder = match external_builder {
            Some(external) => external,
            None => std::mem::take(&mut updates.builder),
        };

        if builder.has_events() {
            // Transient batch first, main batch second, same transaction.
            if builder.has_transient_events() {
                self.append_batch(
                    &self.execution,
                    builder.transient_history(),
                    true,
                    transaction_id,
                )
                .await?;
            }
            self.append_batch(&self.execution, builder.history(), false, transaction_id).await?;
            if let Some(first) = builder.first_event() {
                state.set_last_first_event_id(first.event_id);
            }
        }

        let (finish_execution, finish_execution_ttl_secs) =
            if state.state() == WorkflowState::Completed {
                let entry = self.shard.domain_cache().get_domain_by_id(&self.domain_id)?;
                (true, i64::from(entry.retention_days) * SECONDS_IN_DAY)
            } else {
                (false, 0)
            };

        let mut replication_tasks = Vec::new();
        if create_replication_task {
            replication_tasks.push(state.create_replication_task());
        }

        // Stamp the current failover version so downstream processors can
        // route tasks across clusters.
        let version = state.current_version();
        for task in &mut transfer_tasks {
            task.version = version;
        }
        for task in &mut timer_tasks {
            task.version = version;
        }

        let request = UpdateWorkflowExecutionRequest {
            execution_info: state.execution_info().clone(),
            replication_state: state.replication_state().cloned(),
            condition: self.update_condition,
            transfer_tasks,
            timer_tasks,
            replication_tasks,
            delete_timer_task: self.delete_timer_task.take(),
            upsert_activities: updates.upsert_activities,
            delete_activity_ids: updates.delete_activity_ids,
            upsert_timers: updates.upsert_timers,
            delete_timer_ids: updates.delete_timer_ids,
            upsert_children: updates.upsert_children,
            delete_child_ids: updates.delete_child_ids,
            upsert_cancel_requests: updates.upsert_cancel_requests,
            delete_cancel_request_ids: updates.delete_cancel_request_ids,
            upsert_signals: updates.upsert_signals,
            delete_signal_ids: updates.delete_signal_ids,
            upsert_signal_requested_ids: updates.upsert_signal_requested_ids,
            delete_signal_requested_ids: updates.delete_signal_requested_ids,
            new_buffered_events: updates.new_buffered_events,
            clear_buffered_events: updates.clear_buffered_events,
            new_buffered_replication_batch: updates.new_buffered_replication_batch,
            deleted_buffered_replication_id: updates.deleted_buffered_replication_id,
            continue_as_new: updates.continue_as_new,
            finish_execution,
            finish_execution_ttl_secs,
        };

        if let Err(err) = self.update_with_retry(request).await {
            return Err(match err {
                StoreError::ConditionFailed { .. } => EngineError::Conflict,
                other => {
                    tracing::error!(
                        workflow_id = %self.execution.workflow_id,
                        run_id = %self.execution.run_id,
                        update_condition = self.update_condition,
                        error = %other,
                        "update workflow execution failed"
                    );
                    EngineError::Store(other)
                }
            });
        }

        self.update_condition = state.next_event_id();
        state.touch(self.clock.now());

        self.shard.notify_new_history_event(HistoryEventNotification {
            domain_id: self.domain_id.clone(),
            execution: self.execution.clone(),
            last_first_event_id: state.last_first_event_id(),
            next_event_id: state.next_event_id(),
            is_running: state.is_workflow_running(),
        });
        Ok(())
    }

    /// Serialize and append one contiguous batch via the shard.
    async fn append_batch(
        &self,
        execution: &WorkflowExecution,
        events: &[HistoryEvent],
        is_transient_batch: bool,
        transaction_id: i64,
    ) -> Result<(), EngineError> {
        let Some(first) = events.first() else {
            return Ok(());
        };
        let data = serialization::encode_events(events, self.shard.config().compression_level)
            .map_err(|err| {
                tracing::error!(
                    workflow_id = %execution.workflow_id,
                    run_id = %execution.run_id,
                    error = %err,
                    "failed to serialize history batch"
                );
                err
            })?;
        let request = AppendHistoryEventsRequest {
            domain_id: self.domain_id.clone(),
            execution: execution.clone(),
            first_event_id: first.event_id,
            transaction_id,
            is_transient_batch,
            event_count: events.len(),
            events: data,
        };
        match self.shard.append_history_events(request).await {
            Ok(()) => Ok(()),
            Err(StoreError::ConditionFailed { .. }) => Err(EngineError::Conflict),
            Err(err) => {
                tracing::error!(
                    workflow_id = %execution.workflow_id,
                    run_id = %execution.run_id,
                    first_event_id = first.event_id,
                    error = %err,
                    "history append failed"
                );
                Err(EngineError::Store(err))
            }
        }
    }

    async fn get_with_retry(
        &self,
        request: GetWorkflowExecutionRequest,
    ) -> Result<chronicle_store::GetWorkflowExecutionResponse, StoreError> {
        let policy = self.shard.config().persistence_retry.clone();
        let store = Arc::clone(&self.store);
        retry(&policy, StoreError::is_transient, move || {
            let store = Arc::clone(&store);
            let request = request.clone();
            async move { store.get_workflow_execution(request).await }
        })
        .await
    }

    async fn update_with_retry(
        &self,
        request: UpdateWorkflowExecutionRequest,
    ) -> Result<(), StoreError> {
        let policy = self.shard.config().persistence_retry.clone();
        let shard = Arc::clone(&self.shard);
        retry(&policy, StoreError::is_transient, move || {
            let shard = Arc::clone(&shard);
            let request = request.clone();
            async move { shard.update_workflow_execution(request).await }
        })
        .await
    }

    async fn reset_with_retry(&self, request: ResetMutableStateRequest) -> Result<(), StoreError> {
        let policy = self.shard.config().persistence_retry.clone();
        let shard = Arc::clone(&self.shard);
        retry(&policy, StoreError::is_transient, move || {
            let shard = Arc::clone(&shard);
            let request = request.clone();
            async move { shard.reset_mutable_state(request).await }
        })
        .await
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
