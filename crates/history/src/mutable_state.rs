// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory mutable state of one workflow run.
//!
//! `MutableState` is the authoritative current view of an execution,
//! distinct from its append-only history. Mutations between loads and
//! commits accumulate in an update session; closing the session flushes
//! buffered events and yields the deltas one conditioned store write
//! carries.

use crate::history_builder::HistoryBuilder;
use chronicle_core::{
    Clock, DomainId, EventAttributes, HistoryEvent, ReplicationInfo, ReplicationTask,
    WorkflowExecution, EMPTY_VERSION,
};
use chronicle_store::{
    ActivityInfo, BufferedReplicationBatch, ChildExecutionInfo, ExecutionInfo, ReplicationState,
    RequestCancelInfo, SignalInfo, TimerInfo, WorkflowSnapshot, WorkflowState,
};
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    /// The session's history batch does not linearly extend the persisted
    /// history.
    #[error("history batch is not a linear extension: expected event {expected}, found {found}")]
    NonContiguousHistory { expected: i64, found: i64 },
}

/// Deltas accumulated between session opens. Drained exactly once by
/// `close_update_session`.
#[derive(Debug, Default)]
struct UpdateSession {
    builder: HistoryBuilder,
    flush_buffered: bool,
    upsert_activities: HashMap<i64, ActivityInfo>,
    delete_activity_ids: HashSet<i64>,
    upsert_timers: HashMap<SmolStr, TimerInfo>,
    delete_timer_ids: HashSet<SmolStr>,
    upsert_children: HashMap<i64, ChildExecutionInfo>,
    delete_child_ids: HashSet<i64>,
    upsert_cancel_requests: HashMap<i64, RequestCancelInfo>,
    delete_cancel_request_ids: HashSet<i64>,
    upsert_signals: HashMap<i64, SignalInfo>,
    delete_signal_ids: HashSet<i64>,
    upsert_signal_requested_ids: HashSet<SmolStr>,
    delete_signal_requested_ids: HashSet<SmolStr>,
    new_buffered_events: Vec<HistoryEvent>,
    new_buffered_replication_batch: Option<BufferedReplicationBatch>,
    deleted_buffered_replication_id: Option<i64>,
    continue_as_new: bool,
}

/// Everything one closed update session hands to the commit: the history
/// batches plus every upsert/delete delta for the conditioned write.
#[derive(Debug, Default)]
pub struct SessionUpdates {
    pub builder: HistoryBuilder,
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
}

#[derive(Debug)]
pub struct MutableState<C: Clock> {
    info: ExecutionInfo,
    replication_state: Option<ReplicationState>,
    activities: HashMap<i64, ActivityInfo>,
    timers: HashMap<SmolStr, TimerInfo>,
    children: HashMap<i64, ChildExecutionInfo>,
    cancel_requests: HashMap<i64, RequestCancelInfo>,
    signals: HashMap<i64, SignalInfo>,
    signal_requested_ids: HashSet<SmolStr>,
    buffered_events: Vec<HistoryEvent>,
    buffered_replication: HashMap<i64, BufferedReplicationBatch>,
    session: UpdateSession,
    clock: C,
}

impl<C: Clock> MutableState<C> {
    /// Fresh state for a run with no events yet.
    pub fn new(domain_id: DomainId, execution: WorkflowExecution, clock: C) -> Self {
        let info =
            ExecutionInfo::new(domain_id, execution.workflow_id, execution.run_id, clock.now());
        Self {
            info,
            replication_state: None,
            activities: HashMap::new(),
            timers: HashMap::new(),
            children: HashMap::new(),
            cancel_requests: HashMap::new(),
            signals: HashMap::new(),
            signal_requested_ids: HashSet::new(),
            buffered_events: Vec::new(),
            buffered_replication: HashMap::new(),
            session: UpdateSession::default(),
            clock,
        }
    }

    /// Rehydrate from a stored snapshot.
    pub fn from_snapshot(snapshot: WorkflowSnapshot, clock: C) -> Self {
        Self {
            info: snapshot.execution_info,
            replication_state: snapshot.replication_state,
            activities: snapshot.activities,
            timers: snapshot.timers,
            children: snapshot.children,
            cancel_requests: snapshot.cancel_requests,
            signals: snapshot.signals,
            signal_requested_ids: snapshot.signal_requested_ids,
            buffered_events: snapshot.buffered_events,
            buffered_replication: snapshot.buffered_replication,
            session: UpdateSession::default(),
            clock,
        }
    }

    /// Attach replication bookkeeping (globally replicated domains only).
    pub fn with_replication(mut self, start_version: i64) -> Self {
        self.replication_state = Some(ReplicationState::new(start_version));
        self
    }

    // -- capability accessors --

    pub fn execution_info(&self) -> &ExecutionInfo {
        &self.info
    }

    pub fn replication_state(&self) -> Option<&ReplicationState> {
        self.replication_state.as_ref()
    }

    pub fn state(&self) -> WorkflowState {
        self.info.state
    }

    pub fn is_workflow_running(&self) -> bool {
        self.info.state.is_running()
    }

    pub fn next_event_id(&self) -> i64 {
        self.info.next_event_id
    }

    pub fn last_first_event_id(&self) -> i64 {
        self.info.last_first_event_id
    }

    /// Failover version stamped on everything this state generates.
    pub fn current_version(&self) -> i64 {
        match &self.replication_state {
            Some(rs) => rs.current_version,
            None => EMPTY_VERSION,
        }
    }

    pub fn pending_activities(&self) -> &HashMap<i64, ActivityInfo> {
        &self.activities
    }

    pub fn pending_timers(&self) -> &HashMap<SmolStr, TimerInfo> {
        &self.timers
    }

    pub fn buffered_event_count(&self) -> usize {
        self.buffered_events.len() + self.session.new_buffered_events.len()
    }

    // -- history mutation --

    /// Append a history event, assigning it the next event ID.
    ///
    /// Terminal attributes transition the workflow to `Completed`;
    /// a start transitions it to `Running`.
    pub fn add_event(&mut self, attributes: EventAttributes) -> i64 {
        let event_id = self.info.next_event_id;
        match &attributes {
            EventAttributes::WorkflowStarted { workflow_type, task_list, .. } => {
                self.info.state = WorkflowState::Running;
                self.info.workflow_type = workflow_type.clone();
                self.info.task_list = task_list.clone();
            }
            EventAttributes::WorkflowContinuedAsNew { .. } => {
                self.info.state = WorkflowState::Completed;
                self.session.continue_as_new = true;
            }
            attrs if attrs.is_terminal() => {
                self.info.state = WorkflowState::Completed;
            }
            _ => {}
        }
        let event =
            HistoryEvent::new(event_id, self.current_version(), self.clock.epoch_ms(), attributes);
        self.session.builder.push(event);
        self.info.next_event_id += 1;
        event_id
    }

    /// Append a speculative event. Transient events take IDs past the
    /// committed range without advancing `next_event_id`; they are
    /// persisted as a separate discardable batch.
    pub fn add_transient_event(&mut self, attributes: EventAttributes) -> i64 {
        let offset = self.session.builder.transient_history().len() as i64;
        let event_id = self.info.next_event_id + offset;
        let event =
            HistoryEvent::new(event_id, self.current_version(), self.clock.epoch_ms(), attributes);
        self.session.builder.push_transient(event);
        event_id
    }

    /// Hold an event without assigning it an ID yet (e.g. a signal that
    /// arrives while a decision is in flight). Buffered events get their
    /// IDs when a later session flushes them.
    pub fn buffer_event(&mut self, attributes: EventAttributes) {
        let event = HistoryEvent::new(0, self.current_version(), self.clock.epoch_ms(), attributes);
        self.session.new_buffered_events.push(event);
    }

    /// Ask the next close to drain all buffered events into the history,
    /// assigning their IDs.
    pub fn flush_buffered_events(&mut self) {
        self.session.flush_buffered = true;
    }

    // -- pending-record mutation --

    pub fn upsert_activity(&mut self, activity: ActivityInfo) {
        self.session.delete_activity_ids.remove(&activity.schedule_id);
        self.session.upsert_activities.insert(activity.schedule_id, activity.clone());
        self.activities.insert(activity.schedule_id, activity);
    }

    pub fn delete_activity(&mut self, schedule_id: i64) {
        self.session.upsert_activities.remove(&schedule_id);
        self.session.delete_activity_ids.insert(schedule_id);
        self.activities.remove(&schedule_id);
    }

    pub fn upsert_timer(&mut self, timer: TimerInfo) {
        self.session.delete_timer_ids.remove(&timer.timer_id);
        self.session.upsert_timers.insert(timer.timer_id.clone(), timer.clone());
        self.timers.insert(timer.timer_id.clone(), timer);
    }

    pub fn delete_timer(&mut self, timer_id: &str) {
        let key = SmolStr::from(timer_id);
        self.session.upsert_timers.remove(&key);
        self.session.delete_timer_ids.insert(key.clone());
        self.timers.remove(&key);
    }

    pub fn upsert_child_execution(&mut self, child: ChildExecutionInfo) {
        self.session.delete_child_ids.remove(&child.initiated_id);
        self.session.upsert_children.insert(child.initiated_id, child.clone());
        self.children.insert(child.initiated_id, child);
    }

    pub fn delete_child_execution(&mut self, initiated_id: i64) {
        self.session.upsert_children.remove(&initiated_id);
        self.session.delete_child_ids.insert(initiated_id);
        self.children.remove(&initiated_id);
    }

    pub fn upsert_cancel_request(&mut self, cancel: RequestCancelInfo) {
        self.session.delete_cancel_request_ids.remove(&cancel.initiated_id);
        self.session.upsert_cancel_requests.insert(cancel.initiated_id, cancel.clone());
        self.cancel_requests.insert(cancel.initiated_id, cancel);
    }

    pub fn delete_cancel_request(&mut self, initiated_id: i64) {
        self.session.upsert_cancel_requests.remove(&initiated_id);
        self.session.delete_cancel_request_ids.insert(initiated_id);
        self.cancel_requests.remove(&initiated_id);
    }

    pub fn upsert_signal(&mut self, signal: SignalInfo) {
        self.session.delete_signal_ids.remove(&signal.initiated_id);
        self.session.upsert_signals.insert(signal.initiated_id, signal.clone());
        self.signals.insert(signal.initiated_id, signal);
    }

    pub fn delete_signal(&mut self, initiated_id: i64) {
        self.session.upsert_signals.remove(&initiated_id);
        self.session.delete_signal_ids.insert(initiated_id);
        self.signals.remove(&initiated_id);
    }

    pub fn add_signal_requested_id(&mut self, request_id: impl AsRef<str>) {
        let id = SmolStr::from(request_id.as_ref());
        self.session.delete_signal_requested_ids.remove(&id);
        self.session.upsert_signal_requested_ids.insert(id.clone());
        self.signal_requested_ids.insert(id);
    }

    pub fn delete_signal_requested_id(&mut self, request_id: &str) {
        let id = SmolStr::from(request_id);
        self.session.upsert_signal_requested_ids.remove(&id);
        self.session.delete_signal_requested_ids.insert(id.clone());
        self.signal_requested_ids.remove(&id);
    }

    /// Hold a replicated batch that arrived out of order (apply path).
    pub fn buffer_replication_batch(&mut self, batch: BufferedReplicationBatch) {
        self.buffered_replication.insert(batch.first_event_id, batch.clone());
        self.session.new_buffered_replication_batch = Some(batch);
    }

    pub fn delete_buffered_replication_batch(&mut self, first_event_id: i64) {
        self.buffered_replication.remove(&first_event_id);
        self.session.deleted_buffered_replication_id = Some(first_event_id);
    }

    // -- replication & context plumbing (engine use) --

    /// Overwrite the next event ID. The replication apply path sets this
    /// from the remote batch, which is authoritative.
    pub fn set_next_event_id(&mut self, next_event_id: i64) {
        self.info.next_event_id = next_event_id;
    }

    pub fn set_last_first_event_id(&mut self, event_id: i64) {
        self.info.last_first_event_id = event_id;
    }

    pub fn set_execution_context(&mut self, context: Vec<u8>) {
        self.info.execution_context = Some(context);
    }

    pub fn touch(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.info.last_updated = now;
    }

    /// Stamp the domain's current failover version.
    pub fn update_replication_state_version(&mut self, version: i64) {
        if let Some(rs) = &mut self.replication_state {
            rs.current_version = version;
        }
    }

    /// Record the last locally visible write. `source_cluster` is set only
    /// when applying a remote batch; it also moves the current version
    /// forward to the remote writer's.
    pub fn update_replication_state_last_event_id(
        &mut self,
        source_cluster: Option<&str>,
        last_write_version: i64,
        last_event_id: i64,
    ) {
        if let Some(rs) = &mut self.replication_state {
            rs.last_write_version = last_write_version;
            rs.last_write_event_id = last_event_id;
            if let Some(cluster) = source_cluster {
                rs.current_version = last_write_version;
                rs.last_replication_info.insert(
                    SmolStr::from(cluster),
                    ReplicationInfo { version: last_write_version, last_event_id },
                );
            }
        }
    }

    /// One task shipping the most recent batch to replica clusters.
    pub fn create_replication_task(&self) -> ReplicationTask {
        let (version, last_replication_info) = match &self.replication_state {
            Some(rs) => (rs.current_version, rs.last_replication_info.clone()),
            None => (EMPTY_VERSION, HashMap::new()),
        };
        ReplicationTask {
            first_event_id: self.info.last_first_event_id,
            next_event_id: self.info.next_event_id,
            version,
            last_replication_info,
        }
    }

    // -- session lifecycle --

    /// Close the open update session: flush buffered events into the
    /// history (assigning their IDs, which moves `next_event_id`), verify
    /// the batch linearly extends the persisted history, and drain all
    /// deltas. The state is ready for a fresh session afterwards.
    pub fn close_update_session(&mut self) -> Result<SessionUpdates, StateError> {
        let mut clear_buffered_events = false;
        if self.session.flush_buffered {
            let persisted = std::mem::take(&mut self.buffered_events);
            clear_buffered_events = !persisted.is_empty();
            let fresh = std::mem::take(&mut self.session.new_buffered_events);
            for mut event in persisted.into_iter().chain(fresh) {
                event.event_id = self.info.next_event_id;
                event.version = self.current_version();
                self.session.builder.push(event);
                self.info.next_event_id += 1;
            }
        }

        let session = std::mem::take(&mut self.session);
        self.verify_linear_extension(&session.builder)?;

        // Buffered events that were not flushed stay buffered in memory
        // and travel to the store in this update.
        self.buffered_events.extend(session.new_buffered_events.iter().cloned());

        Ok(SessionUpdates {
            builder: session.builder,
            upsert_activities: session.upsert_activities.into_values().collect(),
            delete_activity_ids: session.delete_activity_ids.into_iter().collect(),
            upsert_timers: session.upsert_timers.into_values().collect(),
            delete_timer_ids: session.delete_timer_ids.into_iter().collect(),
            upsert_children: session.upsert_children.into_values().collect(),
            delete_child_ids: session.delete_child_ids.into_iter().collect(),
            upsert_cancel_requests: session.upsert_cancel_requests.into_values().collect(),
            delete_cancel_request_ids: session.delete_cancel_request_ids.into_iter().collect(),
            upsert_signals: session.upsert_signals.into_values().collect(),
            delete_signal_ids: session.delete_signal_ids.into_iter().collect(),
            upsert_signal_requested_ids: session
                .upsert_signal_requested_ids
                .into_iter()
                .collect(),
            delete_signal_requested_ids: session
                .delete_signal_requested_ids
                .into_iter()
                .collect(),
            new_buffered_events: session.new_buffered_events,
            clear_buffered_events,
            new_buffered_replication_batch: session.new_buffered_replication_batch,
            deleted_buffered_replication_id: session.deleted_buffered_replication_id,
            continue_as_new: session.continue_as_new,
        })
    }

    /// The batch must be contiguous and end exactly at `next_event_id`.
    fn verify_linear_extension(&self, builder: &HistoryBuilder) -> Result<(), StateError> {
        let events = builder.history();
        let Some(last) = events.last() else { return Ok(()) };
        for pair in events.windows(2) {
            if pair[1].event_id != pair[0].event_id + 1 {
                return Err(StateError::NonContiguousHistory {
                    expected: pair[0].event_id + 1,
                    found: pair[1].event_id,
                });
            }
        }
        if last.event_id != self.info.next_event_id - 1 {
            return Err(StateError::NonContiguousHistory {
                expected: self.info.next_event_id - 1,
                found: last.event_id,
            });
        }
        Ok(())
    }

    /// Full snapshot of the current state, for conflict-resolution resets.
    pub fn reset_snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            execution_info: self.info.clone(),
            replication_state: self.replication_state.clone(),
            activities: self.activities.clone(),
            timers: self.timers.clone(),
            children: self.children.clone(),
            cancel_requests: self.cancel_requests.clone(),
            signals: self.signals.clone(),
            signal_requested_ids: self.signal_requested_ids.clone(),
            buffered_events: self.buffered_events.clone(),
            buffered_replication: self.buffered_replication.clone(),
        }
    }
}

#[cfg(test)]
#[path = "mutable_state_tests.rs"]
mod tests;
