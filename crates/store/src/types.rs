// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted record shapes for workflow executions

use chrono::{DateTime, Utc};
use chronicle_core::{DomainId, HistoryEvent, ReplicationInfo, RunId, WorkflowId, EMPTY_VERSION};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};

/// Lifecycle state of a workflow execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Record exists but the start has not been dispatched yet
    Created,
    Running,
    Completed,
}

impl WorkflowState {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Created | Self::Running)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// The mutable, current-state row of one workflow execution, distinct
/// from its append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub domain_id: DomainId,
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
    pub workflow_type: SmolStr,
    pub task_list: SmolStr,
    pub state: WorkflowState,
    /// ID the next history event will receive; the optimistic-concurrency
    /// token for every conditioned write.
    pub next_event_id: i64,
    /// First event ID of the most recently appended history batch.
    pub last_first_event_id: i64,
    /// Opaque caller blob carried across decisions and continue-as-new.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_context: Option<Vec<u8>>,
    pub execution_timeout_secs: u32,
    pub task_timeout_secs: u32,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ExecutionInfo {
    /// Fresh record for a run that has no events yet.
    pub fn new(
        domain_id: DomainId,
        workflow_id: WorkflowId,
        run_id: RunId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            domain_id,
            workflow_id,
            run_id,
            workflow_type: SmolStr::default(),
            task_list: SmolStr::default(),
            state: WorkflowState::Created,
            next_event_id: 1,
            last_first_event_id: 0,
            execution_context: None,
            execution_timeout_secs: 0,
            task_timeout_secs: 0,
            started_at,
            last_updated: started_at,
        }
    }
}

/// Cross-cluster failover bookkeeping for globally replicated domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationState {
    /// Failover version stamped on events generated by this cluster.
    pub current_version: i64,
    /// Version the run started under.
    pub start_version: i64,
    pub last_write_version: i64,
    pub last_write_event_id: i64,
    pub last_replication_info: HashMap<SmolStr, ReplicationInfo>,
}

impl ReplicationState {
    pub fn new(start_version: i64) -> Self {
        Self {
            current_version: start_version,
            start_version,
            last_write_version: EMPTY_VERSION,
            last_write_event_id: 0,
            last_replication_info: HashMap::new(),
        }
    }
}

/// A scheduled-but-unresolved activity, keyed by its schedule event ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInfo {
    pub schedule_id: i64,
    pub activity_id: SmolStr,
    pub activity_type: SmolStr,
    pub version: i64,
    pub scheduled_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    pub heartbeat_timeout_secs: u32,
}

/// A pending user timer, keyed by timer ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInfo {
    pub timer_id: SmolStr,
    pub version: i64,
    pub started_event_id: i64,
    pub expiry_ms: u64,
}

/// A pending child workflow, keyed by its initiated event ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildExecutionInfo {
    pub initiated_id: i64,
    pub workflow_id: WorkflowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub workflow_type: SmolStr,
    pub version: i64,
}

/// A pending external-cancellation request, keyed by its initiated event ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelInfo {
    pub initiated_id: i64,
    pub cancel_request_id: SmolStr,
    pub version: i64,
}

/// A pending external signal, keyed by its initiated event ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalInfo {
    pub initiated_id: i64,
    pub signal_name: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    pub version: i64,
}

/// A batch of replicated events buffered until it can be applied in order,
/// keyed by `first_event_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferedReplicationBatch {
    pub first_event_id: i64,
    pub next_event_id: i64,
    pub version: i64,
    pub events: Vec<HistoryEvent>,
}

/// The full persisted mutable state of one execution: everything a
/// get returns and a reset replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub execution_info: ExecutionInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_state: Option<ReplicationState>,
    #[serde(default)]
    pub activities: HashMap<i64, ActivityInfo>,
    #[serde(default)]
    pub timers: HashMap<SmolStr, TimerInfo>,
    #[serde(default)]
    pub children: HashMap<i64, ChildExecutionInfo>,
    #[serde(default)]
    pub cancel_requests: HashMap<i64, RequestCancelInfo>,
    #[serde(default)]
    pub signals: HashMap<i64, SignalInfo>,
    #[serde(default)]
    pub signal_requested_ids: HashSet<SmolStr>,
    /// Events whose IDs are deferred until the next update session closes.
    #[serde(default)]
    pub buffered_events: Vec<HistoryEvent>,
    #[serde(default)]
    pub buffered_replication: HashMap<i64, BufferedReplicationBatch>,
}

impl WorkflowSnapshot {
    pub fn new(execution_info: ExecutionInfo) -> Self {
        Self {
            execution_info,
            replication_state: None,
            activities: HashMap::new(),
            timers: HashMap::new(),
            children: HashMap::new(),
            cancel_requests: HashMap::new(),
            signals: HashMap::new(),
            signal_requested_ids: HashSet::new(),
            buffered_events: Vec::new(),
            buffered_replication: HashMap::new(),
        }
    }
}
