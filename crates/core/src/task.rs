// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer, timer, and replication tasks emitted alongside history writes

use crate::ids::{DomainId, RunId, WorkflowExecution};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;

/// Failover version carried by tasks and events on non-replicated domains.
pub const EMPTY_VERSION: i64 = -1;

/// A task for the transfer queue, persisted atomically with the update
/// that produced it. The `version` stamp is applied at commit time so
/// downstream processors can route tasks across clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTask {
    pub version: i64,
    #[serde(flatten)]
    pub kind: TransferTaskKind,
}

impl TransferTask {
    pub fn new(kind: TransferTaskKind) -> Self {
        Self { version: EMPTY_VERSION, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransferTaskKind {
    #[serde(rename = "transfer:decision")]
    DecisionTask { task_list: SmolStr, schedule_id: i64 },

    #[serde(rename = "transfer:activity")]
    ActivityTask { task_list: SmolStr, schedule_id: i64 },

    #[serde(rename = "transfer:close_execution")]
    CloseExecution,

    #[serde(rename = "transfer:cancel_execution")]
    CancelExecution { target_domain_id: DomainId, target: WorkflowExecution },

    #[serde(rename = "transfer:start_child")]
    StartChildExecution { target_domain_id: DomainId, initiated_id: i64 },
}

/// A task for the timer queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerTask {
    pub version: i64,
    #[serde(flatten)]
    pub kind: TimerTaskKind,
}

impl TimerTask {
    pub fn new(kind: TimerTaskKind) -> Self {
        Self { version: EMPTY_VERSION, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimerTaskKind {
    #[serde(rename = "timer:user")]
    UserTimer { timer_id: SmolStr, fire_at_ms: u64 },

    #[serde(rename = "timer:activity_timeout")]
    ActivityTimeout { schedule_id: i64, fire_at_ms: u64 },

    #[serde(rename = "timer:decision_timeout")]
    DecisionTimeout { schedule_id: i64, fire_at_ms: u64 },

    /// Deletes a run's history after its retention window.
    #[serde(rename = "timer:delete_history")]
    DeleteHistory { run_id: RunId, fire_at_ms: u64 },
}

/// Per-cluster replication progress, keyed by cluster name in
/// [`ReplicationTask::last_replication_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationInfo {
    pub version: i64,
    pub last_event_id: i64,
}

/// An instruction to ship a contiguous range of history events
/// (`first_event_id..next_event_id`) to replica clusters. Emitted at
/// commit time for globally replicated domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationTask {
    pub first_event_id: i64,
    pub next_event_id: i64,
    pub version: i64,
    pub last_replication_info: HashMap<SmolStr, ReplicationInfo>,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
