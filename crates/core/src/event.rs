// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History event types for workflow executions

use crate::ids::{RunId, WorkflowId};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A single entry in a workflow execution's append-only history.
///
/// Event IDs are assigned by the mutable-state builder and are strictly
/// increasing within a run. `version` is the failover version of the
/// cluster that generated the event (or [`crate::EMPTY_VERSION`] for
/// non-replicated domains).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub event_id: i64,
    pub version: i64,
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub attributes: EventAttributes,
}

impl HistoryEvent {
    pub fn new(event_id: i64, version: i64, timestamp_ms: u64, attributes: EventAttributes) -> Self {
        Self { event_id, version, timestamp_ms, attributes }
    }
}

/// What happened, per history event.
///
/// Serializes with `{"type": "category:name", ...fields}` format.
/// Unknown type tags deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventAttributes {
    // -- workflow lifecycle --
    #[serde(rename = "workflow:started")]
    WorkflowStarted {
        workflow_type: SmolStr,
        task_list: SmolStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
        /// Set when this run continues a previous one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        continued_from_run_id: Option<RunId>,
    },

    #[serde(rename = "workflow:completed")]
    WorkflowCompleted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },

    #[serde(rename = "workflow:failed")]
    WorkflowFailed {
        reason: SmolStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },

    #[serde(rename = "workflow:continued_as_new")]
    WorkflowContinuedAsNew { new_run_id: RunId },

    #[serde(rename = "workflow:signaled")]
    WorkflowSignaled {
        signal_name: SmolStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
    },

    #[serde(rename = "workflow:cancel_requested")]
    WorkflowCancelRequested {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<SmolStr>,
    },

    // -- decision task --
    #[serde(rename = "decision:scheduled")]
    DecisionScheduled { task_list: SmolStr, attempt: u32 },

    #[serde(rename = "decision:started")]
    DecisionStarted { scheduled_event_id: i64 },

    #[serde(rename = "decision:completed")]
    DecisionCompleted { scheduled_event_id: i64, started_event_id: i64 },

    #[serde(rename = "decision:timed_out")]
    DecisionTimedOut { scheduled_event_id: i64 },

    // -- activity task --
    #[serde(rename = "activity:scheduled")]
    ActivityScheduled {
        activity_id: SmolStr,
        activity_type: SmolStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
    },

    #[serde(rename = "activity:started")]
    ActivityStarted { scheduled_event_id: i64 },

    #[serde(rename = "activity:completed")]
    ActivityCompleted {
        scheduled_event_id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },

    #[serde(rename = "activity:failed")]
    ActivityFailed { scheduled_event_id: i64, reason: SmolStr },

    // -- timer --
    #[serde(rename = "timer:started")]
    TimerStarted { timer_id: SmolStr, fire_after_ms: u64 },

    #[serde(rename = "timer:fired")]
    TimerFired { timer_id: SmolStr, started_event_id: i64 },

    #[serde(rename = "timer:canceled")]
    TimerCanceled { timer_id: SmolStr, started_event_id: i64 },

    // -- child workflow --
    #[serde(rename = "child_workflow:initiated")]
    ChildWorkflowInitiated { workflow_id: WorkflowId, workflow_type: SmolStr },

    /// Catch-all for unknown event types (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl EventAttributes {
    /// Terminal attributes close the workflow when appended.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::WorkflowCompleted { .. }
                | Self::WorkflowFailed { .. }
                | Self::WorkflowContinuedAsNew { .. }
        )
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
