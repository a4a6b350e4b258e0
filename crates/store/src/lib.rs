// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! chronicle-store: persistence contracts for the chronicle history engine

pub mod error;
pub mod requests;
pub mod retry;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use error::StoreError;
pub use requests::{
    AppendHistoryEventsRequest, DeleteWorkflowHistoryRequest, GetWorkflowExecutionRequest,
    GetWorkflowExecutionResponse, ResetMutableStateRequest, UpdateWorkflowExecutionRequest,
};
pub use retry::{retry, RetryPolicy};
pub use store::ExecutionStore;
pub use types::{
    ActivityInfo, BufferedReplicationBatch, ChildExecutionInfo, ExecutionInfo, ReplicationState,
    RequestCancelInfo, SignalInfo, TimerInfo, WorkflowSnapshot, WorkflowState,
};

#[cfg(any(test, feature = "test-support"))]
pub use memory::{Fault, InMemoryExecutionStore, StoreOp, StoredBatch};
