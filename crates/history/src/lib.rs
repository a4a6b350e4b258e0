// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! chronicle-history: the workflow execution context and its collaborators.
//!
//! One [`ExecutionContext`] owns the in-memory mutable state of a single
//! workflow run and mediates every persistence transaction against it:
//! local decision commits, continue-as-new handoffs, and replicated event
//! batches from remote clusters, all conditioned on the run's
//! `next_event_id` at load time.

pub mod cache;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod history_builder;
pub mod mutable_state;
pub mod serialization;
pub mod shard;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::ExecutionCache;
pub use config::HistoryConfig;
pub use context::{ExecutionContext, ReplicateRequest, SECONDS_IN_DAY};
pub use domain::{
    ClusterMetadata, DomainCache, DomainEntry, DomainError, StaticClusterMetadata,
    StaticDomainCache,
};
pub use error::EngineError;
pub use history_builder::HistoryBuilder;
pub use mutable_state::{MutableState, SessionUpdates, StateError};
pub use serialization::SerializationError;
pub use shard::{HistoryEventNotification, ShardContext};

#[cfg(any(test, feature = "test-support"))]
pub use test_support::{TestEnv, TestShard};
