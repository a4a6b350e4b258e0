// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-shard cache of execution contexts.
//!
//! Each cached context sits behind its own `tokio::sync::Mutex`; that
//! lock is the single-writer serialization point for the run and is held
//! across store I/O for the whole load → mutate → commit window.

use crate::context::ExecutionContext;
use crate::shard::ShardContext;
use chronicle_core::{Clock, DomainId, RunId, WorkflowExecution, WorkflowId};
use chronicle_store::ExecutionStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

type Key = (DomainId, WorkflowId, RunId);

pub struct ExecutionCache<C: Clock> {
    shard: Arc<dyn ShardContext>,
    store: Arc<dyn ExecutionStore>,
    clock: C,
    contexts: Mutex<HashMap<Key, Arc<AsyncMutex<ExecutionContext<C>>>>>,
}

impl<C: Clock> ExecutionCache<C> {
    pub fn new(shard: Arc<dyn ShardContext>, store: Arc<dyn ExecutionStore>, clock: C) -> Self {
        Self { shard, store, clock, contexts: Mutex::new(HashMap::new()) }
    }

    /// The context for one run, creating it on first access. Callers
    /// lock the returned mutex for the duration of their transaction.
    pub fn get_or_create(
        &self,
        domain_id: &DomainId,
        execution: &WorkflowExecution,
    ) -> Arc<AsyncMutex<ExecutionContext<C>>> {
        let key =
            (domain_id.clone(), execution.workflow_id.clone(), execution.run_id.clone());
        let mut contexts = self.contexts.lock();
        Arc::clone(contexts.entry(key).or_insert_with(|| {
            Arc::new(AsyncMutex::new(ExecutionContext::new(
                domain_id.clone(),
                execution.clone(),
                Arc::clone(&self.shard),
                Arc::clone(&self.store),
                self.clock.clone(),
            )))
        }))
    }

    /// Drop one run's context. In-flight holders keep their `Arc`; the
    /// next `get_or_create` builds a fresh, empty context.
    pub fn evict(&self, domain_id: &DomainId, execution: &WorkflowExecution) {
        let key =
            (domain_id.clone(), execution.workflow_id.clone(), execution.run_id.clone());
        self.contexts.lock().remove(&key);
    }

    /// Drop everything (shard close).
    pub fn clear(&self) {
        self.contexts.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
