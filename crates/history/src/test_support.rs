// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test fixtures: an in-memory shard and a wired-up engine harness

use crate::config::HistoryConfig;
use crate::context::ExecutionContext;
use crate::domain::{
    ClusterMetadata, DomainCache, DomainEntry, StaticClusterMetadata, StaticDomainCache,
};
use crate::mutable_state::MutableState;
use crate::shard::{HistoryEventNotification, ShardContext};
use async_trait::async_trait;
use chronicle_core::{DomainId, FakeClock, RunId, WorkflowExecution, WorkflowId};
use chronicle_store::{
    AppendHistoryEventsRequest, ExecutionStore, InMemoryExecutionStore, ResetMutableStateRequest,
    StoreError, UpdateWorkflowExecutionRequest,
};
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Shard fronting the in-memory store, recording notifications.
pub struct TestShard {
    shard_id: u32,
    config: HistoryConfig,
    store: Arc<InMemoryExecutionStore>,
    domains: Arc<StaticDomainCache>,
    cluster: StaticClusterMetadata,
    transaction_ids: AtomicI64,
    notifications: Mutex<Vec<HistoryEventNotification>>,
}

impl TestShard {
    pub fn new(
        store: Arc<InMemoryExecutionStore>,
        domains: Arc<StaticDomainCache>,
        cluster: StaticClusterMetadata,
    ) -> Self {
        Self {
            shard_id: 1,
            config: HistoryConfig::default(),
            store,
            domains,
            cluster,
            transaction_ids: AtomicI64::new(0),
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn notifications(&self) -> Vec<HistoryEventNotification> {
        self.notifications.lock().clone()
    }
}

#[async_trait]
impl ShardContext for TestShard {
    fn shard_id(&self) -> u32 {
        self.shard_id
    }

    fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn domain_cache(&self) -> &dyn DomainCache {
        self.domains.as_ref()
    }

    fn cluster_metadata(&self) -> &dyn ClusterMetadata {
        &self.cluster
    }

    fn next_transaction_id(&self) -> i64 {
        self.transaction_ids.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn append_history_events(
        &self,
        request: AppendHistoryEventsRequest,
    ) -> Result<(), StoreError> {
        self.store.append_history_events(request).await
    }

    async fn update_workflow_execution(
        &self,
        request: UpdateWorkflowExecutionRequest,
    ) -> Result<(), StoreError> {
        self.store.update_workflow_execution(request).await
    }

    async fn reset_mutable_state(
        &self,
        request: ResetMutableStateRequest,
    ) -> Result<(), StoreError> {
        self.store.reset_mutable_state(request).await
    }

    fn notify_new_history_event(&self, notification: HistoryEventNotification) {
        self.notifications.lock().push(notification);
    }
}

/// A fully wired engine for tests: fake clock, in-memory store, static
/// domain registry, and one shard.
pub struct TestEnv {
    pub clock: FakeClock,
    pub store: Arc<InMemoryExecutionStore>,
    pub domains: Arc<StaticDomainCache>,
    pub shard: Arc<TestShard>,
}

impl TestEnv {
    /// Environment with cross-cluster replication disabled.
    pub fn new() -> Self {
        Self::with_cluster(StaticClusterMetadata::new(false, "east"))
    }

    /// Environment that participates in cross-cluster replication.
    pub fn global() -> Self {
        Self::with_cluster(StaticClusterMetadata::new(true, "east"))
    }

    fn with_cluster(cluster: StaticClusterMetadata) -> Self {
        let store = Arc::new(InMemoryExecutionStore::new());
        let domains = Arc::new(StaticDomainCache::new());
        let shard = Arc::new(TestShard::new(Arc::clone(&store), Arc::clone(&domains), cluster));
        Self { clock: FakeClock::new(), store, domains, shard }
    }

    /// Register a domain and hand back its ID.
    pub fn register_domain(&self, name: &str, is_global: bool, retention_days: u32) -> DomainId {
        let id = DomainId::new();
        self.domains.register(DomainEntry {
            id: id.clone(),
            name: SmolStr::from(name),
            is_global,
            failover_version: if is_global { 1 } else { 0 },
            retention_days,
            clusters: vec![SmolStr::from("east"), SmolStr::from("west")],
        });
        id
    }

    pub fn set_failover_version(&self, id: &DomainId, failover_version: i64) {
        if let Ok(entry) = self.domains.get_domain_by_id(id) {
            let mut updated = (*entry).clone();
            updated.failover_version = failover_version;
            self.domains.register(updated);
        }
    }

    /// A fresh, unlocked context for one run.
    pub fn context(
        &self,
        domain_id: &DomainId,
        execution: &WorkflowExecution,
    ) -> ExecutionContext<FakeClock> {
        ExecutionContext::new(
            domain_id.clone(),
            execution.clone(),
            Arc::clone(&self.shard) as Arc<dyn ShardContext>,
            Arc::clone(&self.store) as Arc<dyn ExecutionStore>,
            self.clock.clone(),
        )
    }

    /// Seed a running execution with `next_event_id` already advanced to
    /// `next_event_id` (as if that many events were persisted), and
    /// return its identity.
    pub fn seed_running(
        &self,
        domain_id: &DomainId,
        workflow_id: &str,
        next_event_id: i64,
        replicated_at_version: Option<i64>,
    ) -> WorkflowExecution {
        let execution = WorkflowExecution::new(WorkflowId::new(workflow_id), RunId::new());
        let mut state = MutableState::new(domain_id.clone(), execution.clone(), self.clock.clone());
        if let Some(version) = replicated_at_version {
            state = state.with_replication(version);
        }
        let mut snapshot = state.reset_snapshot();
        snapshot.execution_info.state = chronicle_store::WorkflowState::Running;
        snapshot.execution_info.next_event_id = next_event_id;
        snapshot.execution_info.last_first_event_id = (next_event_id - 1).max(0);
        snapshot.execution_info.workflow_type = SmolStr::from("test-workflow");
        snapshot.execution_info.task_list = SmolStr::from("default");
        self.store.seed(snapshot);
        execution
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
