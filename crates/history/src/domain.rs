// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain registry and cluster metadata contracts

use chronicle_core::DomainId;
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A workflow namespace and its replication settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEntry {
    pub id: DomainId,
    pub name: SmolStr,
    /// Globally replicated domains carry a failover version scheme and
    /// emit replication tasks on every commit.
    pub is_global: bool,
    pub failover_version: i64,
    /// How long closed executions are kept before the store may expire
    /// their current-run pointer.
    pub retention_days: u32,
    pub clusters: Vec<SmolStr>,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain not found: {0}")]
    NotFound(DomainId),
}

/// Read access to domain entries. Lookups are served from memory; a
/// remote-backed cache refreshes itself behind this trait.
pub trait DomainCache: Send + Sync {
    fn get_domain_by_id(&self, id: &DomainId) -> Result<Arc<DomainEntry>, DomainError>;
}

/// Cluster-level deployment facts.
pub trait ClusterMetadata: Send + Sync {
    /// Whether this deployment participates in cross-cluster replication
    /// at all. When false, no replication bookkeeping happens even for
    /// domains that carry a replication state record.
    fn is_global_domain_enabled(&self) -> bool;

    fn current_cluster_name(&self) -> &str;
}

/// In-memory domain registry.
#[derive(Default)]
pub struct StaticDomainCache {
    domains: RwLock<HashMap<DomainId, Arc<DomainEntry>>>,
}

impl StaticDomainCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, entry: DomainEntry) {
        self.domains.write().insert(entry.id.clone(), Arc::new(entry));
    }

    pub fn remove(&self, id: &DomainId) {
        self.domains.write().remove(id);
    }
}

impl DomainCache for StaticDomainCache {
    fn get_domain_by_id(&self, id: &DomainId) -> Result<Arc<DomainEntry>, DomainError> {
        self.domains.read().get(id).cloned().ok_or_else(|| DomainError::NotFound(id.clone()))
    }
}

/// Fixed cluster metadata, set once at process start.
#[derive(Debug, Clone)]
pub struct StaticClusterMetadata {
    pub enable_global_domain: bool,
    pub current_cluster: SmolStr,
}

impl StaticClusterMetadata {
    pub fn new(enable_global_domain: bool, current_cluster: impl AsRef<str>) -> Self {
        Self { enable_global_domain, current_cluster: SmolStr::from(current_cluster.as_ref()) }
    }
}

impl ClusterMetadata for StaticClusterMetadata {
    fn is_global_domain_enabled(&self) -> bool {
        self.enable_global_domain
    }

    fn current_cluster_name(&self) -> &str {
        self.current_cluster.as_str()
    }
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod tests;
