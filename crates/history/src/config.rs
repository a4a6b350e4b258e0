// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration with environment overrides

use chronicle_store::RetryPolicy;
use std::time::Duration;

/// Tunables for the history engine.
///
/// Built once at shard start and treated as read-only afterwards.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Backoff schedule for transient persistence failures.
    pub persistence_retry: RetryPolicy,
    /// zstd level for history batch encoding. 0 selects the library default.
    pub compression_level: i32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { persistence_retry: RetryPolicy::persistence_default(), compression_level: 0 }
    }
}

impl HistoryConfig {
    /// Defaults overridden by `CHRONICLE_*` environment variables:
    /// `CHRONICLE_RETRY_INITIAL_MS`, `CHRONICLE_RETRY_MAX_ATTEMPTS`,
    /// `CHRONICLE_RETRY_EXPIRATION_MS`, `CHRONICLE_ZSTD_LEVEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_u64("CHRONICLE_RETRY_INITIAL_MS") {
            config.persistence_retry.initial_interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = env_u64("CHRONICLE_RETRY_MAX_ATTEMPTS") {
            config.persistence_retry.max_attempts = attempts as u32;
        }
        if let Some(ms) = env_u64("CHRONICLE_RETRY_EXPIRATION_MS") {
            config.persistence_retry.expiration = Some(Duration::from_millis(ms));
        }
        if let Some(level) = std::env::var("CHRONICLE_ZSTD_LEVEL")
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
        {
            config.compression_level = level;
        }
        config
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok())
}
