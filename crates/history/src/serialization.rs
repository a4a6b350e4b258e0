// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History batch encoding.
//!
//! Batches serialize to JSON and are zstd-compressed before they reach
//! the store; the store treats the payload as opaque bytes.

use chronicle_core::HistoryEvent;
use thiserror::Error;

/// Errors that can occur encoding or decoding a history batch
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a batch of history events for storage.
///
/// `level` 0 selects the zstd default.
pub fn encode_events(events: &[HistoryEvent], level: i32) -> Result<Vec<u8>, SerializationError> {
    let json = serde_json::to_vec(events)?;
    Ok(zstd::encode_all(json.as_slice(), level)?)
}

/// Decode a stored history batch.
pub fn decode_events(data: &[u8]) -> Result<Vec<HistoryEvent>, SerializationError> {
    let json = zstd::decode_all(data)?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
#[path = "serialization_tests.rs"]
mod tests;
