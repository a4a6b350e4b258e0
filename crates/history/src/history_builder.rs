// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accumulates the history batches of one update session.
//!
//! The main list is the linear extension of the run's history; the
//! transient list holds speculative events (e.g. decision-task events
//! that may be discarded) appended to the store as a separate batch
//! before the main one.

use chronicle_core::HistoryEvent;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct HistoryBuilder {
    history: Vec<HistoryEvent>,
    transient: Vec<HistoryEvent>,
}

impl HistoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a pre-formed batch (the replication apply path); no
    /// local event generation happens for these.
    pub fn from_events(events: Vec<HistoryEvent>) -> Self {
        Self { history: events, transient: Vec::new() }
    }

    pub fn push(&mut self, event: HistoryEvent) {
        self.history.push(event);
    }

    pub fn push_transient(&mut self, event: HistoryEvent) {
        self.transient.push(event);
    }

    pub fn history(&self) -> &[HistoryEvent] {
        &self.history
    }

    pub fn transient_history(&self) -> &[HistoryEvent] {
        &self.transient
    }

    pub fn has_events(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn has_transient_events(&self) -> bool {
        !self.transient.is_empty()
    }

    /// First event of the main batch.
    pub fn first_event(&self) -> Option<&HistoryEvent> {
        self.history.first()
    }

    pub fn last_event(&self) -> Option<&HistoryEvent> {
        self.history.last()
    }
}

#[cfg(test)]
#[path = "history_builder_tests.rs"]
mod tests;
