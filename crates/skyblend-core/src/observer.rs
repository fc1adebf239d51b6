//! Sink for per-source failures and per-location pass outcomes.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::source::{FetchError, FetchErrorKind};
use crate::{LocationKey, SourceId};

/// Result of one location's fetch → aggregate → store pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// A record built from this many readings was written.
    Stored { contributors: usize },
    /// Every source failed; nothing was written.
    NoData,
}

impl CycleOutcome {
    pub const fn is_stored(self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

/// Receives pipeline events. Implementations must not block.
pub trait CycleObserver: Send + Sync {
    fn source_failed(&self, source: &SourceId, location: &LocationKey, error: &FetchError);

    fn cycle_completed(&self, location: &LocationKey, outcome: CycleOutcome);
}

/// Default observer: emits structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CycleObserver for TracingObserver {
    fn source_failed(&self, source: &SourceId, location: &LocationKey, error: &FetchError) {
        tracing::warn!(
            source = %source,
            location = %location,
            kind = %error.kind(),
            error = %error.message(),
            "source fetch failed"
        );
    }

    fn cycle_completed(&self, location: &LocationKey, outcome: CycleOutcome) {
        match outcome {
            CycleOutcome::Stored { contributors } => {
                tracing::debug!(location = %location, contributors, "stored aggregated record");
            }
            CycleOutcome::NoData => {
                tracing::info!(location = %location, "no source returned data; nothing stored");
            }
        }
    }
}

/// One captured [`CycleObserver::source_failed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEvent {
    pub source: SourceId,
    pub location: LocationKey,
    pub kind: FetchErrorKind,
}

/// Observer that keeps every event in memory, for assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    failures: Mutex<Vec<FailureEvent>>,
    outcomes: Mutex<Vec<(LocationKey, CycleOutcome)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<FailureEvent> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn outcomes(&self) -> Vec<(LocationKey, CycleOutcome)> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CycleObserver for RecordingObserver {
    fn source_failed(&self, source: &SourceId, location: &LocationKey, error: &FetchError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FailureEvent {
                source: source.clone(),
                location: location.clone(),
                kind: error.kind(),
            });
    }

    fn cycle_completed(&self, location: &LocationKey, outcome: CycleOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((location.clone(), outcome));
    }
}
