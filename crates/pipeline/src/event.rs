//! Progress events and the sinks they flow through.

use std::sync::Mutex;

use serde::Serialize;

use crate::payload::AnalysisResults;

/// One progress notification, emitted after a stage transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageEvent {
    /// Stage number, 1..=5, strictly increasing within a session.
    pub stage: u8,
    pub message: String,
}

/// Everything a session ever tells its client.
///
/// A session emits zero or more `Update`s followed by exactly one
/// terminal event: `Complete` or `Error`, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    Update(StageEvent),
    Complete(Box<AnalysisResults>),
    Error { message: String },
}

impl AnalysisEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisEvent::Update(_))
    }
}

/// Where a session's progress events go.
///
/// Emission is fire-and-forget: no result, no backpressure. A sink whose
/// consumer is gone (client disconnected mid-analysis) must swallow the
/// event silently; the session keeps running to completion either way.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: AnalysisEvent);
}

/// Forwards events into a tokio channel; sends to a closed channel are
/// dropped, which is exactly the disconnected-client behavior we want.
impl ProgressSink for tokio::sync::mpsc::UnboundedSender<AnalysisEvent> {
    fn emit(&self, event: AnalysisEvent) {
        let _ = self.send(event);
    }
}

/// Discards every event. For callers that only want the return value.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: AnalysisEvent) {}
}

/// Buffers events in memory; the assertion surface for orchestrator tests.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Mutex<Vec<AnalysisEvent>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in order.
    pub fn events(&self) -> Vec<AnalysisEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The stage numbers of all `Update` events, in emission order.
    pub fn stages(&self) -> Vec<u8> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                AnalysisEvent::Update(StageEvent { stage, .. }) => Some(*stage),
                _ => None,
            })
            .collect()
    }

    /// The terminal event, if one has been emitted yet.
    pub fn terminal(&self) -> Option<AnalysisEvent> {
        self.events().into_iter().find(AnalysisEvent::is_terminal)
    }
}

impl ProgressSink for EventCollector {
    fn emit(&self, event: AnalysisEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
