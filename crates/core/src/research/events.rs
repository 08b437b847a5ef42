//! # Research Events
//!
//! Structured observability events for a run. These are separate from the
//! progress stream: they carry machine-readable detail (fan-out counts,
//! swallowed search failures) for logs and dashboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::pipeline::PipelineStage;

/// Kind of research event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchEventKind {
    /// Run started, trace id assigned
    RunStarted,
    /// A stage began work
    StageStarted,
    /// A stage finished successfully
    StageCompleted,
    /// One task of a fan-out batch finished
    SearchProgress,
    /// A search failed and was dropped
    SearchFailed,
    /// Final report emitted
    RunCompleted,
    /// A stage failed and the run aborted
    RunFailed,
}

/// An event in a research run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchEvent {
    /// Unique event ID
    pub id: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Kind of event
    pub kind: ResearchEventKind,
    /// Stage that produced this event
    pub stage: PipelineStage,
    /// Trace id of the run
    pub trace_id: String,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ResearchEvent {
    /// Create a new event
    pub fn new(kind: ResearchEventKind, stage: PipelineStage, trace_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            stage,
            trace_id: trace_id.to_string(),
            data: None,
        }
    }

    /// Add data to the event
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Best-effort event publisher.
///
/// Never blocks and never fails the run: a full or closed channel drops
/// the event.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<ResearchEvent>>,
}

impl EventSink {
    pub fn new(tx: Option<mpsc::Sender<ResearchEvent>>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: ResearchEvent) {
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.try_send(event) {
                tracing::debug!("Research event dropped: {}", e);
            }
        }
    }
}
