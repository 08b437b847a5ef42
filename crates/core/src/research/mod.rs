//! # Research Orchestration
//!
//! Sequences the research stages for one query and streams progress back
//! to the caller.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Query → Plan → Search (fan-out) → Write → Critique ─┬─▶ Deliver → Report
//!                                                     │
//!                       (suggested searches) ─────────┴─▶ Follow-up Search (fan-out) → Rewrite
//! ```
//!
//! Individual searches fail softly (absent result); every other stage
//! failure aborts the run.

pub mod events;
pub mod executor;
pub mod fan_out;
pub mod manager;
pub mod pipeline;
pub mod stages;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{EventSink, ResearchEvent, ResearchEventKind};
pub use executor::execute_task;
pub use fan_out::{fan_out, FanOutOutcome, FanOutProgress};
pub use manager::{ProgressStream, ProgressUpdate, ResearchManager, UpdateStream};
pub use pipeline::{Pipeline, PipelineStage};
pub use stages::{Critic, Deliverer, Planner, ResearchStages, Searcher, Writer};
pub use types::{
    CriticFeedback, Delivery, EvidenceSet, Report, RunTrace, SearchItem, SearchPlan,
};
