//! # Pipeline Stages
//!
//! The research run as a state machine. Transitions are linear except at
//! the refinement gate after critique, which may open a single follow-up
//! round before delivery.
//!
//! ```text
//! Start → Plan → Search → Write → Critique ─┬─▶ FollowUp → Rewrite ─┬─▶ Deliver → Finish → Complete
//!                                           └──────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use super::types::CriticFeedback;

/// Stage of a research run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Trace id generated, run not yet planned
    Start,
    /// Planning searches
    Plan,
    /// Initial search fan-out
    Search,
    /// Writing the initial report
    Write,
    /// Critic reviewing the report
    Critique,
    /// Critic-suggested search fan-out
    FollowUp,
    /// Rewriting with the enlarged evidence set
    Rewrite,
    /// Delivering the final report
    Deliver,
    /// Emitting the final report text
    Finish,
    /// Complete
    Complete,
    /// Failed
    Failed,
}

impl PipelineStage {
    /// Short name used in logs and events
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Start => "start",
            PipelineStage::Plan => "plan",
            PipelineStage::Search => "search",
            PipelineStage::Write => "write",
            PipelineStage::Critique => "critique",
            PipelineStage::FollowUp => "follow_up",
            PipelineStage::Rewrite => "rewrite",
            PipelineStage::Deliver => "deliver",
            PipelineStage::Finish => "finish",
            PipelineStage::Complete => "complete",
            PipelineStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline state machine
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Current stage
    pub stage: PipelineStage,
    /// Whether the follow-up round has been taken
    pub refined: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            stage: PipelineStage::Start,
            refined: false,
        }
    }
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance along a linear edge.
    ///
    /// `Critique` is left untouched: leaving it requires [`Pipeline::gate`].
    pub fn advance(&mut self) {
        self.stage = match self.stage {
            PipelineStage::Start => PipelineStage::Plan,
            PipelineStage::Plan => PipelineStage::Search,
            PipelineStage::Search => PipelineStage::Write,
            PipelineStage::Write => PipelineStage::Critique,
            PipelineStage::Critique => PipelineStage::Critique,
            PipelineStage::FollowUp => PipelineStage::Rewrite,
            PipelineStage::Rewrite => PipelineStage::Deliver,
            PipelineStage::Deliver => PipelineStage::Finish,
            PipelineStage::Finish => PipelineStage::Complete,
            PipelineStage::Complete => PipelineStage::Complete,
            PipelineStage::Failed => PipelineStage::Failed,
        };
    }

    /// Refinement gate: branch after critique.
    ///
    /// Goes to `FollowUp` when the critic suggested searches and no
    /// follow-up round has happened yet, otherwise straight to `Deliver`.
    /// Returns true when the follow-up branch was taken.
    pub fn gate(&mut self, feedback: &CriticFeedback) -> bool {
        if self.stage != PipelineStage::Critique {
            return false;
        }
        if feedback.wants_followup() && !self.refined {
            self.refined = true;
            self.stage = PipelineStage::FollowUp;
            true
        } else {
            self.stage = PipelineStage::Deliver;
            false
        }
    }

    /// Fail the pipeline
    pub fn fail(&mut self) {
        self.stage = PipelineStage::Failed;
    }

    /// Check if pipeline is complete
    pub fn is_complete(&self) -> bool {
        matches!(self.stage, PipelineStage::Complete | PipelineStage::Failed)
    }

    /// Check if pipeline succeeded
    pub fn is_success(&self) -> bool {
        self.stage == PipelineStage::Complete
    }
}
