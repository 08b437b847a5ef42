//! # Research Errors
//!
//! Only run-aborting failures live here. A failed search inside a fan-out
//! batch is never an error: it is an absent result (see
//! [`crate::research::executor`]).

use crate::research::PipelineStage;

/// Errors that end a research run
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// A stage call (plan, write, critique, deliver) failed
    #[error("{stage} stage failed: {source:#}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: anyhow::Error,
    },

    /// A stage was reached before its input existed
    #[error("{stage} stage reached without a report")]
    MissingReport { stage: PipelineStage },

    /// Configuration could not be used
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ResearchError {
    pub fn stage(stage: PipelineStage, source: anyhow::Error) -> Self {
        Self::Stage { stage, source }
    }

    /// Stage the run failed in, if the failure came from a stage call
    pub fn failed_stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Stage { stage, .. } | Self::MissingReport { stage } => Some(*stage),
            Self::Config(_) => None,
        }
    }
}
