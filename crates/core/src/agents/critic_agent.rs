//! # Critic Agent
//!
//! Reviews a markdown report and suggests follow-up searches.

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::agents::prompts::CRITIC;
use crate::models::ModelConfig;
use crate::research::{Critic, CriticFeedback};
use crate::run_structured;

pub struct CriticAgent {
    config: ModelConfig,
}

impl CriticAgent {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Critic for CriticAgent {
    async fn review(&self, markdown_report: &str) -> Result<CriticFeedback> {
        let mut feedback = run_structured!(
            &self.config,
            CriticFeedback,
            CRITIC,
            markdown_report.to_string()
        )
        .context("Critic failed")?;

        // Blank suggestions would open a follow-up round with nothing to search
        feedback
            .suggested_searches
            .retain(|query| !query.trim().is_empty());
        Ok(feedback)
    }
}
