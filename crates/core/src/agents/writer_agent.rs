//! # Writer Agent
//!
//! Synthesizes a markdown report from the query and the evidence set.

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::agents::prompts::WRITER;
use crate::models::ModelConfig;
use crate::research::{Report, Writer};
use crate::run_structured;

pub struct WriterAgent {
    config: ModelConfig,
}

impl WriterAgent {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    fn input(query: &str, evidence: &[String]) -> String {
        let results = evidence
            .iter()
            .enumerate()
            .map(|(i, summary)| format!("[{}] {}", i + 1, summary))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            "Original query: {}\nSummarized search results:\n{}",
            query, results
        )
    }
}

#[async_trait]
impl Writer for WriterAgent {
    async fn write(&self, query: &str, evidence: &[String]) -> Result<Report> {
        run_structured!(&self.config, Report, WRITER, Self::input(query, evidence))
            .context("Writer failed")
    }
}
