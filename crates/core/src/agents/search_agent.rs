//! # Search Agent
//!
//! Runs one planned search through an LLM worker with the `search_web`
//! tool and returns a short summary of what it found.

use anyhow::{Context, Result};
use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::agents::prompts::SEARCHER;
use crate::agents::tools::search_tools;
use crate::models::ModelConfig;
use crate::research::{SearchItem, Searcher};
use crate::run_with_tools;

/// Output of a single search
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct SearchSummary {
    /// Concise summary of the search results, under 300 words
    pub summary: String,
}

pub struct SearchAgent {
    config: ModelConfig,
    endpoints: Vec<String>,
}

impl SearchAgent {
    /// `searxng_url` is tried before the public fallback instances
    pub fn new(config: ModelConfig, searxng_url: Option<String>) -> Self {
        Self {
            config,
            endpoints: search_tools::searxng_endpoints(searxng_url),
        }
    }

    fn input(item: &SearchItem) -> String {
        format!(
            "Search term: {}\nReason for searching: {}",
            item.query, item.reason
        )
    }
}

#[async_trait]
impl Searcher for SearchAgent {
    async fn search(&self, item: &SearchItem) -> Result<String> {
        let output = run_with_tools!(
            &self.config,
            SearchSummary,
            SEARCHER,
            Self::input(item),
            search_tools::search_web(self.endpoints.clone()),
        )
        .with_context(|| format!("Search failed for '{}'", item.query))?;

        Ok(output.summary)
    }
}
