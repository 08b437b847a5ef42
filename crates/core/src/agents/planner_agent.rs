//! # Planner Agent
//!
//! Plans the web searches for a query as structured output.

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::agents::prompts;
use crate::models::ModelConfig;
use crate::research::{Planner, SearchPlan};
use crate::run_structured;

pub struct PlannerAgent {
    config: ModelConfig,
    searches: usize,
}

impl PlannerAgent {
    pub fn new(config: ModelConfig, searches: usize) -> Self {
        Self { config, searches }
    }

    fn input(query: &str) -> String {
        format!("Query: {}", query)
    }
}

#[async_trait]
impl Planner for PlannerAgent {
    async fn plan(&self, query: &str) -> Result<SearchPlan> {
        let system = prompts::planner(self.searches);
        let plan = run_structured!(&self.config, SearchPlan, system.as_str(), Self::input(query))
            .with_context(|| {
                format!(
                    "Planner failed (provider: {:?}, model: {})",
                    self.config.provider, self.config.model
                )
            })?;

        if plan.len() > self.searches {
            tracing::debug!(
                "Planner returned {} searches, expected {}",
                plan.len(),
                self.searches
            );
        }
        Ok(plan)
    }
}
