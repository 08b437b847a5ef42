//! # Stage Interfaces
//!
//! Each pipeline stage is an opaque request/response service. The
//! orchestrator only ever talks to these traits; the LLM-backed
//! implementations live in [`crate::agents`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::types::{CriticFeedback, Delivery, Report, SearchItem, SearchPlan};

/// Turns a query into a set of searches
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, query: &str) -> Result<SearchPlan>;
}

/// Runs one search and summarizes the results
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, item: &SearchItem) -> Result<String>;
}

/// Writes a full report from the accumulated evidence
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(&self, query: &str, evidence: &[String]) -> Result<Report>;
}

/// Reviews a markdown report for gaps
#[async_trait]
pub trait Critic: Send + Sync {
    async fn review(&self, markdown_report: &str) -> Result<CriticFeedback>;
}

/// Delivers the finished markdown report
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, markdown_report: &str) -> Result<Delivery>;
}

/// One implementation per stage, shared by every run of a manager
#[derive(Clone)]
pub struct ResearchStages {
    pub planner: Arc<dyn Planner>,
    pub searcher: Arc<dyn Searcher>,
    pub writer: Arc<dyn Writer>,
    pub critic: Arc<dyn Critic>,
    pub deliverer: Arc<dyn Deliverer>,
}

impl ResearchStages {
    pub fn new(
        planner: Arc<dyn Planner>,
        searcher: Arc<dyn Searcher>,
        writer: Arc<dyn Writer>,
        critic: Arc<dyn Critic>,
        deliverer: Arc<dyn Deliverer>,
    ) -> Self {
        Self {
            planner,
            searcher,
            writer,
            critic,
            deliverer,
        }
    }
}
