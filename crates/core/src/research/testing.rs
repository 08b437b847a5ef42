//! Scripted in-memory stages for pipeline tests.
//!
//! Every double records what it was called with so tests can assert on
//! stage inputs, and can be told to fail or to slow down.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::stages::{Critic, Deliverer, Planner, ResearchStages, Searcher, Writer};
use super::types::{CriticFeedback, Delivery, Report, SearchItem, SearchPlan};

#[derive(Default)]
pub struct ScriptedPlanner {
    pub queries: Vec<String>,
    pub fail: bool,
    calls: AtomicUsize,
}

impl ScriptedPlanner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, _query: &str) -> Result<SearchPlan> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("planner returned malformed output"));
        }
        Ok(SearchPlan {
            searches: self
                .queries
                .iter()
                .map(|q| SearchItem::new(q.clone(), format!("needed for {}", q)))
                .collect(),
        })
    }
}

#[derive(Default)]
pub struct ScriptedSearcher {
    pub failing: HashSet<String>,
    pub delays_ms: HashMap<String, u64>,
    searched: Mutex<Vec<SearchItem>>,
}

impl ScriptedSearcher {
    pub fn searched(&self) -> Vec<SearchItem> {
        self.searched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Searcher for ScriptedSearcher {
    async fn search(&self, item: &SearchItem) -> Result<String> {
        self.searched.lock().unwrap().push(item.clone());
        if let Some(ms) = self.delays_ms.get(&item.query) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.failing.contains(&item.query) {
            return Err(anyhow!("search for '{}' timed out", item.query));
        }
        Ok(format!("result: {}", item.query))
    }
}

#[derive(Default)]
pub struct ScriptedWriter {
    pub fail: bool,
    /// Fail only the n-th call (1-based); 2 is the rewrite
    pub fail_on_call: Option<usize>,
    attempts: AtomicUsize,
    evidence: Mutex<Vec<Vec<String>>>,
}

impl ScriptedWriter {
    /// Evidence passed to each write call, in call order
    pub fn evidence(&self) -> Vec<Vec<String>> {
        self.evidence.lock().unwrap().clone()
    }

    pub fn evidence_lengths(&self) -> Vec<usize> {
        self.evidence().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl Writer for ScriptedWriter {
    async fn write(&self, _query: &str, evidence: &[String]) -> Result<Report> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail || self.fail_on_call == Some(attempt) {
            return Err(anyhow!("writer output failed to parse"));
        }
        let mut calls = self.evidence.lock().unwrap();
        calls.push(evidence.to_vec());
        Ok(Report::from_markdown(format!("report #{}", calls.len())))
    }
}

#[derive(Default)]
pub struct ScriptedCritic {
    pub suggestions: Vec<String>,
    pub fail: bool,
    reviewed: Mutex<Vec<String>>,
}

impl ScriptedCritic {
    pub fn reviewed(&self) -> Vec<String> {
        self.reviewed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Critic for ScriptedCritic {
    async fn review(&self, markdown_report: &str) -> Result<CriticFeedback> {
        if self.fail {
            return Err(anyhow!("critic unavailable"));
        }
        self.reviewed
            .lock()
            .unwrap()
            .push(markdown_report.to_string());
        Ok(CriticFeedback {
            missing_topics: vec!["costs".to_string()],
            weak_sections: vec![],
            suggested_searches: self.suggestions.clone(),
        })
    }
}

#[derive(Default)]
pub struct RecordingDeliverer {
    pub fail: bool,
    delivered: Mutex<Vec<String>>,
}

impl RecordingDeliverer {
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Deliverer for RecordingDeliverer {
    async fn deliver(&self, markdown_report: &str) -> Result<Delivery> {
        if self.fail {
            return Err(anyhow!("mail provider rejected the message"));
        }
        self.delivered
            .lock()
            .unwrap()
            .push(markdown_report.to_string());
        Ok(Delivery {
            status: "sent".to_string(),
        })
    }
}

/// A full set of scripted stages
pub struct Harness {
    pub planner: Arc<ScriptedPlanner>,
    pub searcher: Arc<ScriptedSearcher>,
    pub writer: Arc<ScriptedWriter>,
    pub critic: Arc<ScriptedCritic>,
    pub deliverer: Arc<RecordingDeliverer>,
}

impl Harness {
    /// Planner returns one search per query; everything else succeeds
    pub fn new(queries: &[&str]) -> Self {
        Self {
            planner: Arc::new(ScriptedPlanner {
                queries: queries.iter().map(|q| q.to_string()).collect(),
                ..Default::default()
            }),
            searcher: Arc::default(),
            writer: Arc::default(),
            critic: Arc::default(),
            deliverer: Arc::default(),
        }
    }

    pub fn stages(&self) -> ResearchStages {
        ResearchStages::new(
            self.planner.clone(),
            self.searcher.clone(),
            self.writer.clone(),
            self.critic.clone(),
            self.deliverer.clone(),
        )
    }

    // Builders run before the stages are shared, so the Arcs are unique.

    pub fn failing_search(mut self, query: &str) -> Self {
        searcher_mut(&mut self).failing.insert(query.to_string());
        self
    }

    pub fn search_delay(mut self, query: &str, ms: u64) -> Self {
        searcher_mut(&mut self)
            .delays_ms
            .insert(query.to_string(), ms);
        self
    }

    pub fn suggesting(mut self, searches: &[&str]) -> Self {
        Arc::get_mut(&mut self.critic).unwrap().suggestions =
            searches.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn failing_planner(mut self) -> Self {
        Arc::get_mut(&mut self.planner).unwrap().fail = true;
        self
    }

    pub fn failing_writer(mut self) -> Self {
        Arc::get_mut(&mut self.writer).unwrap().fail = true;
        self
    }

    pub fn failing_rewrite(mut self) -> Self {
        Arc::get_mut(&mut self.writer).unwrap().fail_on_call = Some(2);
        self
    }

    pub fn failing_critic(mut self) -> Self {
        Arc::get_mut(&mut self.critic).unwrap().fail = true;
        self
    }

    pub fn failing_deliverer(mut self) -> Self {
        Arc::get_mut(&mut self.deliverer).unwrap().fail = true;
        self
    }
}

fn searcher_mut(harness: &mut Harness) -> &mut ScriptedSearcher {
    Arc::get_mut(&mut harness.searcher).unwrap()
}
