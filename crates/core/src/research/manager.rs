//! # Research Manager
//!
//! Entry point for a research run. [`ResearchManager::run`] returns a
//! pull-driven stream: every poll executes exactly one pipeline step and
//! yields exactly one status line. Nothing runs until the caller asks for
//! the next item, and the last item is the final report's markdown.
//!
//! ```rust,ignore
//! use futures::StreamExt;
//!
//! let manager = ResearchManager::new(stages);
//! let mut progress = manager.run("How do CRDTs handle deletes?");
//! while let Some(line) = progress.next().await {
//!     println!("{}", line?);
//! }
//! ```

use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::config::ResearchConfig;
use crate::error::ResearchError;

use super::events::{EventSink, ResearchEvent, ResearchEventKind};
use super::executor::execute_task;
use super::fan_out::{fan_out, FanOutOutcome};
use super::pipeline::{Pipeline, PipelineStage};
use super::stages::ResearchStages;
use super::types::{
    CriticFeedback, EvidenceSet, Report, RunTrace, SearchItem, SearchPlan,
    DEFAULT_TRACE_URL_TEMPLATE,
};

/// One item of a run's progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// Human-readable status line at a stage boundary
    Status(String),
    /// Final report markdown; always the last item of a successful run
    Report(String),
}

impl ProgressUpdate {
    pub fn into_text(self) -> String {
        match self {
            ProgressUpdate::Status(text) | ProgressUpdate::Report(text) => text,
        }
    }
}

/// Status text stream returned by [`ResearchManager::run`]
pub type ProgressStream = Pin<Box<dyn Stream<Item = Result<String, ResearchError>> + Send>>;

/// Typed stream returned by [`ResearchManager::run_updates`]
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<ProgressUpdate, ResearchError>> + Send>>;

/// Runs research queries through the stage pipeline
#[derive(Clone)]
pub struct ResearchManager {
    stages: ResearchStages,
    trace_url_template: String,
    events: EventSink,
}

impl ResearchManager {
    /// Create a manager with the default trace link
    pub fn new(stages: ResearchStages) -> Self {
        Self {
            stages,
            trace_url_template: DEFAULT_TRACE_URL_TEMPLATE.to_string(),
            events: EventSink::default(),
        }
    }

    /// Create a manager using run settings from `config`
    pub fn from_config(stages: ResearchStages, config: &ResearchConfig) -> Self {
        Self::new(stages).with_trace_url_template(config.trace_url_template.clone())
    }

    /// Override the trace link template (must contain `{trace_id}`)
    pub fn with_trace_url_template(mut self, template: impl Into<String>) -> Self {
        self.trace_url_template = template.into();
        self
    }

    /// Set event channel for structured run events
    pub fn with_event_channel(mut self, tx: mpsc::Sender<ResearchEvent>) -> Self {
        self.events = EventSink::new(Some(tx));
        self
    }

    /// Start a run, yielding status lines and finally the report markdown
    pub fn run(&self, query: &str) -> ProgressStream {
        Box::pin(
            self.run_updates(query)
                .map(|item| item.map(ProgressUpdate::into_text)),
        )
    }

    /// Start a run, yielding typed progress updates
    pub fn run_updates(&self, query: &str) -> UpdateStream {
        let run = ResearchRun {
            query: query.to_string(),
            stages: self.stages.clone(),
            trace_url_template: self.trace_url_template.clone(),
            events: self.events.clone(),
            pipeline: Pipeline::new(),
            trace: None,
            plan: SearchPlan::default(),
            evidence: EvidenceSet::default(),
            report: None,
            feedback: CriticFeedback::default(),
        };

        Box::pin(stream::unfold(run, |mut run| async move {
            match run.step().await {
                Ok(Some(update)) => Some((Ok(update), run)),
                Ok(None) => None,
                Err(e) => {
                    run.abort(&e);
                    Some((Err(e), run))
                }
            }
        }))
    }
}

/// State of a single run, owned by its stream
struct ResearchRun {
    query: String,
    stages: ResearchStages,
    trace_url_template: String,
    events: EventSink,
    pipeline: Pipeline,
    trace: Option<RunTrace>,
    plan: SearchPlan,
    evidence: EvidenceSet,
    report: Option<Report>,
    feedback: CriticFeedback,
}

impl ResearchRun {
    fn trace_id(&self) -> &str {
        self.trace.as_ref().map(|t| t.id.as_str()).unwrap_or_default()
    }

    fn emit(&self, kind: ResearchEventKind, data: Option<serde_json::Value>) {
        self.emit_for(self.pipeline.stage, kind, data);
    }

    fn emit_for(
        &self,
        stage: PipelineStage,
        kind: ResearchEventKind,
        data: Option<serde_json::Value>,
    ) {
        let event = ResearchEvent::new(kind, stage, self.trace_id());
        self.events.emit(match data {
            Some(data) => event.with_data(data),
            None => event,
        });
    }

    fn current_report(&self) -> Result<&Report, ResearchError> {
        self.report.as_ref().ok_or(ResearchError::MissingReport {
            stage: self.pipeline.stage,
        })
    }

    fn abort(&mut self, error: &ResearchError) {
        tracing::error!(trace_id = %self.trace_id(), "Research run aborted: {}", error);
        self.emit(
            ResearchEventKind::RunFailed,
            Some(serde_json::json!({ "error": error.to_string() })),
        );
        self.pipeline.fail();
    }

    /// Execute the current stage and produce its status line.
    ///
    /// Returns `Ok(None)` once the run has finished or failed.
    #[tracing::instrument(skip(self), fields(stage = %self.pipeline.stage))]
    async fn step(&mut self) -> Result<Option<ProgressUpdate>, ResearchError> {
        if self.pipeline.is_complete() {
            tracing::debug!(success = self.pipeline.is_success(), "Research run finished");
            return Ok(None);
        }

        let stage = self.pipeline.stage;
        if !matches!(stage, PipelineStage::Start | PipelineStage::Finish) {
            self.emit(ResearchEventKind::StageStarted, None);
        }

        let update = match stage {
            PipelineStage::Start => {
                let trace = RunTrace::generate();
                let link = trace.link(&self.trace_url_template);
                tracing::info!(trace_id = %trace.id, "View trace: {}", link);
                self.trace = Some(trace);
                self.emit(
                    ResearchEventKind::RunStarted,
                    Some(serde_json::json!({ "query": self.query, "trace_url": link })),
                );
                self.pipeline.advance();
                ProgressUpdate::Status(format!("View trace: {}", link))
            }
            PipelineStage::Plan => {
                tracing::info!("Planning searches...");
                self.plan = self
                    .stages
                    .planner
                    .plan(&self.query)
                    .await
                    .map_err(|e| ResearchError::stage(stage, e))?;
                tracing::info!("Will perform {} searches", self.plan.len());
                self.pipeline.advance();
                ProgressUpdate::Status("Searches planned, starting to search...".to_string())
            }
            PipelineStage::Search => {
                let outcome = self.search(self.plan.searches.clone()).await;
                tracing::info!(
                    "Finished searching: {} of {} searches returned results",
                    outcome.results.len(),
                    outcome.total
                );
                self.evidence = EvidenceSet::new(outcome.results);
                self.pipeline.advance();
                ProgressUpdate::Status("Searches complete, writing report...".to_string())
            }
            PipelineStage::Write => {
                self.write(stage).await?;
                self.pipeline.advance();
                ProgressUpdate::Status("Initial report written...".to_string())
            }
            PipelineStage::Critique => {
                tracing::info!("Reviewing report for gaps...");
                let markdown = self.current_report()?.markdown_report.clone();
                self.feedback = self
                    .stages
                    .critic
                    .review(&markdown)
                    .await
                    .map_err(|e| ResearchError::stage(stage, e))?;

                let suggested = self.feedback.suggested_searches.len();
                tracing::info!(
                    missing_topics = self.feedback.missing_topics.len(),
                    weak_sections = self.feedback.weak_sections.len(),
                    "Critic review complete, {} follow-up searches suggested",
                    suggested
                );
                self.emit(
                    ResearchEventKind::StageCompleted,
                    Some(serde_json::to_value(&self.feedback).unwrap_or_default()),
                );
                let feedback = self.feedback.clone();
                if self.pipeline.gate(&feedback) {
                    ProgressUpdate::Status(format!(
                        "Report reviewed, {} follow-up searches suggested...",
                        suggested
                    ))
                } else {
                    ProgressUpdate::Status(
                        "Report reviewed, no follow-up searches needed...".to_string(),
                    )
                }
            }
            PipelineStage::FollowUp => {
                tracing::info!("Performing follow-up searches...");
                let plan = self.feedback.followup_plan();
                let outcome = self.search(plan.searches).await;
                self.evidence.extend(outcome.results);
                tracing::info!(
                    "Follow-up searches complete, evidence set now {}",
                    self.evidence.len()
                );
                self.pipeline.advance();
                ProgressUpdate::Status(
                    "Follow-up research complete, rewriting report...".to_string(),
                )
            }
            PipelineStage::Rewrite => {
                self.write(stage).await?;
                self.pipeline.advance();
                ProgressUpdate::Status("Improved report written...".to_string())
            }
            PipelineStage::Deliver => {
                tracing::info!("Writing email...");
                let markdown = self.current_report()?.markdown_report.clone();
                let delivery = self
                    .stages
                    .deliverer
                    .deliver(&markdown)
                    .await
                    .map_err(|e| ResearchError::stage(stage, e))?;
                tracing::info!(status = %delivery.status, "Email sent");
                self.pipeline.advance();
                ProgressUpdate::Status("Email sent, research complete".to_string())
            }
            PipelineStage::Finish => {
                let markdown = self.current_report()?.markdown_report.clone();
                self.emit(
                    ResearchEventKind::RunCompleted,
                    Some(serde_json::json!({
                        "refined": self.pipeline.refined,
                        "evidence": self.evidence.len(),
                    })),
                );
                self.pipeline.advance();
                ProgressUpdate::Report(markdown)
            }
            PipelineStage::Complete | PipelineStage::Failed => return Ok(None),
        };

        // Critique reports its own completion with the feedback attached
        if !matches!(
            stage,
            PipelineStage::Start | PipelineStage::Critique | PipelineStage::Finish
        ) {
            self.emit_for(stage, ResearchEventKind::StageCompleted, None);
        }

        Ok(Some(update))
    }

    /// Write (or rewrite) the report from the whole evidence set
    async fn write(&mut self, stage: PipelineStage) -> Result<(), ResearchError> {
        tracing::info!(evidence = self.evidence.len(), "Thinking about report...");
        let report = self
            .stages
            .writer
            .write(&self.query, self.evidence.as_slice())
            .await
            .map_err(|e| ResearchError::stage(stage, e))?;
        tracing::info!("Finished writing report");
        self.report = Some(report);
        Ok(())
    }

    /// Fan out one search per item; failed searches are dropped
    async fn search(&self, items: Vec<SearchItem>) -> FanOutOutcome<String> {
        tracing::info!("Searching...");
        let stage = self.pipeline.stage;
        let searcher = self.stages.searcher.clone();
        let events = self.events.clone();
        let trace_id = self.trace_id().to_string();

        fan_out(
            items,
            |item| {
                let searcher = searcher.clone();
                let events = events.clone();
                let trace_id = trace_id.clone();
                async move {
                    let result = execute_task(&item.query, searcher.search(&item)).await;
                    if result.is_none() {
                        events.emit(
                            ResearchEvent::new(ResearchEventKind::SearchFailed, stage, &trace_id)
                                .with_data(serde_json::json!({ "query": item.query })),
                        );
                    }
                    result
                }
            },
            |progress| {
                tracing::info!("Searching... {}", progress);
                events.emit(
                    ResearchEvent::new(ResearchEventKind::SearchProgress, stage, &trace_id)
                        .with_data(serde_json::json!({
                            "completed": progress.completed,
                            "total": progress.total,
                        })),
                );
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::Harness;
    use crate::research::types::FOLLOWUP_REASON;
    use std::collections::HashSet;

    async fn collect(stream: ProgressStream) -> Vec<Result<String, ResearchError>> {
        stream.collect().await
    }

    fn ok_lines(items: Vec<Result<String, ResearchError>>) -> Vec<String> {
        items
            .into_iter()
            .map(|item| item.expect("stage should not fail"))
            .collect()
    }

    #[tokio::test]
    async fn test_scenario_all_searches_succeed_no_followup() {
        let harness = Harness::new(&["a", "b", "c"]);
        let manager = ResearchManager::new(harness.stages());

        let lines = ok_lines(collect(manager.run("X")).await);

        assert_eq!(lines.len(), 7, "six status lines plus the report: {:?}", lines);
        assert!(lines[0]
            .starts_with("View trace: https://platform.openai.com/traces/trace?trace_id=trace_"));
        assert_eq!(
            &lines[1..6],
            &[
                "Searches planned, starting to search...",
                "Searches complete, writing report...",
                "Initial report written...",
                "Report reviewed, no follow-up searches needed...",
                "Email sent, research complete",
            ]
        );
        assert_eq!(lines[6], "report #1");

        assert_eq!(harness.planner.calls(), 1);
        assert_eq!(harness.writer.evidence_lengths(), vec![3]);
        assert_eq!(harness.critic.reviewed(), vec!["report #1"]);
        assert_eq!(harness.deliverer.delivered(), vec!["report #1"]);
    }

    #[tokio::test]
    async fn test_scenario_one_search_fails() {
        let harness = Harness::new(&["a", "b", "c"]).failing_search("b");
        let manager = ResearchManager::new(harness.stages());

        let lines = ok_lines(collect(manager.run("X")).await);

        assert_eq!(harness.writer.evidence_lengths(), vec![2]);
        let evidence: HashSet<String> = harness.writer.evidence()[0].iter().cloned().collect();
        let expected: HashSet<String> = ["result: a", "result: c"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(evidence, expected);

        assert_eq!(lines.last().map(String::as_str), Some("report #1"));
        assert_eq!(harness.deliverer.delivered().len(), 1);
    }

    #[tokio::test]
    async fn test_scenario_critic_requests_followup() {
        let harness = Harness::new(&["a", "b", "c"]).suggesting(&["Y", "Z"]);
        let manager = ResearchManager::new(harness.stages());

        let lines = ok_lines(collect(manager.run("X")).await);

        assert_eq!(lines.len(), 9, "{:?}", lines);
        assert_eq!(lines[4], "Report reviewed, 2 follow-up searches suggested...");
        assert_eq!(lines[5], "Follow-up research complete, rewriting report...");
        assert_eq!(lines[6], "Improved report written...");
        assert_eq!(lines[7], "Email sent, research complete");
        assert_eq!(lines[8], "report #2");

        // Second fan-out was exactly the critic's searches
        let searched = harness.searcher.searched();
        assert_eq!(searched.len(), 5);
        let followups: Vec<&SearchItem> = searched[3..].iter().collect();
        let queries: HashSet<&str> = followups.iter().map(|i| i.query.as_str()).collect();
        assert_eq!(queries, ["Y", "Z"].into_iter().collect());
        assert!(followups.iter().all(|i| i.reason == FOLLOWUP_REASON));

        // Evidence only grows: the rewrite sees the initial results plus follow-ups
        assert_eq!(harness.writer.evidence_lengths(), vec![3, 5]);
        let evidence = harness.writer.evidence();
        let initial: HashSet<&String> = evidence[0].iter().collect();
        let rewrite_prefix: HashSet<&String> = evidence[1][..3].iter().collect();
        assert_eq!(initial, rewrite_prefix);

        // One critique, one rewrite, delivery of the rewritten report
        assert_eq!(harness.critic.reviewed(), vec!["report #1"]);
        assert_eq!(harness.deliverer.delivered(), vec!["report #2"]);
    }

    #[tokio::test]
    async fn test_followup_with_all_searches_failing_still_rewrites() {
        let harness = Harness::new(&["a"])
            .suggesting(&["Y"])
            .failing_search("Y");
        let manager = ResearchManager::new(harness.stages());

        let lines = ok_lines(collect(manager.run("X")).await);

        assert_eq!(harness.writer.evidence_lengths(), vec![1, 1]);
        assert_eq!(lines.last().map(String::as_str), Some("report #2"));
    }

    #[tokio::test]
    async fn test_writer_failure_aborts_before_critique() {
        let harness = Harness::new(&["a", "b", "c"]).failing_writer();
        let manager = ResearchManager::new(harness.stages());

        let items = collect(manager.run("X")).await;

        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(|item| item.is_ok()));
        let err = items[3].as_ref().unwrap_err();
        assert_eq!(err.failed_stage(), Some(PipelineStage::Write));

        assert!(harness.critic.reviewed().is_empty());
        assert!(harness.deliverer.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_failure_never_emits_stale_report() {
        let harness = Harness::new(&["a", "b"])
            .suggesting(&["Y"])
            .failing_rewrite();
        let manager = ResearchManager::new(harness.stages());

        let items = collect(manager.run("X")).await;

        assert_eq!(items.len(), 7, "six status lines then the error");
        assert!(items[..6].iter().all(|item| item.is_ok()));
        assert_eq!(
            items[6].as_ref().unwrap_err().failed_stage(),
            Some(PipelineStage::Rewrite)
        );

        // The initial report was written and reviewed but never delivered or emitted
        assert_eq!(harness.critic.reviewed(), vec!["report #1"]);
        assert!(harness.deliverer.delivered().is_empty());
        assert!(!items
            .iter()
            .any(|item| matches!(item, Ok(text) if text == "report #1")));
    }

    #[tokio::test]
    async fn test_planner_failure_aborts_before_search() {
        let harness = Harness::new(&["a"]).failing_planner();
        let manager = ResearchManager::new(harness.stages());

        let items = collect(manager.run("X")).await;

        assert_eq!(items.len(), 2);
        tokio_test::assert_ok!(&items[0]);
        tokio_test::assert_err!(&items[1]);
        assert!(harness.searcher.searched().is_empty());
        assert!(harness.writer.evidence_lengths().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_withholds_report() {
        let harness = Harness::new(&["a"]).failing_deliverer();
        let manager = ResearchManager::new(harness.stages());

        let items = collect(manager.run("X")).await;

        let last = items.last().unwrap();
        assert_eq!(
            last.as_ref().unwrap_err().failed_stage(),
            Some(PipelineStage::Deliver)
        );
        assert!(!items
            .iter()
            .any(|item| matches!(item, Ok(text) if text == "report #1")));
    }

    #[tokio::test]
    async fn test_stream_is_pull_driven() {
        let harness = Harness::new(&["a", "b"]);
        let manager = ResearchManager::new(harness.stages());
        let mut stream = manager.run("X");

        assert_eq!(harness.planner.calls(), 0);

        let first = stream.next().await.unwrap().unwrap();
        assert!(first.starts_with("View trace: "));
        assert_eq!(harness.planner.calls(), 0);

        stream.next().await.unwrap().unwrap();
        assert_eq!(harness.planner.calls(), 1);
        assert!(harness.searcher.searched().is_empty());

        stream.next().await.unwrap().unwrap();
        assert_eq!(harness.searcher.searched().len(), 2);
        assert!(harness.writer.evidence_lengths().is_empty());

        drop(stream);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(harness.writer.evidence_lengths().is_empty());
        assert!(harness.critic.reviewed().is_empty());
        assert!(harness.deliverer.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_status_order_independent_of_search_speed() {
        let harness = Harness::new(&["slow", "fast", "medium"])
            .search_delay("slow", 40)
            .search_delay("medium", 15)
            .suggesting(&["later"]);
        let manager = ResearchManager::new(harness.stages());

        let lines = ok_lines(collect(manager.run("X")).await);

        assert!(lines[0].starts_with("View trace: "));
        assert_eq!(
            &lines[1..8],
            &[
                "Searches planned, starting to search...",
                "Searches complete, writing report...",
                "Initial report written...",
                "Report reviewed, 1 follow-up searches suggested...",
                "Follow-up research complete, rewriting report...",
                "Improved report written...",
                "Email sent, research complete",
            ]
        );
    }

    #[tokio::test]
    async fn test_each_run_gets_its_own_trace() {
        let harness = Harness::new(&["a"]);
        let manager = ResearchManager::new(harness.stages())
            .with_trace_url_template("https://traces.local/{trace_id}");

        let first = manager.run("X").next().await.unwrap().unwrap();
        let second = manager.run("X").next().await.unwrap().unwrap();

        assert!(first.starts_with("View trace: https://traces.local/trace_"));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_typed_updates_end_with_report() {
        let harness = Harness::new(&["a"]);
        let manager = ResearchManager::new(harness.stages());

        let updates: Vec<ProgressUpdate> = manager
            .run_updates("X")
            .map(|item| item.unwrap())
            .collect()
            .await;

        let (last, rest) = updates.split_last().unwrap();
        assert_eq!(last, &ProgressUpdate::Report("report #1".to_string()));
        assert!(rest.iter().all(|u| matches!(u, ProgressUpdate::Status(_))));
    }

    #[tokio::test]
    async fn test_events_report_fan_out_progress() {
        let harness = Harness::new(&["a", "b", "c"]).failing_search("a");
        let (tx, mut rx) = mpsc::channel(128);
        let manager = ResearchManager::new(harness.stages()).with_event_channel(tx);

        let _ = collect(manager.run("X")).await;
        drop(manager);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.first().map(|e| e.kind), Some(ResearchEventKind::RunStarted));
        assert_eq!(events.last().map(|e| e.kind), Some(ResearchEventKind::RunCompleted));

        let progress: Vec<u64> = events
            .iter()
            .filter(|e| e.kind == ResearchEventKind::SearchProgress)
            .map(|e| e.data.as_ref().unwrap()["completed"].as_u64().unwrap())
            .collect();
        assert_eq!(progress, vec![1, 2, 3]);

        let failed: Vec<&ResearchEvent> = events
            .iter()
            .filter(|e| e.kind == ResearchEventKind::SearchFailed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].data.as_ref().unwrap()["query"], "a");

        let trace_id = &events[0].trace_id;
        assert!(events.iter().all(|e| &e.trace_id == trace_id));
    }

    #[tokio::test]
    async fn test_failed_run_emits_run_failed() {
        let harness = Harness::new(&["a"]).failing_critic();
        let (tx, mut rx) = mpsc::channel(128);
        let manager = ResearchManager::new(harness.stages()).with_event_channel(tx);

        let items = collect(manager.run("X")).await;
        drop(manager);

        assert_eq!(
            items.last().unwrap().as_ref().unwrap_err().failed_stage(),
            Some(PipelineStage::Critique)
        );

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.kind);
        }
        assert_eq!(kinds.last(), Some(&ResearchEventKind::RunFailed));
        assert!(!kinds.contains(&ResearchEventKind::RunCompleted));
    }
}
