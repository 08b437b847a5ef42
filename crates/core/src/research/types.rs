//! # Research Types
//!
//! Data passed between pipeline stages. Every value here is produced once
//! and never mutated afterwards, except [`EvidenceSet`] which only grows.

use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason attached to searches suggested by the critic.
pub const FOLLOWUP_REASON: &str = "Suggested by critic to improve report quality";

/// Default trace viewer link. `{trace_id}` is substituted at run start.
pub const DEFAULT_TRACE_URL_TEMPLATE: &str =
    "https://platform.openai.com/traces/trace?trace_id={trace_id}";

/// A single planned web search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct SearchItem {
    /// The search term to use for the web search
    pub query: String,
    /// Why this search is important to the query
    pub reason: String,
}

impl SearchItem {
    pub fn new(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            reason: reason.into(),
        }
    }
}

/// The set of searches to fan out for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct SearchPlan {
    /// Searches to perform, in planning order
    pub searches: Vec<SearchItem>,
}

impl SearchPlan {
    pub fn len(&self) -> usize {
        self.searches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }
}

/// A written research report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct Report {
    /// A short 2-3 sentence summary of the findings
    #[serde(default)]
    pub short_summary: String,
    /// The final report in markdown
    pub markdown_report: String,
    /// Suggested topics to research further
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

impl Report {
    pub fn from_markdown(markdown: impl Into<String>) -> Self {
        Self {
            short_summary: String::new(),
            markdown_report: markdown.into(),
            follow_up_questions: Vec::new(),
        }
    }
}

/// Critic review of a single report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct CriticFeedback {
    /// Important topics or perspectives missing from the report
    #[serde(default)]
    pub missing_topics: Vec<String>,
    /// Sections that lack depth, clarity, or evidence
    #[serde(default)]
    pub weak_sections: Vec<String>,
    /// Concrete search queries to improve the report
    #[serde(default)]
    pub suggested_searches: Vec<String>,
}

impl CriticFeedback {
    /// Whether the refinement gate should open a follow-up round.
    pub fn wants_followup(&self) -> bool {
        !self.suggested_searches.is_empty()
    }

    /// Turn suggested searches into a plan for the follow-up fan-out.
    pub fn followup_plan(&self) -> SearchPlan {
        SearchPlan {
            searches: self
                .suggested_searches
                .iter()
                .map(|query| SearchItem::new(query.clone(), FOLLOWUP_REASON))
                .collect(),
        }
    }
}

/// Delivery acknowledgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub status: String,
}

/// Search result text accumulated across a run.
///
/// Append-only: entries are never removed or replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceSet(Vec<String>);

impl EvidenceSet {
    pub fn new(results: Vec<String>) -> Self {
        Self(results)
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = String>) {
        self.0.extend(results);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Correlation id for one run, surfaced to external trace tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTrace {
    pub id: String,
}

impl RunTrace {
    /// Generate a fresh `trace_<32 hex>` identifier
    pub fn generate() -> Self {
        Self {
            id: format!("trace_{}", Uuid::new_v4().simple()),
        }
    }

    /// Render the trace viewer link from a template containing `{trace_id}`
    pub fn link(&self, template: &str) -> String {
        template.replace("{trace_id}", &self.id)
    }
}
