//! # Stage Agents
//!
//! LLM-backed implementations of the research stage interfaces.
//!
//! | Stage    | Agent          | Output                  |
//! |----------|----------------|-------------------------|
//! | plan     | `PlannerAgent` | `SearchPlan`            |
//! | search   | `SearchAgent`  | summary text            |
//! | write    | `WriterAgent`  | `Report`                |
//! | critique | `CriticAgent`  | `CriticFeedback`        |
//! | deliver  | `EmailAgent`   | `Delivery` (SendGrid)   |

use std::sync::Arc;

use crate::config::ResearchConfig;
use crate::research::ResearchStages;

pub mod llm_helpers;
pub mod prompts;
pub mod tools;

pub mod critic_agent;
pub mod email_agent;
pub mod planner_agent;
pub mod search_agent;
pub mod writer_agent;

pub use critic_agent::CriticAgent;
pub use email_agent::EmailAgent;
pub use planner_agent::PlannerAgent;
pub use search_agent::SearchAgent;
pub use writer_agent::WriterAgent;

/// Wire up one agent per stage from the run configuration
pub fn build_stages(config: &ResearchConfig) -> ResearchStages {
    ResearchStages::new(
        Arc::new(PlannerAgent::new(
            config.model_config("planner"),
            config.searches_per_plan,
        )),
        Arc::new(SearchAgent::new(
            config.model_config("searcher"),
            config.searxng_url.clone(),
        )),
        Arc::new(WriterAgent::new(config.model_config("writer"))),
        Arc::new(CriticAgent::new(config.model_config("critic"))),
        Arc::new(EmailAgent::new(
            config.model_config("email"),
            config.email.clone(),
        )),
    )
}
