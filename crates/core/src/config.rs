//! # Research Configuration
//!
//! Run-wide settings: model selection per stage, trace link template,
//! plan size, search backend and delivery addresses. Persisted as JSON at
//! [`DEFAULT_CONFIG_PATH`]; API keys always come from the environment.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ResearchError;
use crate::models::{LlmProvider, ModelConfig};
use crate::research::types::DEFAULT_TRACE_URL_TEMPLATE;

/// Where `ResearchConfig::load_default` looks for a config file
pub const DEFAULT_CONFIG_PATH: &str = ".deep-research/config.json";

/// Stage adapter ids used for per-stage overrides
pub const STAGE_IDS: [&str; 5] = ["planner", "searcher", "writer", "critic", "email"];

/// Email delivery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Sender address (must be verified with the provider)
    pub from_address: String,
    /// Recipient address
    pub to_address: String,
    /// Environment variable holding the SendGrid API key
    pub api_key_env: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from_address: "research@example.com".to_string(),
            to_address: "research@example.com".to_string(),
            api_key_env: "SENDGRID_API_KEY".to_string(),
        }
    }
}

/// Configuration for a research run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Global LLM provider
    pub global_provider: LlmProvider,
    /// Global model to use for all stages
    pub global_model: Option<String>,
    /// Base URL override for LLM API (for OpenAI-compatible endpoints)
    pub base_url: Option<String>,
    /// Per-stage model overrides (stage id -> model name)
    pub per_stage_models: HashMap<String, String>,
    /// Per-stage provider overrides (stage id -> provider)
    pub per_stage_providers: HashMap<String, LlmProvider>,
    /// Trace viewer link, must contain `{trace_id}`
    pub trace_url_template: String,
    /// How many searches the planner is asked for
    pub searches_per_plan: usize,
    /// Custom SearXNG instance URL
    pub searxng_url: Option<String>,
    /// Delivery settings
    pub email: EmailConfig,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            global_provider: LlmProvider::OpenAI,
            global_model: None,
            base_url: None,
            per_stage_models: HashMap::new(),
            per_stage_providers: HashMap::new(),
            trace_url_template: DEFAULT_TRACE_URL_TEMPLATE.to_string(),
            searches_per_plan: 5,
            searxng_url: None,
            email: EmailConfig::default(),
        }
    }
}

impl ResearchConfig {
    /// Load config from `path`, falling back to defaults when it does not exist
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        Self::read(path).await
    }

    /// Load config from an explicitly chosen `path`; a missing file is an error
    pub async fn load_required(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        Self::read(path).await
    }

    async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from [`DEFAULT_CONFIG_PATH`]
    pub async fn load_default() -> Result<Self> {
        Self::load(DEFAULT_CONFIG_PATH).await
    }

    /// Save config as pretty JSON, creating parent directories
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Reject settings that would break a run
    pub fn validate(&self) -> Result<(), ResearchError> {
        if !self.trace_url_template.contains("{trace_id}") {
            return Err(ResearchError::Config(format!(
                "trace_url_template must contain {{trace_id}}: {}",
                self.trace_url_template
            )));
        }
        if self.searches_per_plan == 0 {
            return Err(ResearchError::Config(
                "searches_per_plan must be at least 1".to_string(),
            ));
        }
        if let Some(stage) = self
            .per_stage_models
            .keys()
            .chain(self.per_stage_providers.keys())
            .find(|id| !STAGE_IDS.contains(&id.as_str()))
        {
            return Err(ResearchError::Config(format!("unknown stage id: {}", stage)));
        }
        Ok(())
    }

    /// Resolve the model config for a stage adapter
    pub fn model_config(&self, stage_id: &str) -> ModelConfig {
        // Provider: per-stage override -> global
        let provider = self
            .per_stage_providers
            .get(stage_id)
            .copied()
            .unwrap_or(self.global_provider);

        // Model: per-stage override -> global -> default for provider
        let model = self
            .per_stage_models
            .get(stage_id)
            .or(self.global_model.as_ref())
            .cloned()
            .unwrap_or_else(|| provider.default_model().to_string());

        let base_url = if provider.supports_base_url() {
            self.base_url.clone()
        } else {
            None
        };

        ModelConfig {
            provider,
            model,
            base_url,
        }
    }
}
