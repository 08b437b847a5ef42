//! # Email Agent
//!
//! Delivers the final report: an LLM call turns the markdown into a subject
//! line and HTML body, which is then sent through the SendGrid v3 API.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agents::prompts::EMAIL;
use crate::config::EmailConfig;
use crate::models::ModelConfig;
use crate::research::{Deliverer, Delivery};
use crate::run_structured;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Formatted email ready to send
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct EmailContent {
    /// Subject line for the email
    pub subject: String,
    /// Email body as HTML
    pub html_body: String,
}

pub struct EmailAgent {
    config: ModelConfig,
    email: EmailConfig,
    client: reqwest::Client,
}

impl EmailAgent {
    pub fn new(config: ModelConfig, email: EmailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            config,
            email,
            client,
        }
    }

    /// Request body for SendGrid's mail/send endpoint
    fn payload(&self, content: &EmailContent) -> Value {
        json!({
            "personalizations": [{ "to": [{ "email": self.email.to_address }] }],
            "from": { "email": self.email.from_address },
            "subject": content.subject,
            "content": [{ "type": "text/html", "value": content.html_body }],
        })
    }

    async fn send(&self, content: &EmailContent) -> Result<Delivery> {
        let api_key = std::env::var(&self.email.api_key_env)
            .with_context(|| format!("{} is not set", self.email.api_key_env))?;

        let response = self
            .client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(api_key)
            .json(&self.payload(content))
            .send()
            .await
            .context("Failed to reach SendGrid")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("SendGrid rejected the email ({}): {}", status, body);
        }

        Ok(Delivery {
            status: format!("accepted ({})", status.as_u16()),
        })
    }
}

#[async_trait]
impl Deliverer for EmailAgent {
    async fn deliver(&self, markdown_report: &str) -> Result<Delivery> {
        let content = run_structured!(
            &self.config,
            EmailContent,
            EMAIL,
            markdown_report.to_string()
        )
        .context("Email formatting failed")?;

        tracing::info!(subject = %content.subject, to = %self.email.to_address, "Sending email");
        self.send(&content).await
    }
}
