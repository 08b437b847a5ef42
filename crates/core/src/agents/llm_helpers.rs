//! # LLM Helpers
//!
//! Provider dispatch for the stage adapters. radkit's provider clients are
//! distinct types, so the match happens once here and the caller's body is
//! instantiated for each concrete client.

/// Bind a radkit LLM client for `$config` to `$llm` and evaluate `$body`.
///
/// Must be used inside a function returning `anyhow::Result`.
#[macro_export]
macro_rules! with_llm {
    ($config:expr, |$llm:ident| $body:expr) => {{
        use radkit::models::providers::{
            AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
        };
        use $crate::models::LlmProvider;

        let config: &$crate::models::ModelConfig = $config;
        match config.provider {
            LlmProvider::Anthropic => {
                let $llm = AnthropicLlm::from_env(&config.model)?;
                $body
            }
            LlmProvider::OpenAI => {
                let $llm = match &config.base_url {
                    Some(base_url) => OpenAILlm::from_env(&config.model)?.with_base_url(base_url),
                    None => OpenAILlm::from_env(&config.model)?,
                };
                $body
            }
            LlmProvider::Gemini => {
                let $llm = GeminiLlm::from_env(&config.model)?;
                $body
            }
            LlmProvider::OpenRouter => {
                let $llm = OpenRouterLlm::from_env(&config.model)?;
                $body
            }
            LlmProvider::Grok => {
                let $llm = GrokLlm::from_env(&config.model)?;
                $body
            }
            LlmProvider::DeepSeek => {
                let $llm = DeepSeekLlm::from_env(&config.model)?;
                $body
            }
        }
    }};
}

/// Run a structured-output LLM call, yielding `anyhow::Result<$output>`.
#[macro_export]
macro_rules! run_structured {
    ($config:expr, $output:ty, $system_prompt:expr, $input:expr) => {
        $crate::with_llm!($config, |llm| {
            let func = radkit::agent::LlmFunction::<$output>::new_with_system_instructions(
                llm,
                $system_prompt,
            );
            let result: anyhow::Result<$output> = func.run($input).await.map_err(Into::into);
            result
        })
    };
}

/// Run a tool-using LLM worker, yielding `anyhow::Result<$output>`.
#[macro_export]
macro_rules! run_with_tools {
    ($config:expr, $output:ty, $system_prompt:expr, $input:expr, $($tool:expr),* $(,)?) => {
        $crate::with_llm!($config, |llm| {
            let worker = radkit::agent::LlmWorker::<$output>::builder(llm)
                .with_system_instructions($system_prompt)
                $(.with_tool($tool))*
                .build();
            let result: anyhow::Result<$output> = worker.run($input).await.map_err(Into::into);
            result
        })
    };
}
