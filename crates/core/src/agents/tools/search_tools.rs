//! # Search Tools
//!
//! Web search backed by SearXNG's JSON API. A configured private instance
//! is tried first, then public instances, then a local default.

use std::time::Duration;

use radkit::tools::{FunctionTool, ToolResult};
use serde_json::{json, Value};

const PUBLIC_INSTANCES: [&str; 3] = [
    "https://searx.be",
    "https://search.sapti.me",
    "https://searx.tiekoetter.com",
];

const LOCAL_INSTANCE: &str = "http://localhost:8888";

const DEFAULT_MAX_RESULTS: u64 = 5;

/// Build the `search_web` tool over a fixed list of SearXNG endpoints
pub fn search_web(endpoints: Vec<String>) -> FunctionTool {
    FunctionTool::new(
        "search_web",
        "Search the web for a term. Returns results with titles, URLs and snippets. \
         Args: {\"query\": \"search term\", \"max_results\": 5}",
        move |args, _ctx| {
            let endpoints = endpoints.clone();
            Box::pin(async move {
                let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("");
                if query.trim().is_empty() {
                    return ToolResult::error("query must not be empty");
                }
                let max_results = args
                    .get("max_results")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(DEFAULT_MAX_RESULTS)
                    .clamp(1, 20) as usize;

                match query_searxng(&endpoints, query, max_results).await {
                    Some(results) => ToolResult::success(json!({
                        "query": query,
                        "results": results
                    })),
                    None => ToolResult::error(format!(
                        "No search backend answered for '{}'. Set searxng_url in the config.",
                        query
                    )),
                }
            })
        },
    )
}

/// Search endpoints in the order they should be tried
pub fn searxng_endpoints(custom: Option<String>) -> Vec<String> {
    custom
        .iter()
        .map(|url| url.trim_end_matches('/').to_string())
        .chain(PUBLIC_INSTANCES.iter().map(|url| url.to_string()))
        .chain(std::iter::once(LOCAL_INSTANCE.to_string()))
        .map(|base| format!("{}/search", base))
        .collect()
}

/// Pull `title`, `url` and `snippet` out of a SearXNG response
pub fn extract_results(response: &Value, max_results: usize) -> Option<Vec<Value>> {
    let results = response.get("results")?.as_array()?;
    Some(
        results
            .iter()
            .take(max_results)
            .map(|r| {
                let field = |name: &str| r.get(name).and_then(Value::as_str).unwrap_or("");
                json!({
                    "title": field("title"),
                    "url": field("url"),
                    "snippet": field("content"),
                })
            })
            .collect(),
    )
}

async fn query_searxng(
    endpoints: &[String],
    query: &str,
    max_results: usize,
) -> Option<Vec<Value>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .ok()?;

    for endpoint in endpoints {
        let url = format!("{}?q={}&format=json", endpoint, urlencoding::encode(query));
        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(endpoint = %endpoint, "SearXNG request failed: {}", e);
                continue;
            }
        };
        if let Ok(body) = response.json::<Value>().await {
            if let Some(results) = extract_results(&body, max_results) {
                return Some(results);
            }
        }
    }

    None
}
