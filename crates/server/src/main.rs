//! Deep Research Server
//!
//! CLI and HTTP front end for the research pipeline. `run` streams progress
//! lines to stdout; `serve` exposes the same stream over Server-Sent Events.

use axum::{
    body::Body,
    extract::State,
    http::{header, Response, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use deep_research_core::{
    agents,
    config::{ResearchConfig, STAGE_IDS},
    ProgressUpdate, ResearchError, ResearchManager,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::{OpenApi, ToSchema};

/// Application state
struct AppState {
    manager: ResearchManager,
    config: ResearchConfig,
}

type SharedState = Arc<AppState>;

// === API Types ===

#[derive(Deserialize, ToSchema)]
struct ResearchRequest {
    query: String,
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize, ToSchema)]
struct StageModel {
    stage: String,
    provider: String,
    model: String,
}

#[derive(Serialize, ToSchema)]
struct ConfigResponse {
    global_provider: String,
    stages: Vec<StageModel>,
    searches_per_plan: usize,
    trace_url_template: String,
    search_backend: Option<String>,
    email_to: String,
}

impl From<&ResearchConfig> for ConfigResponse {
    fn from(config: &ResearchConfig) -> Self {
        let stages = STAGE_IDS
            .iter()
            .map(|stage| {
                let model = config.model_config(stage);
                StageModel {
                    stage: stage.to_string(),
                    provider: model.provider.display_name().to_string(),
                    model: model.model,
                }
            })
            .collect();

        Self {
            global_provider: config.global_provider.display_name().to_string(),
            stages,
            searches_per_plan: config.searches_per_plan,
            trace_url_template: config.trace_url_template.clone(),
            search_backend: config.searxng_url.clone(),
            email_to: config.email.to_address.clone(),
        }
    }
}

#[derive(Parser, Clone)]
#[command(
    author,
    version,
    about = "Deep Research - plan, search, write and deliver a report"
)]
struct Args {
    /// Config file (defaults to .deep-research/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the HTTP server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Run one research query and print progress (CLI mode, no server)
    Run {
        /// The question to research
        query: String,
    },
}

// === Handlers ===

/// SSE event name and payload for one stream item
fn sse_parts(item: Result<ProgressUpdate, ResearchError>) -> (&'static str, String) {
    match item {
        Ok(ProgressUpdate::Status(line)) => ("status", line),
        Ok(ProgressUpdate::Report(markdown)) => ("report", markdown),
        Err(e) => ("error", e.to_string()),
    }
}

fn validate_query(query: &str) -> Result<&str, (StatusCode, String)> {
    let query = query.trim();
    if query.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "query must not be empty".to_string(),
        ));
    }
    Ok(query)
}

/// Run a research query, streaming progress as Server-Sent Events
#[utoipa::path(
    post,
    path = "/api/v1/research",
    tag = "research",
    request_body = ResearchRequest,
    responses(
        (
            status = 200,
            description = "SSE stream of `status` events, then one `report` or `error` event"
        ),
        (status = 400, description = "Empty query")
    )
)]
async fn start_research(
    State(state): State<SharedState>,
    Json(req): Json<ResearchRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let query = validate_query(&req.query)?;
    tracing::info!(query, "Research requested");

    let stream = state.manager.run_updates(query).map(|item| {
        let (name, data) = sse_parts(item);
        Ok(Event::default().event(name).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Get current configuration (no secrets)
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (
            status = 200,
            description = "Active provider, per-stage models and run settings",
            body = ConfigResponse
        )
    )
)]
async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(ConfigResponse::from(&state.config))
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "system",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Deep Research API",
        version = "0.1.0",
        description = "Streams research progress and the final report over SSE"
    ),
    paths(start_research, get_config, health),
    components(schemas(ResearchRequest, HealthResponse, ConfigResponse, StageModel))
)]
struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    let spec = ApiDoc::openapi().to_json().unwrap_or_default();
    Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(spec))
        .unwrap_or_default()
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/research", post(start_research))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/health", get(health))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}

// === Entry Points ===

/// Print every progress line; a stage failure ends the process non-zero
async fn run_cli(manager: &ResearchManager, query: &str) -> anyhow::Result<()> {
    let query = validate_query(query).map_err(|(_, message)| anyhow::anyhow!(message))?;
    let mut progress = manager.run(query);
    while let Some(line) = progress.next().await {
        match line {
            Ok(line) => println!("{}", line),
            Err(e) => {
                tracing::error!(error = %e, "Research run failed");
                return Err(e.into());
            }
        }
    }
    Ok(())
}

async fn run_server(
    manager: ResearchManager,
    config: ResearchConfig,
    port: u16,
) -> anyhow::Result<()> {
    let state: SharedState = Arc::new(AppState { manager, config });
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, "Deep Research server listening");
    println!("🚀 Deep Research Server running at http://{}", addr);
    println!("   Research: POST /api/v1/research (SSE)");
    println!("   Config:   GET  /api/v1/config");
    println!("   Health:   GET  /api/v1/health");
    println!("   OpenAPI:  GET  /api/v1/openapi.json");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ResearchConfig::load_required(path).await?,
        None => ResearchConfig::load_default().await?,
    };

    let manager = ResearchManager::from_config(agents::build_stages(&config), &config);

    match args.command {
        Some(CliCommand::Run { query }) => run_cli(&manager, &query).await,
        Some(CliCommand::Serve { port }) => run_server(manager, config, port).await,
        None => run_server(manager, config, 8080).await,
    }
}
