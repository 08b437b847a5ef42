//! # Deep Research Core
//!
//! Orchestrates an LLM-assisted research run: plan searches, run them
//! concurrently, write a report, critique it, optionally search again and
//! rewrite, then deliver.
//!
//! ## Architecture
//!
//! - `research/` - Stage interfaces, fan-out/fan-in, pipeline state machine, progress stream
//! - `agents/` - LLM-backed stage implementations (radkit)
//! - `models` - LLM provider and model selection
//! - `config` - Run configuration
//! - `error` - Run-aborting errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use deep_research_core::{agents, config::ResearchConfig, research::ResearchManager};
//! use futures::StreamExt;
//!
//! let config = ResearchConfig::load_default().await?;
//! let manager = ResearchManager::from_config(agents::build_stages(&config), &config);
//! let mut progress = manager.run("What changed in HTTP/3?");
//! while let Some(line) = progress.next().await {
//!     println!("{}", line?);
//! }
//! ```

pub mod agents;
pub mod config;
pub mod error;
pub mod models;
pub mod research;

pub use config::ResearchConfig;
pub use error::ResearchError;
pub use research::{ProgressStream, ProgressUpdate, ResearchManager};
