//! Incremental ingestion of listening history: tracks which raw batches have
//! been processed, flattens new plays, enriches them with artist genres through
//! a permanent cache, and folds them into a deduplicated, time-ordered dataset.

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod types;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::Orchestrator;
pub use types::{PlayEvent, RunOutcome, RunStatus};
