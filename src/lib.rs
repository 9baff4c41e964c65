// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod feed;
pub mod ingest;
pub mod metrics;
pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::classify::{Classifier, Taxonomy, UNCATEGORIZED};
pub use crate::config::AppConfig;
pub use crate::error::{ExtractError, FeedError, PipelineError};
pub use crate::extract::{Announcement, ArticleOutcome, Orchestrator};
pub use crate::ingest::Article;
pub use crate::pipeline::{Pipeline, RunSummary};
