// src/error.rs
//! Error taxonomy for the announcement pipeline.
//!
//! Per-article failures (`ExtractError`) stop at the orchestrator boundary.
//! Everything else bubbles up to the driver as a `PipelineError`.

use std::time::Duration;
use thiserror::Error;

/// Why a single article could not be turned into an announcement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("extractor returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("extractor refused or returned an empty reply")]
    Refused,

    #[error("malformed extraction: {0}")]
    Malformed(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed published timestamp {value:?} for {link}")]
    MalformedTimestamp {
        link: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("rendering rss: {0}")]
    Render(String),
}

/// Terminal failure of one run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch stage failed: {0:#}")]
    Fetch(#[source] anyhow::Error),

    #[error("assemble stage failed: {0}")]
    Assemble(#[from] FeedError),

    #[error("publish stage failed: {0:#}")]
    Publish(#[source] anyhow::Error),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Assemble(_) => "assemble",
            PipelineError::Publish(_) => "publish",
        }
    }
}
