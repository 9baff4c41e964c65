// src/pipeline.rs
//! Pipeline driver: fetch → extract → dedup → assemble → publish, once.
//!
//! Fetch, assemble and publish failures end the run with a `PipelineError`
//! naming the stage. Per-article extraction failures are only counted.

use anyhow::Context;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use std::sync::Arc;
use tracing::{info, warn};

use crate::classify::{load_taxonomy_from, Classifier, Taxonomy};
use crate::config::AppConfig;
use crate::dedup::dedup_announcements;
use crate::error::PipelineError;
use crate::extract::{build_extractor, Orchestrator};
use crate::feed::{self, sink_for_path, FeedMeta, FeedSink};
use crate::ingest::{ArticleSource, GoogleNewsSource};
use crate::metrics::ensure_metrics_described;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub published: usize,
    pub target: String,
}

pub struct Pipeline {
    source: Arc<dyn ArticleSource>,
    orchestrator: Orchestrator,
    sink: Box<dyn FeedSink>,
    meta: FeedMeta,
    query: String,
    max_articles: usize,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn ArticleSource>,
        orchestrator: Orchestrator,
        sink: Box<dyn FeedSink>,
        meta: FeedMeta,
        query: impl Into<String>,
        max_articles: usize,
    ) -> Self {
        Self {
            source,
            orchestrator,
            sink,
            meta,
            query: query.into(),
            max_articles,
        }
    }

    /// Wire the production collaborators from a finalized config.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let taxonomy = match &cfg.taxonomy_path {
            Some(p) => load_taxonomy_from(p)?,
            None => Taxonomy::builtin(),
        };
        let classifier = Arc::new(Classifier::new(&taxonomy).context("compiling taxonomy")?);
        let extractor = build_extractor(&cfg.extractor)?;
        let orchestrator = Orchestrator::new(
            extractor,
            classifier,
            cfg.extractor.timeout(),
            cfg.extractor.max_concurrency,
        );
        let source: Arc<dyn ArticleSource> = Arc::new(GoogleNewsSource::new(&cfg.news)?);

        info!(
            query = %cfg.query,
            max_articles = cfg.max_articles,
            categories = taxonomy.categories().len(),
            extractor = ?cfg.extractor,
            output = %cfg.feed.output_path.display(),
            "pipeline configured"
        );

        Ok(Self::new(
            source,
            orchestrator,
            sink_for_path(&cfg.feed.output_path),
            FeedMeta::from(&cfg.feed),
            cfg.query.clone(),
            cfg.max_articles,
        ))
    }

    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        self.run_at(Utc::now()).await
    }

    /// Same as `run`, with an explicit lastBuildDate.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary, PipelineError> {
        ensure_metrics_described();

        // 1) fetch
        let mut articles = self
            .source
            .fetch_latest(&self.query, self.max_articles)
            .await
            .with_context(|| format!("{} fetch for {:?}", self.source.name(), self.query))
            .map_err(PipelineError::Fetch)?;
        articles.truncate(self.max_articles);
        if articles.is_empty() {
            warn!(query = %self.query, source = self.source.name(), "no articles fetched");
        }

        // 2) extract (per-article failures are not fatal)
        let report = self.orchestrator.run(&articles).await;
        let extracted = report.extracted_count();
        let skipped = report.skipped_count();

        // 3) dedup
        let (unique, duplicates) = dedup_announcements(report.into_announcements());

        // 4) assemble + publish
        let feed = feed::assemble(&unique, &self.meta, now)?;
        let xml = feed.to_rss_xml()?;
        self.sink.publish(&xml).map_err(PipelineError::Publish)?;

        counter!("funding_feed_items_total").increment(feed.items.len() as u64);
        gauge!("funding_pipeline_last_run_ts").set(now.timestamp() as f64);

        let summary = RunSummary {
            fetched: articles.len(),
            extracted,
            skipped,
            duplicates,
            published: feed.items.len(),
            target: self.sink.target(),
        };
        info!(
            fetched = summary.fetched,
            extracted = summary.extracted,
            skipped = summary.skipped,
            duplicates = summary.duplicates,
            published = summary.published,
            target = %summary.target,
            "pipeline run complete"
        );
        Ok(summary)
    }
}
