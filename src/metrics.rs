// src/metrics.rs
//! Run metrics. Counters are always recorded through the `metrics` facade
//! (no-ops without a recorder). When a textfile path is configured, a
//! Prometheus recorder is installed and its exposition is written at the end
//! of the run for the node-exporter textfile collector.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

/// One-time metrics registration (so series carry descriptions).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "funding_articles_fetched_total",
            "Articles parsed from the news feed."
        );
        describe_histogram!("funding_ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!(
            "funding_extract_failures_total",
            "Articles skipped because extraction failed."
        );
        describe_histogram!("funding_extract_ms", "Extractor round-trip in milliseconds.");
        describe_counter!(
            "funding_dedup_dropped_total",
            "Announcements removed as duplicates."
        );
        describe_counter!("funding_feed_items_total", "Items written to the feed.");
        describe_gauge!(
            "funding_pipeline_last_run_ts",
            "Unix ts when the pipeline last completed."
        );
    });
}

pub struct Metrics {
    handle: PrometheusHandle,
    textfile: PathBuf,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call at most once per process.
    pub fn install(textfile: &Path) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self {
            handle,
            textfile: textfile.to_path_buf(),
        })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the current exposition (temp file + rename).
    pub fn write_snapshot(&self) -> Result<()> {
        let tmp = self.textfile.with_extension("prom.tmp");
        fs::write(&tmp, self.render())
            .with_context(|| format!("writing metrics to {}", tmp.display()))?;
        fs::rename(&tmp, &self.textfile)
            .with_context(|| format!("renaming metrics into {}", self.textfile.display()))?;
        Ok(())
    }
}
