//! funding-feed binary entrypoint.
//! Loads config, runs the pipeline once and maps the outcome to an exit code.

use funding_feed::config::{AppConfig, LogFormat};
use funding_feed::metrics::Metrics;
use funding_feed::Pipeline;
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("funding_feed=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    // stdout may carry the feed itself ("-" output), so logs go to stderr
    match format {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = match AppConfig::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(LogFormat::default());
            error!(stage = "config", error = %format!("{e:#}"), "run failed");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cfg.logging.format);

    let metrics = match cfg.metrics_textfile.as_deref().map(Metrics::install) {
        Some(Ok(m)) => Some(m),
        Some(Err(e)) => {
            warn!(error = %format!("{e:#}"), "metrics disabled");
            None
        }
        None => None,
    };

    let pipeline = match Pipeline::from_config(&cfg) {
        Ok(p) => p,
        Err(e) => {
            error!(stage = "setup", error = %format!("{e:#}"), "run failed");
            return ExitCode::FAILURE;
        }
    };

    let outcome = pipeline.run().await;

    if let Some(m) = &metrics {
        if let Err(e) = m.write_snapshot() {
            warn!(error = %format!("{e:#}"), "metrics snapshot not written");
        }
    }

    match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(stage = e.stage(), error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
