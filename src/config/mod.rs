// src/config/mod.rs
//! Runtime configuration.
//!
//! Lookup order for the main file:
//! 1) `$FUNDING_CONFIG_PATH`
//! 2) `config/funding.toml`
//! 3) built-in defaults
//!
//! After parsing, a few env overrides are applied (`FUNDING_QUERY`,
//! `FUNDING_MAX_ARTICLES`, `FUNDING_OUTPUT_PATH`) and values are sanitized.
//! Credentials are resolved here once and then passed to constructors.

pub mod extractor;

pub use extractor::ExtractorConfig;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const ENV_CONFIG_PATH: &str = "FUNDING_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/funding.toml";

pub const DEFAULT_QUERY: &str = "startup funding";
pub const DEFAULT_MAX_ARTICLES: usize = 20;
const MAX_ARTICLES_CAP: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub query: String,
    pub max_articles: usize,
    /// Optional taxonomy override (TOML or JSON); built-in table otherwise.
    pub taxonomy_path: Option<PathBuf>,
    /// Write a Prometheus text snapshot here at the end of the run.
    pub metrics_textfile: Option<PathBuf>,
    pub news: NewsConfig,
    pub extractor: ExtractorConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            max_articles: DEFAULT_MAX_ARTICLES,
            taxonomy_path: None,
            metrics_textfile: None,
            news: NewsConfig::default(),
            extractor: ExtractorConfig::default(),
            feed: FeedConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub base_url: String,
    pub hl: String,
    pub gl: String,
    pub ceid: String,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://news.google.com/rss/search".to_string(),
            hl: "en-US".to_string(),
            gl: "US".to_string(),
            ceid: "US:en".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub title: String,
    pub link: String,
    pub description: String,
    /// "-" writes to stdout.
    pub output_path: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: "Funding Announcements".to_string(),
            link: "https://example.com/funding-announcements".to_string(),
            description: "Latest funding announcements in the startup world".to_string(),
            output_path: PathBuf::from("funding_announcements.xml"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing funding config toml")?;
        cfg.finalize()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("loading {}", path.display()))
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        let mut cfg = AppConfig::default();
        cfg.finalize()?;
        Ok(cfg)
    }

    fn finalize(&mut self) -> Result<()> {
        self.apply_env_overrides()?;

        self.query = self.query.trim().to_string();
        if self.query.is_empty() {
            self.query = DEFAULT_QUERY.to_string();
        }
        if self.max_articles == 0 {
            self.max_articles = DEFAULT_MAX_ARTICLES;
        }
        self.max_articles = self.max_articles.min(MAX_ARTICLES_CAP);
        if self.news.timeout_secs == 0 {
            self.news.timeout_secs = NewsConfig::default().timeout_secs;
        }

        self.extractor.finalize()
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(q) = env::var("FUNDING_QUERY") {
            self.query = q;
        }
        if let Ok(n) = env::var("FUNDING_MAX_ARTICLES") {
            self.max_articles = n
                .trim()
                .parse()
                .with_context(|| format!("FUNDING_MAX_ARTICLES is not a number: {n:?}"))?;
        }
        if let Ok(p) = env::var("FUNDING_OUTPUT_PATH") {
            self.feed.output_path = PathBuf::from(p);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_env() {
        for k in [
            ENV_CONFIG_PATH,
            "FUNDING_QUERY",
            "FUNDING_MAX_ARTICLES",
            "FUNDING_OUTPUT_PATH",
        ] {
            env::remove_var(k);
        }
    }

    #[serial_test::serial]
    #[test]
    fn partial_toml_keeps_defaults() {
        clear_env();
        let cfg = AppConfig::from_toml_str(
            r#"
query = "seed round"

[extractor]
api_key = "sk-inline"
max_concurrency = 64

[feed]
title = "Seed rounds"
"#,
        )
        .unwrap();

        assert_eq!(cfg.query, "seed round");
        assert_eq!(cfg.max_articles, DEFAULT_MAX_ARTICLES);
        assert_eq!(cfg.extractor.api_key, "sk-inline");
        assert_eq!(cfg.extractor.model, "gpt-3.5-turbo");
        assert_eq!(cfg.extractor.max_concurrency, extractor::MAX_CONCURRENCY_CAP);
        assert_eq!(cfg.feed.title, "Seed rounds");
        assert_eq!(cfg.feed.link, "https://example.com/funding-announcements");
        assert_eq!(cfg.news.ceid, "US:en");
        assert_eq!(cfg.logging.format, LogFormat::Compact);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_win_over_file() {
        clear_env();
        env::set_var("FUNDING_QUERY", "series a");
        env::set_var("FUNDING_MAX_ARTICLES", "5");
        env::set_var("FUNDING_OUTPUT_PATH", "-");
        let cfg = AppConfig::from_toml_str(
            r#"
query = "ignored"
max_articles = 50
[extractor]
api_key = "k"
"#,
        );
        clear_env();
        let cfg = cfg.unwrap();

        assert_eq!(cfg.query, "series a");
        assert_eq!(cfg.max_articles, 5);
        assert_eq!(cfg.feed.output_path, PathBuf::from("-"));
    }

    #[serial_test::serial]
    #[test]
    fn bad_max_articles_env_is_reported() {
        clear_env();
        env::set_var("FUNDING_MAX_ARTICLES", "lots");
        let res = AppConfig::from_toml_str("[extractor]\napi_key = \"k\"\n");
        clear_env();
        let err = res.unwrap_err();
        assert!(format!("{err:#}").contains("FUNDING_MAX_ARTICLES"));
    }

    #[serial_test::serial]
    #[test]
    fn zero_and_oversized_caps_are_sanitized() {
        clear_env();
        let cfg = AppConfig::from_toml_str("max_articles = 0\n[extractor]\napi_key = \"k\"\n").unwrap();
        assert_eq!(cfg.max_articles, DEFAULT_MAX_ARTICLES);

        let cfg =
            AppConfig::from_toml_str("max_articles = 1000\n[extractor]\napi_key = \"k\"\n").unwrap();
        assert_eq!(cfg.max_articles, MAX_ARTICLES_CAP);
    }
}
