// src/ingest/google_news.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::config::NewsConfig;
use crate::ingest::types::{Article, ArticleSource};
use crate::ingest::{normalize_text, scrub_html_entities_for_xml};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<ItemSource>,
}

/// `<source url="https://techcrunch.com">TechCrunch</source>`
#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text")]
    name: Option<String>,
}

/// Google News search feed. Either hits the live endpoint or parses an
/// in-memory document (tests, offline runs).
pub struct GoogleNewsSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        base_url: String,
        hl: String,
        gl: String,
        ceid: String,
    },
}

impl GoogleNewsSource {
    pub fn new(cfg: &NewsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("funding-feed/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building news http client")?;
        Ok(Self {
            mode: Mode::Http {
                client,
                base_url: cfg.base_url.clone(),
                hl: cfg.hl.clone(),
                gl: cfg.gl.clone(),
                ceid: cfg.ceid.clone(),
            },
        })
    }

    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn parse_items_from_str(s: &str, limit: usize) -> Result<Vec<Article>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing google news rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len().min(limit));
        for it in rss.channel.item {
            if out.len() >= limit {
                break;
            }
            let (Some(title), Some(link), Some(published)) = (it.title, it.link, it.pub_date)
            else {
                tracing::debug!("skipping feed item without title/link/pubDate");
                continue;
            };

            out.push(Article {
                title: normalize_text(&title),
                link: link.trim().to_string(),
                published: published.trim().to_string(),
                source: it
                    .source
                    .and_then(|s| s.name)
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
                description: normalize_text(it.description.as_deref().unwrap_or_default()),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("funding_ingest_parse_ms").record(ms);
        counter!("funding_articles_fetched_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl ArticleSource for GoogleNewsSource {
    async fn fetch_latest(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s, limit),
            Mode::Http {
                client,
                base_url,
                hl,
                gl,
                ceid,
            } => {
                let resp = client
                    .get(base_url.as_str())
                    .query(&[
                        ("q", query),
                        ("hl", hl.as_str()),
                        ("gl", gl.as_str()),
                        ("ceid", ceid.as_str()),
                    ])
                    .send()
                    .await
                    .context("google news http get()")?
                    .error_for_status()
                    .context("google news http status")?;
                let body = resp.text().await.context("google news http .text()")?;
                Self::parse_items_from_str(&body, limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "GoogleNews"
    }
}
