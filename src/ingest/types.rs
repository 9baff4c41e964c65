// src/ingest/types.rs
use anyhow::Result;

/// One raw news entry as fetched, before extraction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub link: String,
    /// RFC 2822, e.g. "Mon, 06 May 2024 14:03:00 GMT"
    pub published: String,
    pub source: Option<String>, // publisher name, e.g. "TechCrunch"
    pub description: String,    // normalized text
}

#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch at most `limit` articles for `query`, in feed order.
    async fn fetch_latest(&self, query: &str, limit: usize) -> Result<Vec<Article>>;
    fn name(&self) -> &'static str;
}
