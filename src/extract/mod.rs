// src/extract/mod.rs
//! Extraction orchestrator: one extractor call per article, classified and
//! stamped with provenance. Failures are isolated per article and come back
//! as `ArticleOutcome::Skipped`, never as an error of the batch.

pub mod ai_adapter;
pub mod prompt;
pub mod types;

pub use ai_adapter::{build_extractor, DynExtractor, Extractor, OpenAiExtractor, ScriptedExtractor};
pub use types::{Announcement, ArticleOutcome, ExtractedFields, ExtractionReport};

use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::classify::Classifier;
use crate::error::ExtractError;
use crate::ingest::types::Article;

pub struct Orchestrator {
    extractor: DynExtractor,
    classifier: Arc<Classifier>,
    timeout: Duration,
    max_concurrency: usize,
}

impl Orchestrator {
    pub fn new(
        extractor: DynExtractor,
        classifier: Arc<Classifier>,
        timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            extractor,
            classifier,
            timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Extract one article. Bounded by the per-call timeout.
    pub async fn extract_one(&self, article: &Article) -> Result<Announcement, ExtractError> {
        let prompt = prompt::build_prompt(article);

        let t0 = std::time::Instant::now();
        let reply = tokio::time::timeout(self.timeout, self.extractor.complete(&prompt))
            .await
            .map_err(|_| ExtractError::Timeout(self.timeout))??;
        histogram!("funding_extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let fields = prompt::parse_reply(&reply)?;
        let category = self
            .classifier
            .classify_announcement(&fields.project, &fields.use_of_funds);
        Ok(Announcement::from_extraction(fields, category, article))
    }

    /// Run every article through the extractor, at most `max_concurrency`
    /// at a time. Outcomes come back in input order.
    pub async fn run(&self, articles: &[Article]) -> ExtractionReport {
        let outcomes: Vec<ArticleOutcome> = stream::iter(articles)
            .map(|article| async move {
                let res = self.extract_one(article).await;
                match &res {
                    Ok(a) => debug!(
                        project = %a.project,
                        amount = %a.amount_raised,
                        category = %a.category,
                        "article extracted"
                    ),
                    Err(e) => {
                        warn!(
                            title = %article.title,
                            link = %article.link,
                            provider = self.extractor.provider_name(),
                            error = %e,
                            "article extraction failed, skipping"
                        );
                        counter!("funding_extract_failures_total").increment(1);
                    }
                }
                ArticleOutcome::from_result(article, res)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        ExtractionReport { outcomes }
    }
}
