// src/extract/types.rs
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::ingest::types::Article;

/// The seven fields the extractor is asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub project: String,
    pub amount_raised: String,
    pub lead_investors: Vec<String>,
    pub other_backers: Vec<String>,
    pub funding_stage: String,
    pub use_of_funds: String,
    pub twitter_handle: Option<String>,
}

/// Structured funding event derived from one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub project: String,
    pub amount_raised: String, // as written, e.g. "$5M"
    pub lead_investors: Vec<String>,
    pub other_backers: Vec<String>,
    pub funding_stage: String,
    pub use_of_funds: String,
    pub twitter_handle: Option<String>,
    pub category: String,
    pub link: String,
    pub source: Option<String>,
    pub published: String,
}

impl Announcement {
    /// Only way the orchestrator builds announcements: category and
    /// provenance are supplied together with the extracted fields.
    pub fn from_extraction(fields: ExtractedFields, category: String, article: &Article) -> Self {
        Self {
            project: fields.project,
            amount_raised: fields.amount_raised,
            lead_investors: fields.lead_investors,
            other_backers: fields.other_backers,
            funding_stage: fields.funding_stage,
            use_of_funds: fields.use_of_funds,
            twitter_handle: fields.twitter_handle,
            category,
            link: article.link.clone(),
            source: article.source.clone(),
            published: article.published.clone(),
        }
    }

    /// Exact-match dedup identity.
    pub fn identity_key(&self) -> (&str, &str) {
        (&self.project, &self.amount_raised)
    }
}

/// Per-article result of the extraction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Extracted(Announcement),
    Skipped {
        title: String,
        link: String,
        reason: ExtractError,
    },
}

impl ArticleOutcome {
    pub fn from_result(article: &Article, res: Result<Announcement, ExtractError>) -> Self {
        match res {
            Ok(a) => ArticleOutcome::Extracted(a),
            Err(reason) => ArticleOutcome::Skipped {
                title: article.title.clone(),
                link: article.link.clone(),
                reason,
            },
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, ArticleOutcome::Extracted(_))
    }
}

/// Ordered outcomes of one extraction pass (input order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub outcomes: Vec<ArticleOutcome>,
}

impl ExtractionReport {
    pub fn extracted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_extracted()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.extracted_count()
    }

    /// Successful announcements in input order; skipped articles leave gaps.
    pub fn into_announcements(self) -> Vec<Announcement> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                ArticleOutcome::Extracted(a) => Some(a),
                ArticleOutcome::Skipped { .. } => None,
            })
            .collect()
    }
}
