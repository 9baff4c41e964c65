//! # Category classifier
//!
//! Scores free text against an ordered taxonomy of keyword sets and picks one
//! label. A keyword counts once per category when it occurs as a whole word
//! (case-insensitive). The highest score wins; ties go to the category declared
//! first. No match at all yields [`UNCATEGORIZED`].
//!
//! The taxonomy is data, not code: the built-in table can be replaced by a TOML
//! (`[[category]]` tables) or JSON (array of `{label, keywords}`) file.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub keywords: Vec<String>,
}

/// Ordered category table. Declaration order is the tie-break order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(rename = "category")]
    categories: Vec<Category>,
}

impl Taxonomy {
    /// Validate and clean a category list: trims labels and keywords, drops
    /// blank keywords, rejects empty/duplicate labels and keyword-less categories.
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(categories.len());
        for c in categories {
            let label = c.label.trim().to_string();
            if label.is_empty() {
                bail!("taxonomy category with empty label");
            }
            if label.eq_ignore_ascii_case(UNCATEGORIZED) {
                bail!("`{UNCATEGORIZED}` is reserved and cannot be a category label");
            }
            if !seen.insert(label.to_lowercase()) {
                bail!("duplicate taxonomy category `{label}`");
            }
            let keywords: Vec<String> = c
                .keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                bail!("taxonomy category `{label}` has no keywords");
            }
            out.push(Category { label, keywords });
        }
        if out.is_empty() {
            bail!("taxonomy has no categories");
        }
        Ok(Self { categories: out })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Built-in startup taxonomy.
    pub fn builtin() -> Self {
        let seed: &[(&str, &[&str])] = &[
            (
                "Web3",
                &["blockchain", "cryptocurrency", "decentralized", "NFT", "DApp"],
            ),
            (
                "Biotech",
                &["biotechnology", "pharmaceutical", "clinical", "gene therapy"],
            ),
            (
                "Artificial Intelligence",
                &[
                    "AI",
                    "machine learning",
                    "deep learning",
                    "natural language processing",
                ],
            ),
            (
                "Fintech",
                &["finance", "cryptocurrency", "banking", "investment"],
            ),
            (
                "Healthcare",
                &["health", "medical", "telemedicine", "healthcare technology"],
            ),
            (
                "E-commerce",
                &["retail", "online shop", "marketplace", "e-commerce"],
            ),
            (
                "EdTech",
                &[
                    "education",
                    "learning",
                    "online courses",
                    "teaching technology",
                ],
            ),
            (
                "Gaming",
                &["video games", "gaming", "mobile games", "eSports"],
            ),
            ("SaaS", &["software", "cloud", "platform", "SaaS"]),
            (
                "Clean Tech",
                &[
                    "renewable energy",
                    "sustainability",
                    "environmental",
                    "clean technology",
                ],
            ),
        ];
        Self {
            categories: seed
                .iter()
                .map(|(label, kws)| Category {
                    label: (*label).to_string(),
                    keywords: kws.iter().map(|k| (*k).to_string()).collect(),
                })
                .collect(),
        }
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Load a taxonomy from TOML or JSON (chosen by extension, other format as fallback).
pub fn load_taxonomy_from(path: &Path) -> Result<Taxonomy> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading taxonomy from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_taxonomy(&content, ext.as_str())
        .with_context(|| format!("parsing taxonomy {}", path.display()))
}

type ParseFn = fn(&str) -> Result<Vec<Category>>;

fn parse_taxonomy(s: &str, hint_ext: &str) -> Result<Taxonomy> {
    let (primary, fallback): (ParseFn, ParseFn) = if hint_ext == "json" {
        (parse_json, parse_toml)
    } else {
        (parse_toml, parse_json)
    };
    // On a double failure, report the error from the format the extension picked.
    let categories = match primary(s) {
        Ok(c) => c,
        Err(e) => fallback(s).map_err(|_| e.context("unsupported taxonomy format"))?,
    };
    Taxonomy::new(categories)
}

fn parse_toml(s: &str) -> Result<Vec<Category>> {
    let t: Taxonomy = toml::from_str(s)?;
    Ok(t.categories)
}

fn parse_json(s: &str) -> Result<Vec<Category>> {
    Ok(serde_json::from_str(s)?)
}

struct CompiledCategory {
    label: String,
    patterns: Vec<Regex>,
}

/// Pure keyword classifier. Patterns are compiled once up front.
pub struct Classifier {
    categories: Vec<CompiledCategory>,
}

impl Classifier {
    pub fn new(taxonomy: &Taxonomy) -> Result<Self> {
        let mut categories = Vec::with_capacity(taxonomy.categories.len());
        for c in &taxonomy.categories {
            let mut patterns = Vec::with_capacity(c.keywords.len());
            for kw in &c.keywords {
                let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&kw.to_lowercase())))
                    .with_context(|| format!("compiling keyword `{kw}` of `{}`", c.label))?;
                patterns.push(re);
            }
            categories.push(CompiledCategory {
                label: c.label.clone(),
                patterns,
            });
        }
        Ok(Self { categories })
    }

    /// Per-category keyword hit counts, in taxonomy order.
    pub fn scores(&self, text: &str) -> Vec<(&str, usize)> {
        let folded = text.to_lowercase();
        self.categories
            .iter()
            .map(|c| {
                let hits = c.patterns.iter().filter(|re| re.is_match(&folded)).count();
                (c.label.as_str(), hits)
            })
            .collect()
    }

    /// Highest score wins; the first declared category wins a tie.
    pub fn classify(&self, text: &str) -> &str {
        let mut best: Option<(&str, usize)> = None;
        for (label, score) in self.scores(text) {
            // strict `>` keeps the earlier category on ties
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((label, score));
            }
        }
        best.map_or(UNCATEGORIZED, |(label, _)| label)
    }

    /// Classify an announcement by its project name and use of funds.
    pub fn classify_announcement(&self, project: &str, use_of_funds: &str) -> String {
        self.classify(&format!("{project} {use_of_funds}")).to_string()
    }
}
