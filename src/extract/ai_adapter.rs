//! Extraction collaborator: provider abstraction + concrete providers.
//!
//! An `Extractor` takes one prompt and returns the model's raw reply text.
//! Parsing the reply into fields is the orchestrator's job (see `prompt.rs`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ExtractorConfig;
use crate::error::ExtractError;

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynExtractor = Arc<dyn Extractor>;

/// Build the configured provider. Config must already be finalized.
pub fn build_extractor(cfg: &ExtractorConfig) -> anyhow::Result<DynExtractor> {
    match cfg.provider.as_str() {
        "openai" => {
            let ex: DynExtractor = Arc::new(OpenAiExtractor::new(cfg)?);
            Ok(ex)
        }
        other => anyhow::bail!("Unsupported extractor provider: {other}"),
    }
}

// ------------------------------------------------------------
// OpenAI (Chat Completions)
// ------------------------------------------------------------

const SYSTEM_PROMPT: &str =
    "You extract structured funding facts from startup news. Reply with one JSON object only.";

pub struct OpenAiExtractor {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiExtractor {
    /// The key comes from the config; nothing is read from the environment here.
    pub fn new(cfg: &ExtractorConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("funding-feed/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(cfg.timeout())
            .build()
            .context("building extractor http client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            temperature: cfg.temperature,
            timeout: cfg.timeout(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
    refusal: Option<String>,
}

/// Pull the assistant text out of a Chat Completions response body.
fn content_from_chat_body(body: &str) -> Result<String, ExtractError> {
    let resp: Resp = serde_json::from_str(body)
        .map_err(|e| ExtractError::Malformed(format!("chat response: {e}")))?;
    let choice = resp.choices.into_iter().next().ok_or(ExtractError::Refused)?;
    if choice.message.refusal.is_some() || choice.finish_reason.as_deref() == Some("content_filter")
    {
        return Err(ExtractError::Refused);
    }
    match choice.message.content {
        Some(c) if !c.trim().is_empty() => Ok(c),
        _ => Err(ExtractError::Refused),
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractError> {
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractError::Timeout(self.timeout)
                } else {
                    ExtractError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ExtractError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }
        content_from_chat_body(&body)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Scripted provider (tests / offline runs)
// ------------------------------------------------------------

#[derive(Clone)]
struct Script {
    reply: Result<String, ExtractError>,
    delay: Duration,
}

/// Returns canned replies chosen by a marker the prompt contains (usually
/// the article title). Unmatched prompts are refused. Tracks call counts and
/// peak concurrency so tests can check the orchestrator's bounds.
#[derive(Default)]
pub struct ScriptedExtractor {
    scripts: Vec<(String, Script)>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    per_marker_calls: std::sync::Mutex<HashMap<String, usize>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, marker: &str, json: &str) -> Self {
        self.script(marker, Ok(json.to_string()), Duration::ZERO)
    }

    pub fn fail(self, marker: &str, err: ExtractError) -> Self {
        self.script(marker, Err(err), Duration::ZERO)
    }

    pub fn reply_after(self, marker: &str, json: &str, delay: Duration) -> Self {
        self.script(marker, Ok(json.to_string()), delay)
    }

    fn script(mut self, marker: &str, reply: Result<String, ExtractError>, delay: Duration) -> Self {
        self.scripts
            .push((marker.to_string(), Script { reply, delay }));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, marker: &str) -> usize {
        self.per_marker_calls
            .lock()
            .map(|m| m.get(marker).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let hit = self
            .scripts
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(marker, s)| (marker.clone(), s.clone()));

        let out = match hit {
            Some((marker, s)) => {
                if let Ok(mut m) = self.per_marker_calls.lock() {
                    *m.entry(marker).or_insert(0) += 1;
                }
                if !s.delay.is_zero() {
                    tokio::time::sleep(s.delay).await;
                }
                s.reply
            }
            None => Err(ExtractError::Refused),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
