// src/config/extractor.rs
use serde::{Deserialize, Serialize};
use std::{env, fmt, time::Duration};

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_concurrency() -> usize {
    4
}

pub const MAX_CONCURRENCY_CAP: usize = 16;

#[derive(Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Only "openai" is wired today (case-insensitive).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY at load time.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub temperature: f32,
    /// Bounded wait per extraction call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on in-flight extraction calls.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            base_url: default_base_url(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

// Keep the key out of logs.
impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key_len", &self.api_key.len())
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Normalize provider, resolve an "ENV" key and clamp numeric knobs.
    pub fn finalize(&mut self) -> anyhow::Result<()> {
        self.provider = self.provider.trim().to_lowercase();
        if self.provider != "openai" {
            anyhow::bail!("Unsupported extractor provider in config: {}", self.provider);
        }

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?;
        }
        if self.api_key.trim().is_empty() {
            anyhow::bail!("extractor api_key is empty");
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = 0.0;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.max_concurrency = self.max_concurrency.clamp(1, MAX_CONCURRENCY_CAP);
        Ok(())
    }
}
