use crate::error::{RecommenderError, Result};
use crate::llm::gateways::OllamaConfig;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "qwen3:8b";

/// Settings shared by every recommender in a process
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    pub model: String,
    pub ollama: OllamaConfig,
    /// Upper bound on a single tool call. `None` waits indefinitely.
    pub tool_timeout: Option<Duration>,
    /// Upper bound on a whole generation, tool calls included
    pub generation_timeout: Option<Duration>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            ollama: OllamaConfig::default(),
            tool_timeout: None,
            generation_timeout: None,
        }
    }
}

impl RecommenderConfig {
    /// Read `RECOMMENDER_MODEL`, `RECOMMENDER_TOOL_TIMEOUT_SECS`,
    /// `RECOMMENDER_GENERATION_TIMEOUT_SECS` and `OLLAMA_HOST`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(model) = lookup("RECOMMENDER_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(host) = lookup("OLLAMA_HOST").filter(|h| !h.trim().is_empty()) {
            config.ollama.host = host;
        }
        config.tool_timeout = seconds(&lookup, "RECOMMENDER_TOOL_TIMEOUT_SECS")?;
        config.generation_timeout = seconds(&lookup, "RECOMMENDER_GENERATION_TIMEOUT_SECS")?;

        Ok(config)
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| RecommenderError::ConfigError(format!("{} must be whole seconds: {}", key, e))),
    }
}
