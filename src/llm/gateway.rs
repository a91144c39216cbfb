use crate::error::Result;
use crate::llm::models::{LlmMessage, LlmToolCall};
use crate::llm::schema::SchemaDescriptor;
use crate::llm::tools::ToolDescriptor;
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Seed used for greedy decoding so repeated runs agree
pub const GREEDY_SEED: u64 = 42;

/// How the engine picks the next token
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    /// Always take the most likely continuation
    Greedy,
    Random {
        temperature: f32,
        top_p: Option<f32>,
    },
}

impl Default for Sampling {
    fn default() -> Self {
        Sampling::Random {
            temperature: 1.0,
            top_p: None,
        }
    }
}

/// Per-call options for a structured generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub sampling: Sampling,
    /// Append the schema's field guidance to the prompt text
    pub include_schema_in_prompt: bool,
    pub max_tokens: Option<usize>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            sampling: Sampling::default(),
            include_schema_in_prompt: true,
            max_tokens: None,
        }
    }
}

impl GenerationOptions {
    /// Greedy sampling with the schema left out of the prompt
    pub fn greedy() -> Self {
        Self {
            sampling: Sampling::Greedy,
            include_schema_in_prompt: false,
            max_tokens: None,
        }
    }
}

/// Configuration for LLM completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub temperature: f32,
    pub num_ctx: usize,
    pub max_tokens: usize,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub seed: Option<u64>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            num_ctx: 32768,
            max_tokens: 16384,
            top_k: None,
            top_p: None,
            seed: None,
        }
    }
}

impl CompletionConfig {
    pub fn from_options(options: &GenerationOptions) -> Self {
        let mut config = Self::default();
        if let Some(max_tokens) = options.max_tokens {
            config.max_tokens = max_tokens;
        }

        match options.sampling {
            Sampling::Greedy => {
                config.temperature = 0.0;
                config.top_k = Some(1);
                config.seed = Some(GREEDY_SEED);
            }
            Sampling::Random { temperature, top_p } => {
                config.temperature = temperature;
                config.top_p = top_p;
            }
        }

        config
    }
}

/// One increment reported by the engine while streaming
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A fragment of the response text
    Content(String),
    /// The model asks for these tools before it continues
    ToolCalls(Vec<LlmToolCall>),
}

/// Abstract interface for inference engines
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Give the engine advance notice that `model` will be used soon
    async fn prewarm(&self, _model: &str) -> Result<()> {
        Ok(())
    }

    /// Stream one engine turn constrained to `schema`, with `tools` on offer.
    ///
    /// The stream ends after the turn's content, or after a single
    /// [`StreamChunk::ToolCalls`] when the model wants tool results first.
    fn complete_stream<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [LlmMessage],
        tools: &'a [ToolDescriptor],
        schema: &'a SchemaDescriptor,
        config: &'a CompletionConfig,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_config_default() {
        let config = CompletionConfig::default();

        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.num_ctx, 32768);
        assert_eq!(config.max_tokens, 16384);
        assert_eq!(config.top_k, None);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_greedy_options_are_deterministic() {
        let config = CompletionConfig::from_options(&GenerationOptions::greedy());

        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.top_k, Some(1));
        assert_eq!(config.seed, Some(GREEDY_SEED));
    }

    #[test]
    fn test_random_options_carry_temperature() {
        let options = GenerationOptions {
            sampling: Sampling::Random {
                temperature: 0.7,
                top_p: Some(0.9),
            },
            include_schema_in_prompt: true,
            max_tokens: Some(512),
        };
        let config = CompletionConfig::from_options(&options);

        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_p, Some(0.9));
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_default_options() {
        let options = GenerationOptions::default();
        assert!(options.include_schema_in_prompt);
        assert!(matches!(options.sampling, Sampling::Random { .. }));
    }
}
