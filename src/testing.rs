//! Deterministic stand-ins for the inference engine.
//!
//! [`ScriptedGateway`] replays one [`ScriptedTurn`] per engine request and records
//! what it was asked, so sessions and controllers can be exercised without a model.
//!
//! ```ignore
//! use recommender::testing::{ScriptedGateway, ScriptedTurn};
//! use serde_json::json;
//!
//! let gateway = ScriptedGateway::new(vec![
//!     ScriptedTurn::new().tool_call("coffeetoolplus", json!({"tags": ["sweet"]})),
//!     ScriptedTurn::json(&json!({"name": "Mocha"}), 3),
//! ]);
//! ```

use crate::error::{RecommenderError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway, StreamChunk};
use crate::llm::models::{LlmMessage, LlmToolCall};
use crate::llm::schema::SchemaDescriptor;
use crate::llm::tools::ToolDescriptor;
use async_trait::async_trait;
use futures::stream::Stream;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedChunk {
    Content(String),
    ToolCall { name: String, arguments: Value },
    /// End the turn with an engine error
    Fail(String),
    /// Never produce anything else
    Hang,
}

/// Everything the engine emits for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedTurn {
    chunks: Vec<ScriptedChunk>,
}

impl ScriptedTurn {
    pub fn new() -> Self {
        Self::default()
    }

    /// A turn that streams `value` as JSON text cut into `pieces` deltas
    pub fn json(value: &Value, pieces: usize) -> Self {
        split_text(&value.to_string(), pieces)
            .into_iter()
            .fold(Self::new(), |turn, piece| turn.content(piece))
    }

    pub fn content(mut self, delta: impl Into<String>) -> Self {
        self.chunks.push(ScriptedChunk::Content(delta.into()));
        self
    }

    pub fn tool_call(mut self, name: impl Into<String>, arguments: Value) -> Self {
        self.chunks.push(ScriptedChunk::ToolCall {
            name: name.into(),
            arguments,
        });
        self
    }

    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.chunks.push(ScriptedChunk::Fail(message.into()));
        self
    }

    pub fn hang(mut self) -> Self {
        self.chunks.push(ScriptedChunk::Hang);
        self
    }

    pub fn chunks(&self) -> &[ScriptedChunk] {
        &self.chunks
    }
}

/// One request the gateway received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<LlmMessage>,
    pub tools: Vec<String>,
    pub schema: String,
    pub config: CompletionConfig,
}

/// A fake inference engine replaying scripted turns in order
#[derive(Default)]
pub struct ScriptedGateway {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<RecordedRequest>>,
    prewarms: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            ..Default::default()
        }
    }

    /// Queue more turns behind the ones not yet replayed
    pub fn push_turn(&self, turn: ScriptedTurn) {
        self.turns.lock().unwrap_or_else(PoisonError::into_inner).push_back(turn);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn prewarm_count(&self) -> usize {
        self.prewarms.load(Ordering::SeqCst)
    }

    pub fn remaining_turns(&self) -> usize {
        self.turns.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn prewarm(&self, _model: &str) -> Result<()> {
        self.prewarms.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn complete_stream<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [LlmMessage],
        tools: &'a [ToolDescriptor],
        schema: &'a SchemaDescriptor,
        config: &'a CompletionConfig,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'a>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(RecordedRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.function.name.clone()).collect(),
            schema: schema.name.clone(),
            config: config.clone(),
        });
        let turn = self.turns.lock().unwrap_or_else(PoisonError::into_inner).pop_front();

        Box::pin(async_stream::stream! {
            let turn = match turn {
                Some(turn) => turn,
                None => {
                    yield Err(RecommenderError::EngineError("script exhausted".to_string()));
                    return;
                }
            };

            for chunk in turn.chunks {
                match chunk {
                    ScriptedChunk::Content(delta) => yield Ok(StreamChunk::Content(delta)),
                    ScriptedChunk::ToolCall { name, arguments } => {
                        let arguments: HashMap<String, Value> = match arguments {
                            Value::Object(map) => map.into_iter().collect(),
                            _ => HashMap::new(),
                        };
                        yield Ok(StreamChunk::ToolCalls(vec![LlmToolCall::new(name, arguments)]));
                    }
                    ScriptedChunk::Fail(message) => {
                        yield Err(RecommenderError::EngineError(message));
                        return;
                    }
                    ScriptedChunk::Hang => {
                        loop {
                            tokio::time::sleep(Duration::from_secs(3600)).await;
                        }
                    }
                }
            }
        })
    }
}

/// Cut `text` into `pieces` runs of roughly equal length on char boundaries
pub fn split_text(text: &str, pieces: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let size = chars.len().div_ceil(pieces.max(1));
    chars.chunks(size).map(|run| run.iter().collect()).collect()
}
