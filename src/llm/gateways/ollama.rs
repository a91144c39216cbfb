use crate::error::{RecommenderError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway, StreamChunk};
use crate::llm::models::{LlmMessage, LlmToolCall, MessageRole};
use crate::llm::schema::SchemaDescriptor;
use crate::llm::tools::ToolDescriptor;
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::pin::Pin;
use tracing::{debug, info, warn};

/// How long Ollama keeps a prewarmed model resident
const PREWARM_KEEP_ALIVE: &str = "10m";

/// Configuration for connecting to Ollama server
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub host: String,
    pub timeout: Option<std::time::Duration>,
    pub headers: HashMap<String, String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            timeout: None,
            headers: HashMap::new(),
        }
    }
}

/// Inference engine backed by a local Ollama server
///
/// Streams `/api/chat` responses as newline-delimited JSON, offering tools as
/// function descriptors and constraining output with the target schema.
pub struct OllamaGateway {
    client: Client,
    config: OllamaConfig,
}

impl OllamaGateway {
    /// Create a new Ollama gateway with default configuration
    pub fn new() -> Self {
        Self::with_config(OllamaConfig::default())
    }

    /// Create a new Ollama gateway with custom configuration
    pub fn with_config(config: OllamaConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Ignoring invalid Ollama header: {}", name),
            }
        }

        let client = client_builder.default_headers(headers).build().unwrap_or_else(|e| {
            warn!("Falling back to a default HTTP client: {}", e);
            Client::new()
        });

        Self { client, config }
    }

    /// Create gateway with custom host
    pub fn with_host(host: impl Into<String>) -> Self {
        Self::with_config(OllamaConfig {
            host: host.into(),
            ..Default::default()
        })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }
}

impl Default for OllamaGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmGateway for OllamaGateway {
    async fn prewarm(&self, model: &str) -> Result<()> {
        debug!("Prewarming Ollama model: {}", model);

        let response = self
            .client
            .post(format!("{}/api/generate", self.config.host))
            .json(&json!({
                "model": model,
                "keep_alive": PREWARM_KEEP_ALIVE
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RecommenderError::EngineError(format!(
                "Failed to prewarm model {}: {}",
                model,
                response.status()
            )));
        }

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
        Box::pin(async_stream::stream! {
            info!("Streaming {} from Ollama", schema.name);
            debug!("Model: {}, messages: {}, tools: {}", model, messages.len(), tools.len());

            let body = match chat_request(model, messages, tools, schema, config) {
                Ok(body) => body,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let response = match self
                .client
                .post(format!("{}/api/chat", self.config.host))
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };

            if !response.status().is_success() {
                yield Err(RecommenderError::EngineError(format!(
                    "Ollama API error: {}",
                    response.status()
                )));
                return;
            }

            let mut bytes = response.bytes_stream();
            let mut lines = LineBuffer::default();
            let mut tool_calls: Vec<LlmToolCall> = Vec::new();

            loop {
                let (batch, finished) = match bytes.next().await {
                    Some(Ok(chunk)) => (lines.push(&chunk), false),
                    Some(Err(e)) => {
                        yield Err(e.into());
                        return;
                    }
                    None => (lines.finish(), true),
                };

                for line in batch {
                    match parse_chat_line(&line) {
                        Ok(ChatLine { error: Some(message), .. }) => {
                            yield Err(RecommenderError::EngineError(message));
                            return;
                        }
                        Ok(ChatLine { content, calls, .. }) => {
                            if let Some(content) = content {
                                yield Ok(StreamChunk::Content(content));
                            }
                            tool_calls.extend(calls);
                        }
                        Err(e @ RecommenderError::SerializationError(_)) => {
                            warn!("Skipping unreadable stream line: {}", e)
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }

                if finished {
                    break;
                }
            }

            // Ollama may spread calls over several lines; the session wants them together
            if !tool_calls.is_empty() {
                yield Ok(StreamChunk::ToolCalls(tool_calls));
            }
        })
    }
}

/// Splits a byte stream into trimmed, non-empty lines
///
/// Bytes are held until a newline arrives, so a character split across
/// network chunks is decoded whole.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.extend(decode_line(line));
        }
        lines
    }

    fn finish(&mut self) -> Vec<String> {
        decode_line(std::mem::take(&mut self.pending))
            .into_iter()
            .collect()
    }
}

fn decode_line(bytes: Vec<u8>) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(line) => {
            let line = line.trim();
            (!line.is_empty()).then(|| line.to_string())
        }
        Err(e) => {
            warn!("Skipping stream line that is not UTF-8: {}", e);
            None
        }
    }
}

/// What one NDJSON line of a chat stream carried
#[derive(Debug, Default, PartialEq)]
struct ChatLine {
    content: Option<String>,
    calls: Vec<LlmToolCall>,
    error: Option<String>,
}

fn parse_chat_line(line: &str) -> Result<ChatLine> {
    let json: Value = serde_json::from_str(line)?;
    let message = &json["message"];

    Ok(ChatLine {
        content: message["content"].as_str().filter(|c| !c.is_empty()).map(String::from),
        calls: message["tool_calls"]
            .as_array()
            .map(|calls| calls.iter().map(parse_tool_call).collect::<Result<Vec<_>>>())
            .transpose()?
            .unwrap_or_default(),
        error: json["error"].as_str().map(String::from),
    })
}

/// A call the model asked for but that cannot be run is an error, never dropped.
fn parse_tool_call(call: &Value) -> Result<LlmToolCall> {
    let function = &call["function"];
    let name = function["name"]
        .as_str()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| RecommenderError::UnknownTool(format!("(unnamed) {}", call)))?;

    let decode_error = |message: String| RecommenderError::ArgumentDecodeError {
        tool: name.to_string(),
        message,
    };
    let arguments: HashMap<String, Value> = match function.get("arguments") {
        Some(Value::Object(args)) => args.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).map_err(|e| decode_error(e.to_string()))?
        }
        None | Some(Value::Null) => HashMap::new(),
        Some(other) => return Err(decode_error(format!("expected an object, got {}", other))),
    };

    Ok(LlmToolCall {
        id: call.get("id").and_then(Value::as_str).map(String::from),
        name: name.to_string(),
        arguments,
    })
}

fn chat_request(
    model: &str,
    messages: &[LlmMessage],
    tools: &[ToolDescriptor],
    schema: &SchemaDescriptor,
    config: &CompletionConfig,
) -> Result<Value> {
    let mut body = json!({
        "model": model,
        "messages": wire_messages(messages)?,
        "options": wire_options(config),
        "format": schema.json_schema,
        "stream": true
    });

    if !tools.is_empty() {
        body["tools"] = serde_json::to_value(tools)?;
    }

    Ok(body)
}

fn wire_messages(messages: &[LlmMessage]) -> Result<Vec<Value>> {
    messages.iter().map(wire_message).collect()
}

/// Ollama names the tool on a tool message instead of echoing the call
fn wire_message(message: &LlmMessage) -> Result<Value> {
    let mut wire = json!({
        "role": message.role,
        "content": message.content.as_deref().unwrap_or_default(),
    });

    match (message.role, message.tool_calls.as_deref()) {
        (MessageRole::Tool, Some([call, ..])) => wire["tool_name"] = json!(call.name),
        (MessageRole::Tool, _) | (_, None) => {}
        (_, Some(calls)) => {
            let calls: Vec<Value> = calls
                .iter()
                .map(|call| {
                    json!({
                        "type": "function",
                        "function": { "name": call.name, "arguments": call.arguments }
                    })
                })
                .collect();
            wire["tool_calls"] = serde_json::to_value(calls)?;
        }
    }

    Ok(wire)
}

fn wire_options(config: &CompletionConfig) -> Value {
    let mut options = json!({
        "temperature": config.temperature,
        "num_ctx": config.num_ctx,
    });

    let optional = [
        ("num_predict", (config.max_tokens > 0).then(|| json!(config.max_tokens))),
        ("top_p", config.top_p.map(|v| json!(v))),
        ("top_k", config.top_k.map(|v| json!(v))),
        ("seed", config.seed.map(|v| json!(v))),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            options[key] = value;
        }
    }

    options
}
