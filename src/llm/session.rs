//! Long-lived conversational sessions that stream structured responses.
//!
//! A [`LanguageModelSession`] is bound to fixed [`Instructions`] and a fixed
//! [`ToolRegistry`] when it is built. Each call to
//! [`stream_response`](LanguageModelSession::stream_response) runs one generation:
//! the engine may request tools any number of times (bounded by
//! `max_tool_rounds`), their outputs are fed back through the transcript, and every
//! change to the decoded partial result is yielded as a full [`Snapshot`].
//!
//! Only one generation may be in flight per session. A second request while one
//! is streaming fails with [`RecommenderError::SessionBusy`] and leaves the running
//! stream untouched.

use crate::config::{RecommenderConfig, DEFAULT_MODEL};
use crate::error::{RecommenderError, Result};
use crate::llm::gateway::{CompletionConfig, GenerationOptions, LlmGateway, StreamChunk};
use crate::llm::models::LlmToolCall;
use crate::llm::prompt::{Instructions, Prompt};
use crate::llm::schema::{decode_complete, decode_partial, Generable};
use crate::llm::tools::{LlmTool, ToolOutput, ToolRegistry};
use crate::llm::transcript::{EntryKind, Transcript};
use futures::stream::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Recorded for calls left unrun after an earlier call in the same round failed
const SKIPPED_TOOL_CALL: &str = "not run because an earlier tool call failed";

/// One increment of a streamed generation
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<P> {
    /// The partial result decoded so far, replacing any earlier snapshot
    pub content: P,
    /// The raw JSON text it was decoded from
    pub raw_content: String,
}

pub type ResponseStream<P> = Pin<Box<dyn Stream<Item = Result<Snapshot<P>>> + Send>>;

/// Clears the responding flag when the generation that set it ends or is dropped
struct RespondingGuard(Arc<AtomicBool>);

impl Drop for RespondingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock(transcript: &Mutex<Transcript>) -> MutexGuard<'_, Transcript> {
    transcript.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn within<F: Future>(deadline: Option<Instant>, future: F) -> Result<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future)
            .await
            .map_err(|_| RecommenderError::TimeoutError("generation deadline elapsed".to_string())),
        None => Ok(future.await),
    }
}

/// A conversational context bound to one model, fixed instructions and fixed tools.
///
/// # Examples
///
/// ```ignore
/// use recommender::llm::gateways::OllamaGateway;
/// use recommender::llm::{GenerationOptions, Instructions, LanguageModelSession};
/// use std::sync::Arc;
///
/// let session = LanguageModelSession::builder(Arc::new(OllamaGateway::default()))
///     .instructions(Instructions::new().segment("Recommend one coffee."))
///     .tool(Box::new(CoffeeToolPlus::new()))
///     .build()?;
///
/// let mut stream = session.stream_response::<CoffeeRecommendation>(
///     "something sweet".into(),
///     &GenerationOptions::greedy(),
/// )?;
/// while let Some(snapshot) = stream.next().await {
///     println!("{:?}", snapshot?.content);
/// }
/// ```
pub struct LanguageModelSession {
    model: String,
    gateway: Arc<dyn LlmGateway>,
    tools: Arc<ToolRegistry>,
    transcript: Arc<Mutex<Transcript>>,
    responding: Arc<AtomicBool>,
    generation_timeout: Option<Duration>,
    max_tool_rounds: usize,
}

impl LanguageModelSession {
    pub fn builder(gateway: Arc<dyn LlmGateway>) -> SessionBuilder {
        SessionBuilder::new(gateway)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// True exactly while a generation is in flight
    pub fn is_responding(&self) -> bool {
        self.responding.load(Ordering::Acquire)
    }

    /// A copy of the entries recorded so far, oldest first
    pub fn transcript(&self) -> Transcript {
        lock(&self.transcript).clone()
    }

    /// Ask the engine to load the model ahead of the first request.
    ///
    /// Runs in the background on the current Tokio runtime and only logs failures.
    pub fn prewarm(&self) {
        let gateway = self.gateway.clone();
        let model = self.model.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = gateway.prewarm(&model).await {
                        warn!("Prewarm of {} failed: {}", model, e);
                    }
                });
            }
            Err(_) => warn!("No async runtime available to prewarm {}", self.model),
        }
    }

    /// Start a generation of `T` and stream its snapshots.
    ///
    /// The stream is lazy: nothing is sent to the engine until it is polled. It
    /// yields a snapshot whenever the decoded partial result changes and ends after
    /// the final content, or with the first error. The session is responding from
    /// this call until the stream ends or is dropped.
    pub fn stream_response<T: Generable>(
        &self,
        prompt: Prompt,
        options: &GenerationOptions,
    ) -> Result<ResponseStream<T::Partial>> {
        if self
            .responding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected prompt while session is responding");
            return Err(RecommenderError::SessionBusy);
        }
        let guard = RespondingGuard(self.responding.clone());

        let schema = T::schema();
        let prompt = if options.include_schema_in_prompt {
            prompt.with_guidance(&schema.guidance())
        } else {
            prompt
        };
        let config = CompletionConfig::from_options(options);
        let model = self.model.clone();
        let gateway = self.gateway.clone();
        let tools = self.tools.clone();
        let transcript = self.transcript.clone();
        let deadline = self.generation_timeout.map(|limit| Instant::now() + limit);
        let max_tool_rounds = self.max_tool_rounds;

        Ok(Box::pin(async_stream::stream! {
            let _guard = guard;
            let descriptors = tools.descriptors();
            lock(&transcript).push_prompt(&prompt);
            info!("Generating {} with {}", schema.name, model);

            let mut rounds = 0;
            loop {
                let messages = lock(&transcript).to_messages();
                let messages = match messages {
                    Ok(messages) => messages,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut engine =
                    gateway.complete_stream(&model, &messages, &descriptors, &schema, &config);
                let mut content = String::new();
                let mut requested: Vec<LlmToolCall> = Vec::new();
                let mut last: Option<T::Partial> = None;

                loop {
                    let next = match within(deadline, engine.next()).await {
                        Ok(next) => next,
                        Err(e) => {
                            warn!("Generation of {} timed out", schema.name);
                            yield Err(e);
                            return;
                        }
                    };

                    match next {
                        None => break,
                        Some(Ok(StreamChunk::Content(delta))) => {
                            content.push_str(&delta);
                            if let Some(partial) = decode_partial::<T>(&content) {
                                if last.as_ref() != Some(&partial) {
                                    last = Some(partial.clone());
                                    yield Ok(Snapshot {
                                        content: partial,
                                        raw_content: content.clone(),
                                    });
                                }
                            }
                        }
                        Some(Ok(StreamChunk::ToolCalls(calls))) => requested.extend(calls),
                        Some(Err(e)) => {
                            warn!("Engine failed while generating {}: {}", schema.name, e);
                            yield Err(e);
                            return;
                        }
                    }
                }
                drop(engine);

                if requested.is_empty() {
                    lock(&transcript).push(EntryKind::Response { content: content.clone() });
                    debug!("Transcript after generation:\n{}", render(&lock(&transcript)));

                    if let Err(e) = decode_complete::<T>(&content) {
                        warn!("Final content does not satisfy {}: {}", schema.name, e);
                        yield Err(e);
                    }
                    return;
                }

                rounds += 1;
                if rounds > max_tool_rounds {
                    yield Err(RecommenderError::EngineError(format!(
                        "model kept requesting tools after {} rounds",
                        max_tool_rounds
                    )));
                    return;
                }

                let calls: Vec<LlmToolCall> = requested
                    .into_iter()
                    .map(|mut call| {
                        if call.id.is_none() {
                            call.id = Some(Uuid::new_v4().to_string());
                        }
                        call
                    })
                    .collect();
                info!("Tool calls requested: {}", calls.len());

                {
                    let mut transcript = lock(&transcript);
                    if !content.trim().is_empty() {
                        transcript.push(EntryKind::Response { content: content.clone() });
                    }
                    transcript.push(EntryKind::ToolCalls { calls: calls.clone() });
                }

                let mut pending = calls.into_iter();
                while let Some(call) = pending.next() {
                    let dispatched = within(deadline, tools.dispatch(&call)).await.and_then(|r| r);
                    match dispatched {
                        Ok(output) => {
                            lock(&transcript).push(EntryKind::ToolOutput { call, output });
                        }
                        Err(e) => {
                            // Every requested call gets an answer, so the next
                            // generation never replays an unanswered request
                            {
                                let mut transcript = lock(&transcript);
                                transcript.push(EntryKind::ToolOutput {
                                    call,
                                    output: ToolOutput::Failure { message: e.to_string() },
                                });
                                for skipped in pending.by_ref() {
                                    transcript.push(EntryKind::ToolOutput {
                                        call: skipped,
                                        output: ToolOutput::Failure {
                                            message: SKIPPED_TOOL_CALL.to_string(),
                                        },
                                    });
                                }
                            }
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        }))
    }

    /// Run a generation to completion and return the validated result
    pub async fn respond<T: Generable>(
        &self,
        prompt: Prompt,
        options: &GenerationOptions,
    ) -> Result<T> {
        let mut stream = self.stream_response::<T>(prompt, options)?;
        let mut raw = String::new();
        while let Some(snapshot) = stream.next().await {
            raw = snapshot?.raw_content;
        }
        decode_complete::<T>(&raw)
    }
}

fn render(transcript: &Transcript) -> String {
    transcript
        .entries()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builder for constructing a [`LanguageModelSession`]
pub struct SessionBuilder {
    gateway: Arc<dyn LlmGateway>,
    model: String,
    instructions: Instructions,
    tools: Vec<Box<dyn LlmTool>>,
    tool_timeout: Option<Duration>,
    generation_timeout: Option<Duration>,
    max_tool_rounds: usize,
}

impl SessionBuilder {
    fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            gateway,
            model: DEFAULT_MODEL.to_string(),
            instructions: Instructions::new(),
            tools: Vec::new(),
            tool_timeout: None,
            generation_timeout: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Take model name and timeouts from `config`
    pub fn configure(mut self, config: &RecommenderConfig) -> Self {
        self.model = config.model.clone();
        self.tool_timeout = config.tool_timeout;
        self.generation_timeout = config.generation_timeout;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn instructions(mut self, instructions: Instructions) -> Self {
        self.instructions = instructions;
        self
    }

    /// Bind one more tool
    pub fn tool(mut self, tool: Box<dyn LlmTool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<Box<dyn LlmTool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = Some(timeout);
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Build the session. Fails with `ConfigError` on duplicate tool names.
    ///
    /// Does not contact the engine.
    pub fn build(self) -> Result<LanguageModelSession> {
        let mut registry = ToolRegistry::new(self.tools)?;
        if let Some(timeout) = self.tool_timeout {
            registry = registry.with_timeout(timeout);
        }

        Ok(LanguageModelSession {
            model: self.model,
            gateway: self.gateway,
            tools: Arc::new(registry),
            transcript: Arc::new(Mutex::new(Transcript::new(&self.instructions))),
            responding: Arc::new(AtomicBool::new(false)),
            generation_timeout: self.generation_timeout,
            max_tool_rounds: self.max_tool_rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::MessageRole;
    use crate::llm::tools::{ToolOutput, TypedTool};
    use crate::testing::{ScriptedGateway, ScriptedTurn};
    use async_trait::async_trait;
    use schemars::JsonSchema;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
    struct Pick {
        #[schemars(description = "A coffee to recommend")]
        name: String,
        reason: String,
    }

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct PartialPick {
        name: Option<String>,
        reason: Option<String>,
    }

    impl Generable for Pick {
        type Partial = PartialPick;
    }

    #[derive(Deserialize, JsonSchema)]
    struct MenuArguments {
        #[allow(dead_code)]
        tags: Vec<String>,
    }

    struct MenuTool;

    #[async_trait]
    impl TypedTool for MenuTool {
        const NAME: &'static str = "menu";
        const DESCRIPTION: &'static str = "Lists drinks for tags.";
        type Arguments = MenuArguments;
        type Output = Vec<String>;

        async fn call(&self, _arguments: MenuArguments) -> Result<Vec<String>> {
            Ok(vec!["Mocha".to_string(), "Affogato".to_string()])
        }
    }

    fn session(gateway: Arc<ScriptedGateway>) -> LanguageModelSession {
        LanguageModelSession::builder(gateway)
            .model("test-model")
            .instructions(Instructions::new().segment("Recommend one coffee."))
            .tool(Box::new(MenuTool))
            .build()
            .unwrap()
    }

    fn final_pick() -> serde_json::Value {
        json!({"name": "Mocha", "reason": "It is sweet and creamy"})
    }

    async fn collect(stream: ResponseStream<PartialPick>) -> Vec<Result<Snapshot<PartialPick>>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_builder_rejects_duplicate_tools() {
        let result = LanguageModelSession::builder(Arc::new(ScriptedGateway::default()))
            .tool(Box::new(MenuTool))
            .tool(Box::new(MenuTool))
            .build();

        assert!(matches!(result, Err(RecommenderError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_new_session_holds_only_instructions() {
        let gateway = Arc::new(ScriptedGateway::default());
        let session = session(gateway.clone());

        assert_eq!(session.transcript().len(), 1);
        assert!(!session.is_responding());
        assert_eq!(gateway.request_count(), 0);
        assert_eq!(session.tools().names(), vec!["menu".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_yields_growing_snapshots() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ScriptedTurn::json(&final_pick(), 6)]));
        let session = session(gateway.clone());

        let stream = session
            .stream_response::<Pick>("sweet".into(), &GenerationOptions::greedy())
            .unwrap();
        let snapshots: Vec<_> = collect(stream).await.into_iter().map(|s| s.unwrap()).collect();

        assert!(!snapshots.is_empty());
        let last = snapshots.last().unwrap();
        assert_eq!(last.content.name.as_deref(), Some("Mocha"));
        assert_eq!(last.content.reason.as_deref(), Some("It is sweet and creamy"));
        for pair in snapshots.windows(2) {
            assert_ne!(pair[0].content, pair[1].content);
        }
        assert!(!session.is_responding());
    }

    #[tokio::test]
    async fn test_transcript_records_tool_round_in_order() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().tool_call("menu", json!({"tags": ["sweet"]})),
            ScriptedTurn::json(&final_pick(), 3),
        ]));
        let session = session(gateway.clone());

        let pick = session
            .respond::<Pick>("sweet".into(), &GenerationOptions::greedy())
            .await
            .unwrap();
        assert_eq!(pick.name, "Mocha");

        let kinds: Vec<&str> = session
            .transcript()
            .entries()
            .iter()
            .map(|e| match e.kind {
                EntryKind::Instructions { .. } => "instructions",
                EntryKind::Prompt { .. } => "prompt",
                EntryKind::ToolCalls { .. } => "tool_calls",
                EntryKind::ToolOutput { .. } => "tool_output",
                EntryKind::Response { .. } => "response",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["instructions", "prompt", "tool_calls", "tool_output", "response"]
        );

        let transcript = session.transcript();
        match &transcript.entries()[3].kind {
            EntryKind::ToolOutput { call, output } => {
                assert!(call.id.is_some());
                assert_eq!(
                    output,
                    &ToolOutput::Success {
                        value: json!(["Mocha", "Affogato"])
                    }
                );
            }
            other => panic!("Expected tool output, got {:?}", other),
        }

        let requests = gateway.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools, vec!["menu".to_string()]);
        let tool_message = requests[1].messages.last().unwrap();
        assert_eq!(tool_message.role, MessageRole::Tool);
        assert_eq!(tool_message.content.as_deref(), Some(r#"["Mocha","Affogato"]"#));
    }

    #[tokio::test]
    async fn test_transcript_grows_across_generations() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::json(&final_pick(), 2),
            ScriptedTurn::json(&final_pick(), 2),
        ]));
        let session = session(gateway.clone());
        let options = GenerationOptions::greedy();

        session.respond::<Pick>("one".into(), &options).await.unwrap();
        session.respond::<Pick>("two".into(), &options).await.unwrap();

        assert_eq!(session.transcript().len(), 5);
        assert_eq!(gateway.requests()[1].messages.len(), 4);
    }

    #[tokio::test]
    async fn test_second_stream_while_responding_is_busy() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ScriptedTurn::json(&final_pick(), 4)]));
        let session = session(gateway.clone());
        let options = GenerationOptions::greedy();

        let mut first = session.stream_response::<Pick>("sweet".into(), &options).unwrap();
        let snapshot = first.next().await.unwrap().unwrap();
        assert!(session.is_responding());

        let busy = session.stream_response::<Pick>("bitter".into(), &options);
        assert!(matches!(busy, Err(RecommenderError::SessionBusy)));

        let mut last = snapshot;
        while let Some(next) = first.next().await {
            last = next.unwrap();
        }
        assert_eq!(last.content.name.as_deref(), Some("Mocha"));
        assert_eq!(gateway.request_count(), 1);
        assert!(!session.is_responding());
    }

    #[tokio::test]
    async fn test_dropping_stream_returns_session_to_idle() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ScriptedTurn::json(&final_pick(), 4)]));
        let session = session(gateway);

        let stream = session
            .stream_response::<Pick>("sweet".into(), &GenerationOptions::greedy())
            .unwrap();
        assert!(session.is_responding());
        drop(stream);
        assert!(!session.is_responding());
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_generation() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().tool_call("teatool", json!({})),
        ]));
        let session = session(gateway.clone());

        let results = collect(
            session
                .stream_response::<Pick>("sweet".into(), &GenerationOptions::greedy())
                .unwrap(),
        )
        .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(RecommenderError::UnknownTool(_))));
        assert_eq!(gateway.request_count(), 1);
        assert!(!session.is_responding());

        // The failed call is answered in the transcript
        let transcript = session.transcript();
        match &transcript.entries().last().unwrap().kind {
            EntryKind::ToolOutput { call, output } => {
                assert_eq!(call.name, "teatool");
                assert!(!output.is_success());
                assert!(output.to_content().unwrap().contains("teatool"));
            }
            other => panic!("Expected a tool output, got {:?}", other),
        }
        let messages = transcript.to_messages().unwrap();
        assert_eq!(messages.last().unwrap().role, MessageRole::Tool);
    }

    #[tokio::test]
    async fn test_calls_after_a_failed_call_are_answered_as_skipped() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ScriptedTurn::new()
            .tool_call("teatool", json!({}))
            .tool_call("menu", json!({"tags": ["sweet"]}))]));
        let session = session(gateway);

        let err = session
            .respond::<Pick>("sweet".into(), &GenerationOptions::greedy())
            .await
            .unwrap_err();
        assert!(matches!(err, RecommenderError::UnknownTool(_)));

        let transcript = session.transcript();
        let outputs: Vec<(&str, &ToolOutput)> = transcript
            .entries()
            .iter()
            .filter_map(|entry| match &entry.kind {
                EntryKind::ToolOutput { call, output } => Some((call.name.as_str(), output)),
                _ => None,
            })
            .collect();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].0, "teatool");
        assert_eq!(outputs[1].0, "menu");
        assert_eq!(
            *outputs[1].1,
            ToolOutput::Failure { message: SKIPPED_TOOL_CALL.to_string() }
        );
    }

    #[tokio::test]
    async fn test_bad_tool_arguments_fail_generation() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().tool_call("menu", json!({"tags": "sweet"})),
        ]));
        let session = session(gateway);

        let err = session
            .respond::<Pick>("sweet".into(), &GenerationOptions::greedy())
            .await
            .unwrap_err();
        assert!(matches!(err, RecommenderError::ArgumentDecodeError { .. }));
    }

    #[tokio::test]
    async fn test_incomplete_final_content_is_schema_violation() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().content(r#"{"name": "Mocha"}"#),
        ]));
        let session = session(gateway);

        let results = collect(
            session
                .stream_response::<Pick>("sweet".into(), &GenerationOptions::greedy())
                .unwrap(),
        )
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().content.name.as_deref(), Some("Mocha"));
        assert!(matches!(results[1], Err(RecommenderError::SchemaViolation(_))));
    }

    #[tokio::test]
    async fn test_engine_error_ends_stream() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().content(r#"{"name": "Mo"#).fail("connection reset"),
        ]));
        let session = session(gateway);

        let results = collect(
            session
                .stream_response::<Pick>("sweet".into(), &GenerationOptions::greedy())
                .unwrap(),
        )
        .await;

        assert!(results[0].is_ok());
        match results.last().unwrap() {
            Err(RecommenderError::EngineError(message)) => assert_eq!(message, "connection reset"),
            other => panic!("Expected engine error, got {:?}", other),
        }
        assert!(!session.is_responding());
    }

    #[tokio::test]
    async fn test_tool_rounds_are_bounded() {
        let turns = (0..3)
            .map(|_| ScriptedTurn::new().tool_call("menu", json!({"tags": []})))
            .collect();
        let gateway = Arc::new(ScriptedGateway::new(turns));
        let session = LanguageModelSession::builder(gateway.clone())
            .tool(Box::new(MenuTool))
            .max_tool_rounds(2)
            .build()
            .unwrap();

        let err = session
            .respond::<Pick>("sweet".into(), &GenerationOptions::greedy())
            .await
            .unwrap_err();
        assert!(matches!(err, RecommenderError::EngineError(_)));
        assert_eq!(gateway.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().content("{").hang(),
        ]));
        let session = LanguageModelSession::builder(gateway)
            .generation_timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        let err = session
            .respond::<Pick>("sweet".into(), &GenerationOptions::greedy())
            .await
            .unwrap_err();
        assert!(matches!(err, RecommenderError::TimeoutError(_)));
        assert!(!session.is_responding());
    }

    #[tokio::test]
    async fn test_schema_guidance_appended_on_request() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::json(&final_pick(), 1),
            ScriptedTurn::json(&final_pick(), 1),
        ]));
        let session = session(gateway.clone());

        let with_schema = GenerationOptions::default();
        session.respond::<Pick>("sweet".into(), &with_schema).await.unwrap();
        session.respond::<Pick>("sweet".into(), &GenerationOptions::greedy()).await.unwrap();

        let requests = gateway.requests();
        let first_prompt = requests[0].messages[1].content.clone().unwrap();
        assert!(first_prompt.starts_with("sweet\n\n"));
        assert!(first_prompt.contains("A coffee to recommend"));
        assert_eq!(requests[1].messages.last().unwrap().content.as_deref(), Some("sweet"));
        assert_eq!(requests[1].config.temperature, 0.0);
    }

    #[tokio::test]
    async fn test_prewarm_runs_in_background() {
        let gateway = Arc::new(ScriptedGateway::default());
        let session = session(gateway.clone());

        session.prewarm();
        for _ in 0..10 {
            if gateway.prewarm_count() > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(gateway.prewarm_count(), 1);
        assert_eq!(gateway.request_count(), 0);
    }
}
