use crate::error::RecommenderError;
use crate::llm::gateway::GenerationOptions;
use crate::llm::prompt::Prompt;
use crate::llm::schema::Generable;
use crate::llm::session::LanguageModelSession;
use crate::llm::streaming::{ErrorPolicy, GenerationState, StreamOutcome, StreamingController};
use crate::llm::transcript::Transcript;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How a call to `generate` ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    Completed,
    Cancelled,
    Failed(String),
    /// Another generation was already in flight
    Skipped,
}

impl From<StreamOutcome> for GenerateOutcome {
    fn from(outcome: StreamOutcome) -> Self {
        match outcome {
            StreamOutcome::Completed => GenerateOutcome::Completed,
            StreamOutcome::Cancelled => GenerateOutcome::Cancelled,
            StreamOutcome::Failed(message) => GenerateOutcome::Failed(message),
        }
    }
}

/// Ends the loading state when a `generate` future is dropped mid-stream
struct LoadingGuard<'a, P: Clone + Send + Sync + 'static>(&'a StreamingController<P>);

impl<P: Clone + Send + Sync + 'static> Drop for LoadingGuard<'_, P> {
    fn drop(&mut self) {
        self.0.settle();
    }
}

/// One session generating one target type, with its latest result published
pub struct Recommender<T: Generable> {
    session: LanguageModelSession,
    controller: StreamingController<T::Partial>,
    options: GenerationOptions,
}

impl<T: Generable> Recommender<T> {
    /// Uses greedy sampling and leaves the schema out of the prompt
    pub fn new(session: LanguageModelSession, policy: ErrorPolicy) -> Self {
        Self {
            session,
            controller: StreamingController::new(policy),
            options: GenerationOptions::greedy(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn session(&self) -> &LanguageModelSession {
        &self.session
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn prewarm(&self) {
        self.session.prewarm();
    }

    /// Generate a fresh result for `prompt`, publishing every snapshot.
    ///
    /// Returns [`GenerateOutcome::Skipped`] without touching the published state
    /// when a generation is already in flight.
    pub async fn generate(&self, prompt: Prompt, cancel: &CancellationToken) -> GenerateOutcome {
        if self.controller.is_loading() || self.session.is_responding() {
            debug!("Generation already in flight, skipping");
            return GenerateOutcome::Skipped;
        }

        let stream = match self.session.stream_response::<T>(prompt, &self.options) {
            Ok(stream) => stream,
            Err(RecommenderError::SessionBusy) => return GenerateOutcome::Skipped,
            Err(e) => {
                let message = e.to_string();
                self.controller.fail(message.clone());
                return GenerateOutcome::Failed(message);
            }
        };

        self.controller.begin();
        let _loading = LoadingGuard(&self.controller);
        let snapshots = stream.map(|item| item.map(|snapshot| snapshot.content));
        let outcome = self.controller.consume(snapshots, cancel).await;
        info!("Generation finished: {:?}", outcome);

        outcome.into()
    }

    pub fn latest_result(&self) -> Option<T::Partial> {
        self.controller.latest()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.controller.last_error()
    }

    pub fn state(&self) -> GenerationState<T::Partial> {
        self.controller.state()
    }

    /// Watch every change to the published state
    pub fn subscribe(&self) -> watch::Receiver<GenerationState<T::Partial>> {
        self.controller.subscribe()
    }

    pub fn transcript(&self) -> Transcript {
        self.session.transcript()
    }

    pub(crate) fn reject(&self, message: &str) {
        self.controller.reject(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompt::Instructions;
    use crate::testing::{ScriptedGateway, ScriptedTurn};
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Tip {
        text: String,
        score: i64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct PartialTip {
        text: Option<String>,
        score: Option<i64>,
    }

    impl Generable for Tip {
        type Partial = PartialTip;
    }

    fn recommender(gateway: Arc<ScriptedGateway>, policy: ErrorPolicy) -> Recommender<Tip> {
        let session = LanguageModelSession::builder(gateway)
            .instructions(Instructions::new().segment("Give one tip."))
            .generation_timeout(Duration::from_secs(30))
            .build()
            .unwrap();
        Recommender::new(session, policy)
    }

    #[tokio::test]
    async fn test_generate_publishes_final_snapshot() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ScriptedTurn::json(
            &json!({"text": "Drink water", "score": 4}),
            5,
        )]));
        let recommender = recommender(gateway, ErrorPolicy::Clear);
        let mut updates = recommender.subscribe();

        let outcome = recommender.generate("tip".into(), &CancellationToken::new()).await;

        assert_eq!(outcome, GenerateOutcome::Completed);
        let latest = recommender.latest_result().unwrap();
        assert_eq!(latest.text.as_deref(), Some("Drink water"));
        assert_eq!(latest.score, Some(4));
        assert!(!recommender.is_loading());
        assert!(recommender.last_error().is_none());
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().result, Some(latest));
    }

    #[tokio::test]
    async fn test_next_generate_discards_previous_result() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::json(&json!({"text": "First", "score": 1}), 1),
            ScriptedTurn::new().fail("offline"),
        ]));
        let recommender = recommender(gateway, ErrorPolicy::Clear);
        let cancel = CancellationToken::new();

        recommender.generate("one".into(), &cancel).await;
        assert!(recommender.latest_result().is_some());

        let outcome = recommender.generate("two".into(), &cancel).await;
        assert!(matches!(outcome, GenerateOutcome::Failed(ref m) if m.contains("offline")));
        assert!(recommender.latest_result().is_none());
        assert!(recommender.last_error().is_some());
    }

    #[tokio::test]
    async fn test_failure_preserves_last_snapshot_when_asked() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().content(r#"{"text": "Half"#).fail("offline"),
        ]));
        let recommender = recommender(gateway, ErrorPolicy::PreserveLast);

        recommender.generate("tip".into(), &CancellationToken::new()).await;

        assert_eq!(recommender.latest_result().unwrap().text.as_deref(), Some("Half"));
        assert!(recommender.last_error().unwrap().contains("offline"));
        assert!(!recommender.is_loading());
    }

    #[tokio::test]
    async fn test_cancelled_generation_reports_no_error() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ScriptedTurn::json(
            &json!({"text": "Never shown", "score": 2}),
            3,
        )]));
        let recommender = recommender(gateway, ErrorPolicy::Clear);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = recommender.generate("tip".into(), &cancel).await;

        assert_eq!(outcome, GenerateOutcome::Cancelled);
        assert!(recommender.latest_result().is_none());
        assert!(recommender.last_error().is_none());
        assert!(!recommender.is_loading());
        assert!(!recommender.session().is_responding());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_while_loading_is_skipped() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ScriptedTurn::new()
            .content(r#"{"text": "Slow"#)
            .hang()]));
        let recommender = recommender(gateway.clone(), ErrorPolicy::Clear);
        let cancel = CancellationToken::new();

        let (first, second) = tokio::join!(recommender.generate("one".into(), &cancel), async {
            while !recommender.is_loading() {
                tokio::task::yield_now().await;
            }
            recommender.generate("two".into(), &cancel).await
        });

        assert_eq!(second, GenerateOutcome::Skipped);
        assert!(matches!(first, GenerateOutcome::Failed(ref m) if m.contains("Timeout")));
        assert_eq!(gateway.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_generate_leaves_recommender_usable() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ScriptedTurn::new()
            .content(r#"{"text": "Slow"#)
            .hang()]));
        let recommender = recommender(gateway.clone(), ErrorPolicy::Clear);
        let cancel = CancellationToken::new();

        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            recommender.generate("one".into(), &cancel),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!recommender.is_loading());
        assert!(!recommender.session().is_responding());

        gateway.push_turn(ScriptedTurn::json(&json!({"text": "Fast", "score": 3}), 2));
        let outcome = recommender.generate("two".into(), &cancel).await;

        assert_eq!(outcome, GenerateOutcome::Completed);
        assert_eq!(recommender.latest_result().unwrap().text.as_deref(), Some("Fast"));
    }
}
