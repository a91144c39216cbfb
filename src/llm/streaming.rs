//! Publishes a generation's snapshots to observers.
//!
//! The [`StreamingController`] consumes one snapshot stream per generation and keeps
//! a [`GenerationState`] in a `tokio::sync::watch` channel. Each snapshot replaces the
//! published result. Cancellation is cooperative: the token is checked once per
//! received snapshot, and a cancelled generation publishes nothing further and
//! reports no error.

use crate::error::Result;
use futures::stream::{Stream, StreamExt};
use std::fmt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What observers see of a generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationState<P> {
    pub result: Option<P>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<P> Default for GenerationState<P> {
    fn default() -> Self {
        Self {
            result: None,
            is_loading: false,
            error: None,
        }
    }
}

/// What happens to the last snapshot when a generation fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    #[default]
    Clear,
    PreserveLast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

type Observer<P> = Box<dyn Fn(&P) + Send + Sync>;

pub struct StreamingController<P> {
    state: watch::Sender<GenerationState<P>>,
    policy: ErrorPolicy,
    observer: Option<Observer<P>>,
}

impl<P> fmt::Debug for StreamingController<P>
where
    P: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingController")
            .field("state", &*self.state.borrow())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<P> StreamingController<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new(policy: ErrorPolicy) -> Self {
        let (state, _) = watch::channel(GenerationState::default());
        Self {
            state,
            policy,
            observer: None,
        }
    }

    /// Call `observer` with every snapshot right after it is published
    pub fn with_observer(mut self, observer: impl Fn(&P) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationState<P>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> GenerationState<P> {
        self.state.borrow().clone()
    }

    pub fn latest(&self) -> Option<P> {
        self.state.borrow().result.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Discard the previous result and mark a generation as in flight
    pub fn begin(&self) {
        self.state.send_modify(|state| {
            state.result = None;
            state.is_loading = true;
            state.error = None;
        });
    }

    /// End the current generation with `message`, applying the error policy
    pub fn fail(&self, message: impl Into<String>) {
        let policy = self.policy;
        let message = message.into();
        self.state.send_modify(|state| {
            state.is_loading = false;
            state.error = Some(message);
            if policy == ErrorPolicy::Clear {
                state.result = None;
            }
        });
    }

    /// Clear the result and report `message` without running a generation
    pub fn reject(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.send_modify(|state| {
            state.result = None;
            state.is_loading = false;
            state.error = Some(message);
        });
    }

    fn publish(&self, snapshot: P) {
        let observed = self.observer.as_ref().map(|observer| (observer, snapshot.clone()));
        self.state.send_modify(|state| state.result = Some(snapshot));
        if let Some((observer, snapshot)) = observed {
            observer(&snapshot);
        }
    }

    /// Clear the loading flag, notifying watchers only if it was set
    pub(crate) fn settle(&self) {
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.is_loading, false));
    }

    /// Drain `stream`, publishing each snapshot until it ends, fails or `cancel` fires.
    pub async fn consume<S>(&self, stream: S, cancel: &CancellationToken) -> StreamOutcome
    where
        S: Stream<Item = Result<P>>,
    {
        futures::pin_mut!(stream);

        if cancel.is_cancelled() {
            debug!("Generation cancelled before the first snapshot");
            self.settle();
            return StreamOutcome::Cancelled;
        }

        while let Some(item) = stream.next().await {
            if cancel.is_cancelled() {
                debug!("Generation cancelled, discarding in-flight snapshot");
                self.settle();
                return StreamOutcome::Cancelled;
            }

            match item {
                Ok(snapshot) => self.publish(snapshot),
                Err(e) if e.is_cancellation() => {
                    self.settle();
                    return StreamOutcome::Cancelled;
                }
                Err(e) => {
                    warn!("Generation failed: {}", e);
                    let message = e.to_string();
                    self.fail(message.clone());
                    return StreamOutcome::Failed(message);
                }
            }
        }

        self.settle();
        StreamOutcome::Completed
    }
}

impl<P> Default for StreamingController<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(ErrorPolicy::default())
    }
}
