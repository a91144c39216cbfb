//! Append-only record of a session's history.
//!
//! The transcript starts with the session's instructions and grows with every
//! prompt, tool exchange and model response. It is also the source of the message
//! list sent to the engine, which is how tool results re-enter the model's context.

use crate::error::Result;
use crate::llm::models::{LlmMessage, LlmToolCall};
use crate::llm::prompt::{Instructions, Prompt};
use crate::llm::tools::ToolOutput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    Instructions { segments: Vec<String> },
    Prompt { text: String },
    ToolCalls { calls: Vec<LlmToolCall> },
    ToolOutput { call: LlmToolCall, output: ToolOutput },
    Response { content: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EntryKind,
}

impl TranscriptEntry {
    fn new(kind: EntryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// The engine-facing message for this entry
    pub fn to_message(&self) -> Result<LlmMessage> {
        Ok(match &self.kind {
            EntryKind::Instructions { segments } => LlmMessage::system(segments.join("\n\n")),
            EntryKind::Prompt { text } => LlmMessage::user(text.as_str()),
            EntryKind::ToolCalls { calls } => LlmMessage::tool_request(calls.clone()),
            EntryKind::ToolOutput { call, output } => {
                LlmMessage::tool_result(output.to_content()?, call.clone())
            }
            EntryKind::Response { content } => LlmMessage::assistant(content.as_str()),
        })
    }
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = self.timestamp.format("%H:%M:%S%.3f");
        match &self.kind {
            EntryKind::Instructions { segments } => {
                write!(f, "[{}] Instructions: {}", time, segments.join(" "))
            }
            EntryKind::Prompt { text } => write!(f, "[{}] Prompt: {}", time, text),
            EntryKind::ToolCalls { calls } => {
                let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
                write!(f, "[{}] Tool calls: {}", time, names.join(", "))
            }
            EntryKind::ToolOutput { call, output } => match output {
                ToolOutput::Success { value } => {
                    write!(f, "[{}] Tool output ({}): {}", time, call.name, value)
                }
                ToolOutput::Failure { message } => {
                    write!(f, "[{}] Tool failure ({}): {}", time, call.name, message)
                }
            },
            EntryKind::Response { content } => write!(f, "[{}] Response: {}", time, content),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Start a transcript with the session instructions
    pub fn new(instructions: &Instructions) -> Self {
        let mut transcript = Self::default();
        if !instructions.is_empty() {
            transcript.push(EntryKind::Instructions {
                segments: instructions.segments().to_vec(),
            });
        }
        transcript
    }

    pub fn push(&mut self, kind: EntryKind) {
        self.entries.push(TranscriptEntry::new(kind));
    }

    pub fn push_prompt(&mut self, prompt: &Prompt) {
        self.push(EntryKind::Prompt {
            text: prompt.text().to_string(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_messages(&self) -> Result<Vec<LlmMessage>> {
        self.entries.iter().map(TranscriptEntry::to_message).collect()
    }
}
