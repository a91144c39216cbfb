//! Error types and result aliases for the recommender library.
//!
//! This module defines the core error type [`RecommenderError`] and the [`Result`] type
//! alias used throughout the library. Generation failures are per-call: an error ends
//! the stream it occurred in and leaves the session ready for the next request.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommenderError {
    /// A generation was requested while another one was still streaming.
    #[error("Session is already responding to a prompt")]
    SessionBusy,

    /// The engine asked for a tool that is not bound to the session.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool {tool}: {message}")]
    ArgumentDecodeError { tool: String, message: String },

    /// A tool handler failed in a way the model cannot recover from.
    #[error("Tool {tool} failed: {message}")]
    ToolExecutionError { tool: String, message: String },

    /// Recoverable tool failure. The message is handed back to the model.
    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Inference engine error: {0}")]
    EngineError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl RecommenderError {
    /// Whether this error represents cooperative cancellation, which callers swallow.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RecommenderError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, RecommenderError>;
