pub mod gateway;
pub mod gateways;
pub mod models;
pub mod prompt;
pub mod schema;
pub mod session;
pub mod streaming;
pub mod tools;
pub mod transcript;

pub use gateway::{CompletionConfig, GenerationOptions, LlmGateway, Sampling, StreamChunk};
pub use models::{LlmMessage, LlmToolCall, MessageRole};
pub use prompt::{Instructions, Prompt};
pub use schema::{FieldGuide, Generable, SchemaDescriptor};
pub use session::{LanguageModelSession, ResponseStream, SessionBuilder, Snapshot};
pub use streaming::{ErrorPolicy, GenerationState, StreamOutcome, StreamingController};
pub use tools::{LlmTool, ToolDescriptor, ToolOutput, ToolRegistry, TypedTool};
pub use transcript::{EntryKind, Transcript, TranscriptEntry};
