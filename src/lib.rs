pub mod config;
pub mod data;
pub mod error;
pub mod llm;
pub mod providers;
pub mod recommend;
pub mod testing;

pub use error::{RecommenderError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::RecommenderConfig;
    pub use crate::error::{RecommenderError, Result};
    pub use crate::llm::gateways::OllamaGateway;
    pub use crate::llm::tools::{LlmTool, ToolDescriptor, TypedTool};
    pub use crate::llm::{
        ErrorPolicy, Generable, GenerationOptions, Instructions, LanguageModelSession, LlmGateway,
        Prompt, Snapshot,
    };
    pub use crate::recommend::{GenerateOutcome, Recommender};
    pub use tokio_util::sync::CancellationToken;
}
