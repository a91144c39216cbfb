pub mod ollama;

pub use ollama::{OllamaConfig, OllamaGateway};
