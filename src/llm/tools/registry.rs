use crate::error::{RecommenderError, Result};
use crate::llm::models::LlmToolCall;
use crate::llm::tools::{LlmTool, ToolDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// Result of one tool invocation, as recorded and returned to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutput {
    Success { value: Value },
    Failure { message: String },
}

impl ToolOutput {
    /// Message content handed back to the engine
    pub fn to_content(&self) -> Result<String> {
        match self {
            ToolOutput::Success { value } => Ok(serde_json::to_string(value)?),
            ToolOutput::Failure { message } => Ok(json!({ "error": message }).to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutput::Success { .. })
    }
}

/// The fixed set of tools bound to a session
///
/// Names are unique within a registry. Dispatch never calls a handler for an
/// unknown name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn LlmTool>>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    /// Build a registry, rejecting duplicate tool names
    pub fn new(tools: Vec<Box<dyn LlmTool>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for tool in &tools {
            let name = tool.name();
            if !seen.insert(name.clone()) {
                return Err(RecommenderError::ConfigError(format!(
                    "duplicate tool name: {}",
                    name
                )));
            }
        }

        Ok(Self {
            tools,
            timeout: None,
        })
    }

    /// Bound every handler invocation by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&dyn LlmTool> {
        self.tools.iter().find(|t| t.matches(name)).map(|t| t.as_ref())
    }

    /// Invoke the tool named by `call`.
    ///
    /// Recoverable handler failures come back as [`ToolOutput::Failure`]. Unknown
    /// tools, undecodable arguments and handler faults are errors that end the
    /// generation.
    pub async fn dispatch(&self, call: &LlmToolCall) -> Result<ToolOutput> {
        let tool = self.find(&call.name).ok_or_else(|| {
            warn!("Tool not found: {}", call.name);
            RecommenderError::UnknownTool(call.name.clone())
        })?;

        info!("Executing tool: {}", call.name);

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, tool.run(&call.arguments)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Tool {} timed out after {:?}", call.name, limit);
                    return Err(RecommenderError::ToolExecutionError {
                        tool: call.name.clone(),
                        message: format!("timed out after {:?}", limit),
                    });
                }
            },
            None => tool.run(&call.arguments).await,
        };

        match result {
            Ok(value) => Ok(ToolOutput::Success { value }),
            Err(RecommenderError::ToolError(message)) => {
                warn!("Tool {} reported a failure: {}", call.name, message);
                Ok(ToolOutput::Failure { message })
            }
            Err(e @ RecommenderError::ArgumentDecodeError { .. })
            | Err(e @ RecommenderError::ToolExecutionError { .. }) => Err(e),
            Err(e) => {
                warn!("Tool execution failed: {}", e);
                Err(RecommenderError::ToolExecutionError {
                    tool: call.name.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}
