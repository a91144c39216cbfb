use crate::error::{RecommenderError, Result};
use crate::llm::schema::json_schema_for;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Descriptor for tool function parameters
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDescriptor {
    pub r#type: String,
    pub function: FunctionDescriptor,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescriptor {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Trait for tools the model may call mid-generation
///
/// Handlers may be invoked concurrently and must not mutate shared state.
/// Returning [`RecommenderError::ToolError`] reports a recoverable failure that is
/// handed back to the model; any other error fails the generation.
#[async_trait]
pub trait LlmTool: Send + Sync {
    /// Execute the tool with given arguments
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value>;

    /// Get tool descriptor for LLM
    fn descriptor(&self) -> ToolDescriptor;

    /// JSON schema of the value returned by `run`, when known
    fn result_schema(&self) -> Option<Value> {
        None
    }

    fn name(&self) -> String {
        self.descriptor().function.name
    }

    /// Check if this tool matches the given name
    fn matches(&self, name: &str) -> bool {
        self.descriptor().function.name == name
    }
}

/// A tool with typed arguments and output.
///
/// Every `TypedTool` is an [`LlmTool`]: arguments are decoded from the model's JSON
/// (failing with `ArgumentDecodeError`) and the output is encoded back to JSON.
#[async_trait]
pub trait TypedTool: Send + Sync {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    type Arguments: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + JsonSchema + Send;

    async fn call(&self, arguments: Self::Arguments) -> Result<Self::Output>;
}

#[async_trait]
impl<T> LlmTool for T
where
    T: TypedTool,
{
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let raw = Value::Object(args.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        let arguments: T::Arguments =
            serde_json::from_value(raw).map_err(|e| RecommenderError::ArgumentDecodeError {
                tool: T::NAME.to_string(),
                message: e.to_string(),
            })?;

        let output = self.call(arguments).await?;
        Ok(serde_json::to_value(output)?)
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(T::NAME, T::DESCRIPTION, json_schema_for::<T::Arguments>())
    }

    fn result_schema(&self) -> Option<Value> {
        Some(json_schema_for::<T::Output>())
    }

    fn name(&self) -> String {
        T::NAME.to_string()
    }

    fn matches(&self, name: &str) -> bool {
        T::NAME == name
    }
}
