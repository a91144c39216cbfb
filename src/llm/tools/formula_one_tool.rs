use crate::data::FormulaOneDriver;
use crate::error::{RecommenderError, Result};
use crate::llm::tools::TypedTool;
use crate::providers::RankingProvider;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FormulaOneToolArguments {
    #[schemars(description = "How many drivers to return, from the championship leader down")]
    pub limit: i64,
}

/// Current drivers' championship standings
#[derive(Clone)]
pub struct FormulaOneStatsTool {
    provider: Arc<dyn RankingProvider>,
}

impl FormulaOneStatsTool {
    pub fn new(provider: Arc<dyn RankingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TypedTool for FormulaOneStatsTool {
    const NAME: &'static str = "formulaonetool";
    const DESCRIPTION: &'static str = "Provides the current championship standings in Formula One";

    type Arguments = FormulaOneToolArguments;
    type Output = Vec<FormulaOneDriver>;

    async fn call(&self, arguments: FormulaOneToolArguments) -> Result<Vec<FormulaOneDriver>> {
        let limit = usize::try_from(arguments.limit).map_err(|_| {
            RecommenderError::ToolError(format!(
                "limit must not be negative, got {}",
                arguments.limit
            ))
        })?;

        self.provider.fetch_drivers(limit).await
    }
}
