use crate::data::Coffee;
use crate::error::Result;
use crate::llm::tools::TypedTool;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CoffeeToolArguments {
    #[serde(rename = "naturalLanguageQuery")]
    #[schemars(description = "The users original query")]
    pub natural_language_query: String,
}

/// Lists the whole menu, whatever the query
#[derive(Debug, Clone)]
pub struct CoffeeTool {
    catalog: Arc<Vec<Coffee>>,
}

impl CoffeeTool {
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(Coffee::all()))
    }

    pub fn with_catalog(catalog: Arc<Vec<Coffee>>) -> Self {
        Self { catalog }
    }
}

impl Default for CoffeeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TypedTool for CoffeeTool {
    const NAME: &'static str = "coffeetool";
    const DESCRIPTION: &'static str = "Provides coffee options available in our coffee shop.";

    type Arguments = CoffeeToolArguments;
    type Output = Vec<Coffee>;

    async fn call(&self, _arguments: CoffeeToolArguments) -> Result<Vec<Coffee>> {
        Ok(self.catalog.as_ref().clone())
    }
}
