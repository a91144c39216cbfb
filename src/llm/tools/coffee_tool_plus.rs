use crate::data::{Coffee, CoffeeTag};
use crate::error::Result;
use crate::llm::tools::TypedTool;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CoffeeToolPlusArguments {
    #[schemars(description = "The tags that will be used to find a coffee")]
    pub tags: Vec<CoffeeTag>,
}

/// Lists the coffees sharing at least one tag with the request, in menu order
#[derive(Debug, Clone)]
pub struct CoffeeToolPlus {
    catalog: Arc<Vec<Coffee>>,
}

impl CoffeeToolPlus {
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(Coffee::all()))
    }

    pub fn with_catalog(catalog: Arc<Vec<Coffee>>) -> Self {
        Self { catalog }
    }

    pub fn filter(&self, tags: &[CoffeeTag]) -> Vec<Coffee> {
        self.catalog.iter().filter(|coffee| coffee.has_any_tag(tags)).cloned().collect()
    }
}

impl Default for CoffeeToolPlus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TypedTool for CoffeeToolPlus {
    const NAME: &'static str = "coffeetoolplus";
    const DESCRIPTION: &'static str =
        "Provides coffee options available in our coffee shop for a set of tags.";

    type Arguments = CoffeeToolPlusArguments;
    type Output = Vec<Coffee>;

    async fn call(&self, arguments: CoffeeToolPlusArguments) -> Result<Vec<Coffee>> {
        Ok(self.filter(&arguments.tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecommenderError;
    use crate::llm::tools::LlmTool;
    use serde_json::json;
    use std::collections::HashMap;

    fn names(coffees: &[Coffee]) -> Vec<&str> {
        coffees.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_sweet_or_creamy_filter() {
        let found = CoffeeToolPlus::new().filter(&[CoffeeTag::Sweet, CoffeeTag::Creamy]);
        let found = names(&found);

        for expected in ["Mocha", "Affogato", "Irish Coffee", "Vienna Coffee", "Frappuccino"] {
            assert!(found.contains(&expected), "missing {}", expected);
        }
        for excluded in ["Espresso", "Americano"] {
            assert!(!found.contains(&excluded), "unexpected {}", excluded);
        }
    }

    #[test]
    fn test_filter_is_exact_intersection_in_menu_order() {
        let tags = [CoffeeTag::Sweet, CoffeeTag::Creamy];
        let found = CoffeeToolPlus::new().filter(&tags);
        let expected: Vec<Coffee> = Coffee::all()
            .into_iter()
            .filter(|c| c.tags.iter().any(|t| tags.contains(t)))
            .collect();

        assert_eq!(found, expected);
        assert_eq!(found.len(), 12);
    }

    #[test]
    fn test_no_tags_finds_nothing() {
        assert!(CoffeeToolPlus::new().filter(&[]).is_empty());
    }

    #[test]
    fn test_custom_catalog() {
        let catalog = Arc::new(vec![Coffee::new("House Blend", "Drip.", vec![CoffeeTag::Bitter])]);
        let tool = CoffeeToolPlus::with_catalog(catalog);
        assert_eq!(names(&tool.filter(&[CoffeeTag::Bitter])), vec!["House Blend"]);
    }

    #[tokio::test]
    async fn test_run_decodes_camel_case_tags() {
        let mut args = HashMap::new();
        args.insert("tags".to_string(), json!(["lowAcidity"]));

        let result = CoffeeToolPlus::new().run(&args).await.unwrap();
        let found: Vec<&str> = result
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["name"].as_str())
            .collect();

        assert_eq!(found, vec!["Cold Brew", "Nitro Cold Brew"]);
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_tag() {
        let mut args = HashMap::new();
        args.insert("tags".to_string(), json!(["fruity"]));

        let err = CoffeeToolPlus::new().run(&args).await.unwrap_err();
        assert!(matches!(err, RecommenderError::ArgumentDecodeError { .. }));
    }

    #[test]
    fn test_descriptor_lists_tag_enum() {
        let parameters = CoffeeToolPlus::new().descriptor().function.parameters;
        let allowed = parameters["properties"]["tags"]["items"]["enum"].as_array().unwrap();

        assert_eq!(allowed.len(), 21);
        assert!(allowed.contains(&json!("lowAcidity")));
    }
}
