use crate::config::RecommenderConfig;
use crate::data::Coffee;
use crate::error::Result;
use crate::llm::gateway::LlmGateway;
use crate::llm::prompt::{Instructions, Prompt};
use crate::llm::schema::Generable;
use crate::llm::session::LanguageModelSession;
use crate::llm::streaming::ErrorPolicy;
use crate::llm::tools::{CoffeeTool, CoffeeToolPlus, LlmTool};
use crate::recommend::recommender::{GenerateOutcome, Recommender};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CoffeeRecommendation {
    #[schemars(description = "A coffee to recommend")]
    pub name: String,
    #[schemars(description = "The description of the coffee")]
    pub description: String,
    #[schemars(description = "The reason for this recommendation")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialCoffeeRecommendation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub reason: Option<String>,
}

impl Generable for CoffeeRecommendation {
    type Partial = PartialCoffeeRecommendation;
}

const SHOP_INSTRUCTION: &str =
    "Your job is to recommend a coffee for the user, available at the shop Alex's Coffee.";
const QUERY_INSTRUCTION: &str =
    "You must take into account all details of their query, such as milk preference and taste";

fn build_session(
    gateway: Arc<dyn LlmGateway>,
    config: &RecommenderConfig,
    instructions: Instructions,
    tool: Box<dyn LlmTool>,
) -> Result<Recommender<CoffeeRecommendation>> {
    let session = LanguageModelSession::builder(gateway)
        .configure(config)
        .instructions(instructions)
        .tool(tool)
        .build()?;

    let recommender = Recommender::new(session, ErrorPolicy::Clear);
    recommender.prewarm();
    Ok(recommender)
}

/// Recommends a coffee after reading the whole menu through `coffeetool`
pub struct CoffeeIntelligence {
    recommender: Recommender<CoffeeRecommendation>,
}

impl CoffeeIntelligence {
    pub fn new(gateway: Arc<dyn LlmGateway>, config: &RecommenderConfig) -> Result<Self> {
        Self::with_catalog(gateway, config, Arc::new(Coffee::all()))
    }

    pub fn with_catalog(
        gateway: Arc<dyn LlmGateway>,
        config: &RecommenderConfig,
        catalog: Arc<Vec<Coffee>>,
    ) -> Result<Self> {
        let instructions = Instructions::new()
            .segment(SHOP_INSTRUCTION)
            .segment(QUERY_INSTRUCTION)
            .segment(
                "Always use the coffeetool tool to find coffees available at Alex's Coffee, \
                 to recommend based on their query, as these are the ones we actually sell.",
            );
        let recommender = build_session(
            gateway,
            config,
            instructions,
            Box::new(CoffeeTool::with_catalog(catalog)),
        )?;
        Ok(Self { recommender })
    }

    pub fn prompt_for(query: &str) -> Prompt {
        Prompt::new(format!(
            "Use the coffeetool tool to find coffees to recommend based on their query, \
             which is below, as these are the ones we actually sell.\n\n\
             Find a coffee for the user based on their query, which is below.\n{}",
            query
        ))
    }

    pub async fn generate(&self, query: &str, cancel: &CancellationToken) -> GenerateOutcome {
        self.recommender.generate(Self::prompt_for(query), cancel).await
    }
}

impl Deref for CoffeeIntelligence {
    type Target = Recommender<CoffeeRecommendation>;

    fn deref(&self) -> &Self::Target {
        &self.recommender
    }
}

/// Recommends a coffee after searching the menu by tag through `coffeetoolplus`
pub struct CoffeeIntelligencePlus {
    recommender: Recommender<CoffeeRecommendation>,
}

impl CoffeeIntelligencePlus {
    pub fn new(gateway: Arc<dyn LlmGateway>, config: &RecommenderConfig) -> Result<Self> {
        Self::with_catalog(gateway, config, Arc::new(Coffee::all()))
    }

    pub fn with_catalog(
        gateway: Arc<dyn LlmGateway>,
        config: &RecommenderConfig,
        catalog: Arc<Vec<Coffee>>,
    ) -> Result<Self> {
        let instructions = Instructions::new()
            .segment(SHOP_INSTRUCTION)
            .segment(format!("{}, and create `CoffeeTag`s to provide to the tool.", QUERY_INSTRUCTION))
            .segment(
                "Always use the coffeetoolplus tool to find coffees available at Alex's Coffee, \
                 to recommend based on their query, as these are the ones we actually sell.",
            );
        let recommender = build_session(
            gateway,
            config,
            instructions,
            Box::new(CoffeeToolPlus::with_catalog(catalog)),
        )?;
        Ok(Self { recommender })
    }

    pub fn prompt_for(query: &str) -> Prompt {
        Prompt::new(format!(
            "Use the coffeetoolplus tool to find coffees to recommend based on their query, \
             which is below, as these are the ones we actually sell.\n\n\
             Find a coffee for the user based on their query, which is below.\n{}",
            query
        ))
    }

    pub async fn generate(&self, query: &str, cancel: &CancellationToken) -> GenerateOutcome {
        self.recommender.generate(Self::prompt_for(query), cancel).await
    }
}

impl Deref for CoffeeIntelligencePlus {
    type Target = Recommender<CoffeeRecommendation>;

    fn deref(&self) -> &Self::Target {
        &self.recommender
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CoffeeTag;
    use crate::llm::models::MessageRole;
    use crate::testing::{ScriptedGateway, ScriptedTurn};
    use serde_json::json;

    fn mocha() -> serde_json::Value {
        json!({
            "name": "Mocha",
            "description": "Espresso with chocolate and steamed milk",
            "reason": "You asked for something sweet"
        })
    }

    #[test]
    fn test_recommendation_schema_carries_field_guides() {
        let schema = CoffeeRecommendation::schema();

        assert_eq!(
            schema.field("name").unwrap().description.as_deref(),
            Some("A coffee to recommend")
        );
        assert_eq!(
            schema.field("reason").unwrap().description.as_deref(),
            Some("The reason for this recommendation")
        );
        assert!(schema.fields.iter().all(|f| f.required));
    }

    #[test]
    fn test_prompt_embeds_query() {
        let prompt = CoffeeIntelligence::prompt_for("oat milk, not too bitter");
        assert!(prompt.text().starts_with("Use the coffeetool tool"));
        assert!(prompt.text().ends_with("which is below.\noat milk, not too bitter"));
    }

    #[tokio::test]
    async fn test_coffee_intelligence_reads_menu_and_answers_greedily() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().tool_call("coffeetool", json!({"naturalLanguageQuery": "sweet"})),
            ScriptedTurn::json(&mocha(), 4),
        ]));
        let intelligence = CoffeeIntelligence::new(gateway.clone(), &RecommenderConfig::default()).unwrap();

        let outcome = intelligence.generate("something sweet", &CancellationToken::new()).await;

        assert_eq!(outcome, GenerateOutcome::Completed);
        assert_eq!(intelligence.latest_result().unwrap().name.as_deref(), Some("Mocha"));

        let requests = gateway.requests();
        assert_eq!(requests[0].tools, vec!["coffeetool".to_string()]);
        assert_eq!(requests[0].schema, "CoffeeRecommendation");
        assert_eq!(requests[0].config.temperature, 0.0);
        assert_eq!(requests[0].messages[0].role, MessageRole::System);
        assert!(requests[0].messages[0]
            .content
            .as_deref()
            .unwrap()
            .contains("Alex's Coffee"));

        let prompt = requests[0].messages[1].content.as_deref().unwrap();
        assert!(!prompt.contains("Respond with a JSON object"));

        let tool_message = requests[1].messages.last().unwrap();
        assert_eq!(tool_message.role, MessageRole::Tool);
        assert!(tool_message.content.as_deref().unwrap().contains("Red Eye"));
    }

    #[tokio::test]
    async fn test_coffee_intelligence_plus_filters_by_tags() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().tool_call("coffeetoolplus", json!({"tags": ["boozy"]})),
            ScriptedTurn::json(&mocha(), 2),
        ]));
        let intelligence =
            CoffeeIntelligencePlus::new(gateway.clone(), &RecommenderConfig::default()).unwrap();

        intelligence.generate("a grown-up coffee", &CancellationToken::new()).await;

        let requests = gateway.requests();
        assert_eq!(requests[0].tools, vec!["coffeetoolplus".to_string()]);
        let tool_output = requests[1].messages.last().unwrap().content.clone().unwrap();
        let coffees: Vec<Coffee> = serde_json::from_str(&tool_output).unwrap();
        assert_eq!(coffees.len(), 1);
        assert_eq!(coffees[0].name, "Irish Coffee");
        assert!(coffees[0].tags.contains(&CoffeeTag::Boozy));
    }

    #[tokio::test]
    async fn test_incomplete_answer_clears_result() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ScriptedTurn::new().content(r#"{"name": "Mocha"}"#),
        ]));
        let intelligence = CoffeeIntelligence::new(gateway, &RecommenderConfig::default()).unwrap();

        let outcome = intelligence.generate("sweet", &CancellationToken::new()).await;

        assert!(matches!(outcome, GenerateOutcome::Failed(_)));
        assert!(intelligence.latest_result().is_none());
        assert!(intelligence.last_error().unwrap().contains("Schema violation"));
        assert!(!intelligence.is_loading());
    }
}
