use crate::config::RecommenderConfig;
use crate::data::FormulaOneDriver;
use crate::error::{RecommenderError, Result};
use crate::llm::gateway::LlmGateway;
use crate::llm::prompt::{Instructions, Prompt};
use crate::llm::schema::Generable;
use crate::llm::session::LanguageModelSession;
use crate::llm::streaming::ErrorPolicy;
use crate::llm::tools::FormulaOneStatsTool;
use crate::providers::RankingProvider;
use crate::recommend::recommender::{GenerateOutcome, Recommender};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const SUMMARY_PROMPT: &str = "Summarize the top three in the championship, make sure to use \
    `formulaonetool` to make a summary. Add detail and commentary if they're likely or not to win.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FormulaOneStats {
    #[schemars(description = "A quick summary of the top three in the championship")]
    pub summary: String,
    #[schemars(
        description = "The top three drivers in the championship, sorted by points from top to bottom"
    )]
    pub drivers: Vec<FormulaOneDriver>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialFormulaOneDriver {
    pub position: Option<i64>,
    pub points: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialFormulaOneStats {
    pub summary: Option<String>,
    pub drivers: Option<Vec<PartialFormulaOneDriver>>,
}

impl Generable for FormulaOneStats {
    type Partial = PartialFormulaOneStats;

    fn validate(&self) -> Result<()> {
        match self.drivers.iter().find(|d| d.position < 1) {
            Some(driver) => Err(RecommenderError::SchemaViolation(format!(
                "driver {} has position {}, positions start at 1",
                driver.name, driver.position
            ))),
            None => Ok(()),
        }
    }
}

/// Summarizes the championship leaders using `formulaonetool`
pub struct FormulaOneIntelligence {
    recommender: Recommender<FormulaOneStats>,
}

impl FormulaOneIntelligence {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        config: &RecommenderConfig,
        provider: Arc<dyn RankingProvider>,
    ) -> Result<Self> {
        let session = LanguageModelSession::builder(gateway)
            .configure(config)
            .instructions(Instructions::new().segment(
                "You will always use `formulaonetool` tool to get the current championship standings.",
            ))
            .tool(Box::new(FormulaOneStatsTool::new(provider)))
            .build()?;

        let recommender = Recommender::new(session, ErrorPolicy::Clear);
        recommender.prewarm();
        Ok(Self { recommender })
    }

    pub async fn generate(&self, cancel: &CancellationToken) -> GenerateOutcome {
        self.recommender.generate(Prompt::new(SUMMARY_PROMPT), cancel).await
    }
}

impl Deref for FormulaOneIntelligence {
    type Target = Recommender<FormulaOneStats>;

    fn deref(&self) -> &Self::Target {
        &self.recommender
    }
}
