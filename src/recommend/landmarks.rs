use crate::config::RecommenderConfig;
use crate::data::Landmark;
use crate::error::{RecommenderError, Result};
use crate::llm::gateway::LlmGateway;
use crate::llm::prompt::{Instructions, Prompt};
use crate::llm::schema::Generable;
use crate::llm::session::LanguageModelSession;
use crate::llm::streaming::ErrorPolicy;
use crate::llm::tools::landmark_tool::DEFAULT_RADIUS_METERS;
use crate::llm::tools::LandmarkTool;
use crate::providers::{Coordinate, PlaceSearchProvider};
use crate::recommend::recommender::{GenerateOutcome, Recommender};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const MISSING_DESCRIPTION: &str = "We need a location description to look up landmarks.";

/// Where to go first, and a short list of rated landmarks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LandmarkGuide {
    #[schemars(description = "A hint for what the user should visit first and why")]
    pub hint: String,
    pub landmarks: Vec<Landmark>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialLandmark {
    pub name: Option<String>,
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialLandmarkGuide {
    pub hint: Option<String>,
    pub landmarks: Option<Vec<PartialLandmark>>,
}

impl Generable for LandmarkGuide {
    type Partial = PartialLandmarkGuide;

    fn validate(&self) -> Result<()> {
        match self.landmarks.iter().find(|l| !l.has_valid_rating()) {
            Some(landmark) => Err(RecommenderError::SchemaViolation(format!(
                "landmark {} is rated {}, ratings run from {} to {}",
                landmark.name,
                landmark.rating,
                Landmark::MIN_RATING,
                Landmark::MAX_RATING
            ))),
            None => Ok(()),
        }
    }
}

/// Plans up to five landmarks for a place the user describes in words
pub struct LocationRecommender {
    recommender: Recommender<LandmarkGuide>,
}

impl LocationRecommender {
    pub fn new(gateway: Arc<dyn LlmGateway>, config: &RecommenderConfig) -> Result<Self> {
        let session = LanguageModelSession::builder(gateway)
            .configure(config)
            .instructions(Instructions::new().segment(
                "You are a travel assistant who creates landmark guides for travel. \
                 You will provide up to five recommendations.",
            ))
            .build()?;

        let recommender = Recommender::new(session, ErrorPolicy::Clear);
        recommender.prewarm();
        Ok(Self { recommender })
    }

    /// A blank description fails straight away without reaching the engine.
    pub async fn generate(&self, description: &str, cancel: &CancellationToken) -> GenerateOutcome {
        if self.recommender.is_loading() {
            return GenerateOutcome::Skipped;
        }

        let place = description.trim();
        if place.is_empty() {
            info!("Ignoring blank location description");
            self.recommender.reject(MISSING_DESCRIPTION);
            return GenerateOutcome::Failed(MISSING_DESCRIPTION.to_string());
        }

        let prompt = Prompt::new(format!(
            "The user is planning a trip to {}. Provide up to five recommendations.",
            place
        ));
        self.recommender.generate(prompt, cancel).await
    }
}

impl Deref for LocationRecommender {
    type Target = Recommender<LandmarkGuide>;

    fn deref(&self) -> &Self::Target {
        &self.recommender
    }
}

/// Builds a guide around the user's coordinates from `landmarktool` results.
///
/// Keeps the last snapshot visible when a generation fails.
pub struct LandmarkRecommenderPlus {
    recommender: Recommender<LandmarkGuide>,
}

impl LandmarkRecommenderPlus {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        config: &RecommenderConfig,
        search: Arc<dyn PlaceSearchProvider>,
    ) -> Result<Self> {
        let session = LanguageModelSession::builder(gateway)
            .configure(config)
            .instructions(
                Instructions::new()
                    .segment(
                        "You are a travel guide that must use the landmarktool to plan visits \
                         around the user's current coordinates.",
                    )
                    .segment(
                        "Always call landmarktool with the latitude and longitude you are given \
                         and copy its landmarks into the response.",
                    )
                    .segment("Once you have the tool data, craft an energetic hint tailored to the place."),
            )
            .tool(Box::new(LandmarkTool::new(search)))
            .build()?;

        let recommender = Recommender::new(session, ErrorPolicy::PreserveLast);
        recommender.prewarm();
        Ok(Self { recommender })
    }

    pub fn prompt_for(coordinate: Coordinate, radius_meters: Option<f64>) -> Prompt {
        Prompt::new(format!(
            "The user is at latitude {} and longitude {}.\n\
             Use landmarktool to fetch nearby points of interest within {} meters.\n\
             Return a friendly hint and the tool-provided landmarks.",
            coordinate.latitude,
            coordinate.longitude,
            radius_meters.unwrap_or(DEFAULT_RADIUS_METERS)
        ))
    }

    pub async fn generate(
        &self,
        coordinate: Coordinate,
        radius_meters: Option<f64>,
        cancel: &CancellationToken,
    ) -> GenerateOutcome {
        self.recommender
            .generate(Self::prompt_for(coordinate, radius_meters), cancel)
            .await
    }
}

impl Deref for LandmarkRecommenderPlus {
    type Target = Recommender<LandmarkGuide>;

    fn deref(&self) -> &Self::Target {
        &self.recommender
    }
}
