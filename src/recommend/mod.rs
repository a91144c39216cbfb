//! Per-domain recommendation controllers.
//!
//! Each controller pairs a [`LanguageModelSession`](crate::llm::LanguageModelSession)
//! with fixed instructions, a fixed tool and a fixed target type, and publishes the
//! latest snapshot through a [`Recommender`].

pub mod coffee;
pub mod formula_one;
pub mod landmarks;
pub mod location;
mod recommender;

pub use coffee::{CoffeeIntelligence, CoffeeIntelligencePlus, CoffeeRecommendation, PartialCoffeeRecommendation};
pub use formula_one::{FormulaOneIntelligence, FormulaOneStats, PartialFormulaOneStats};
pub use landmarks::{LandmarkGuide, LandmarkRecommenderPlus, LocationRecommender, PartialLandmarkGuide};
pub use location::{follow_coordinates, follow_descriptions, LocationTrigger};
pub use recommender::{GenerateOutcome, Recommender};
