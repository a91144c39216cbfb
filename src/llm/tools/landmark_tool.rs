use crate::data::Landmark;
use crate::error::Result;
use crate::llm::tools::TypedTool;
use crate::providers::{Coordinate, PlaceSearchProvider, PlaceSearchRequest, PointOfInterestCategory};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_RADIUS_METERS: f64 = 1_500.0;
pub const DEFAULT_QUERY: &str = "landmarks";
pub const MAX_LANDMARKS: usize = 5;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LandmarkToolArguments {
    #[schemars(description = "Latitude of the user's current location")]
    pub latitude: f64,
    #[schemars(description = "Longitude of the user's current location")]
    pub longitude: f64,
    #[serde(rename = "radiusMeters", default)]
    #[schemars(
        description = "Search radius in meters around the coordinate. Defaults to 1500 meters if omitted."
    )]
    pub radius_meters: Option<f64>,
    #[serde(default)]
    #[schemars(
        description = "Optional search query to bias results (for example 'landmarks' or 'museums')."
    )]
    pub query: Option<String>,
}

/// Rate place names by search rank: the first result gets 5, the fifth and later get 1.
///
/// Names are trimmed and blank names skipped, but a skipped name still uses up
/// its rank. At most [`MAX_LANDMARKS`] landmarks are returned.
pub fn rank_landmarks(names: &[String]) -> Vec<Landmark> {
    names
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let rating = (Landmark::MAX_RATING - index as i64).clamp(Landmark::MIN_RATING, Landmark::MAX_RATING);
            Some(Landmark::new(name, rating))
        })
        .take(MAX_LANDMARKS)
        .collect()
}

/// Finds notable points of interest around a coordinate
#[derive(Clone)]
pub struct LandmarkTool {
    search: Arc<dyn PlaceSearchProvider>,
}

impl LandmarkTool {
    pub fn new(search: Arc<dyn PlaceSearchProvider>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl TypedTool for LandmarkTool {
    const NAME: &'static str = "landmarktool";
    const DESCRIPTION: &'static str =
        "Finds notable points of interest near given coordinates and returns a landmark guide.";

    type Arguments = LandmarkToolArguments;
    type Output = Vec<Landmark>;

    async fn call(&self, arguments: LandmarkToolArguments) -> Result<Vec<Landmark>> {
        let query = arguments
            .query
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string());
        let request = PlaceSearchRequest {
            center: Coordinate::new(arguments.latitude, arguments.longitude),
            radius_meters: arguments.radius_meters.unwrap_or(DEFAULT_RADIUS_METERS),
            query,
            categories: PointOfInterestCategory::SIGHTSEEING.to_vec(),
        };
        debug!(
            "Searching {} within {}m of {:?}",
            request.query, request.radius_meters, request.center
        );

        let names = self.search.search(&request).await?;
        Ok(rank_landmarks(&names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tools::LlmTool;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    fn ratings(landmarks: &[Landmark]) -> Vec<i64> {
        landmarks.iter().map(|l| l.rating).collect()
    }

    #[test]
    fn test_five_results_rated_five_to_one() {
        let landmarks = rank_landmarks(&names(&["A", "B", "C", "D", "E"]));
        assert_eq!(ratings(&landmarks), vec![5, 4, 3, 2, 1]);
        assert_eq!(landmarks[0].name, "A");
    }

    #[test]
    fn test_seven_results_keep_top_five() {
        let landmarks = rank_landmarks(&names(&["A", "B", "C", "D", "E", "F", "G"]));
        assert_eq!(ratings(&landmarks), vec![5, 4, 3, 2, 1]);
        assert_eq!(landmarks.last().unwrap().name, "E");
    }

    #[test]
    fn test_blank_names_are_skipped_but_keep_their_rank() {
        let landmarks = rank_landmarks(&names(&["  Louvre ", "", "Orsay", "   ", "Tuileries", "Opéra", "Panthéon"]));

        assert_eq!(
            landmarks.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
            vec!["Louvre", "Orsay", "Tuileries", "Opéra", "Panthéon"]
        );
        assert_eq!(ratings(&landmarks), vec![5, 3, 1, 1, 1]);
    }

    #[test]
    fn test_no_results() {
        assert!(rank_landmarks(&[]).is_empty());
    }

    struct RecordingSearch {
        results: Vec<String>,
        requests: Mutex<Vec<PlaceSearchRequest>>,
    }

    #[async_trait]
    impl PlaceSearchProvider for RecordingSearch {
        async fn search(&self, request: &PlaceSearchRequest) -> Result<Vec<String>> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.results.clone())
        }
    }

    #[tokio::test]
    async fn test_defaults_radius_and_query() {
        let search = Arc::new(RecordingSearch {
            results: names(&["Louvre", "Orsay"]),
            requests: Mutex::new(Vec::new()),
        });
        let tool = LandmarkTool::new(search.clone());

        let mut args = HashMap::new();
        args.insert("latitude".to_string(), json!(48.8606));
        args.insert("longitude".to_string(), json!(2.3376));
        args.insert("query".to_string(), json!(""));

        let result = tool.run(&args).await.unwrap();
        assert_eq!(result, json!([{"name": "Louvre", "rating": 5}, {"name": "Orsay", "rating": 4}]));

        let request = search.requests.lock().unwrap()[0].clone();
        assert_eq!(request.radius_meters, DEFAULT_RADIUS_METERS);
        assert_eq!(request.query, "landmarks");
        assert_eq!(request.categories.len(), 6);
        assert_eq!(request.center, Coordinate::new(48.8606, 2.3376));
    }

    #[tokio::test]
    async fn test_explicit_radius_and_query() {
        let search = Arc::new(RecordingSearch {
            results: Vec::new(),
            requests: Mutex::new(Vec::new()),
        });
        let tool = LandmarkTool::new(search.clone());

        let mut args = HashMap::new();
        args.insert("latitude".to_string(), json!(1.0));
        args.insert("longitude".to_string(), json!(2.0));
        args.insert("radiusMeters".to_string(), json!(500.0));
        args.insert("query".to_string(), json!("museums"));

        tool.run(&args).await.unwrap();

        let request = search.requests.lock().unwrap()[0].clone();
        assert_eq!(request.radius_meters, 500.0);
        assert_eq!(request.query, "museums");
    }

    #[test]
    fn test_descriptor_requires_only_coordinates() {
        let parameters = LandmarkTool::new(Arc::new(RecordingSearch {
            results: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }))
        .descriptor()
        .function
        .parameters;

        assert_eq!(parameters["required"], json!(["latitude", "longitude"]));
        assert!(parameters["properties"].get("radiusMeters").is_some());
    }
}
