use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A point on Earth in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointOfInterestCategory {
    Museum,
    Park,
    Theater,
    Stadium,
    University,
    Landmark,
}

impl PointOfInterestCategory {
    /// Categories searched for sightseeing
    pub const SIGHTSEEING: [PointOfInterestCategory; 6] = [
        PointOfInterestCategory::Museum,
        PointOfInterestCategory::Park,
        PointOfInterestCategory::Theater,
        PointOfInterestCategory::Stadium,
        PointOfInterestCategory::University,
        PointOfInterestCategory::Landmark,
    ];
}

/// A radius-bounded search around a coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSearchRequest {
    pub center: Coordinate,
    pub radius_meters: f64,
    pub query: String,
    pub categories: Vec<PointOfInterestCategory>,
}

/// Map search returning place names ranked best first.
///
/// Names are passed through as the provider reports them, blanks included.
#[async_trait]
pub trait PlaceSearchProvider: Send + Sync {
    async fn search(&self, request: &PlaceSearchRequest) -> Result<Vec<String>>;
}

/// An in-memory gazetteer of named places
#[derive(Debug, Clone, Default)]
pub struct StaticPlaceSearch {
    places: Vec<(String, Coordinate, PointOfInterestCategory)>,
}

impl StaticPlaceSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(
        mut self,
        name: impl Into<String>,
        location: Coordinate,
        category: PointOfInterestCategory,
    ) -> Self {
        self.places.push((name.into(), location, category));
        self
    }
}

#[async_trait]
impl PlaceSearchProvider for StaticPlaceSearch {
    /// Places inside the radius with a requested category, nearest first.
    /// The query text is not used.
    async fn search(&self, request: &PlaceSearchRequest) -> Result<Vec<String>> {
        let mut hits: Vec<(f64, &str)> = self
            .places
            .iter()
            .filter(|(_, _, category)| request.categories.contains(category))
            .map(|(name, location, _)| (request.center.distance_to(location), name.as_str()))
            .filter(|(distance, _)| *distance <= request.radius_meters)
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(hits.into_iter().map(|(_, name)| name.to_string()).collect())
    }
}
