use crate::data::FormulaOneDriver;
use crate::error::{RecommenderError, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const ERGAST_BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";
const TIMEOUT_SECONDS: u64 = 10;

/// Source of championship standings, best first
#[async_trait]
pub trait RankingProvider: Send + Sync {
    async fn fetch_drivers(&self, limit: usize) -> Result<Vec<FormulaOneDriver>>;
}

/// A fixed roster, returned in the order given
#[derive(Debug, Clone, Default)]
pub struct StaticRankingProvider {
    drivers: Vec<FormulaOneDriver>,
}

impl StaticRankingProvider {
    pub fn new(drivers: Vec<FormulaOneDriver>) -> Self {
        Self { drivers }
    }
}

#[async_trait]
impl RankingProvider for StaticRankingProvider {
    async fn fetch_drivers(&self, limit: usize) -> Result<Vec<FormulaOneDriver>> {
        Ok(self.drivers.iter().take(limit).cloned().collect())
    }
}

/// Current driver standings from an Ergast-compatible API
#[derive(Clone)]
pub struct ErgastRankingProvider {
    client: reqwest::Client,
    base_url: String,
}

impl ErgastRankingProvider {
    pub fn new() -> Self {
        Self::with_base_url(ERGAST_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECONDS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn parse_standings(body: &Value) -> Result<Vec<FormulaOneDriver>> {
        let standings = body["MRData"]["StandingsTable"]["StandingsLists"][0]["DriverStandings"]
            .as_array()
            .ok_or_else(|| {
                RecommenderError::ToolError("standings response has no driver list".to_string())
            })?;

        standings
            .iter()
            .map(|entry| {
                let position = number(&entry["position"]).ok_or_else(|| {
                    RecommenderError::ToolError("standing without a position".to_string())
                })?;
                let points = number(&entry["points"]).unwrap_or(0);
                let driver = &entry["Driver"];
                let name = format!(
                    "{} {}",
                    driver["givenName"].as_str().unwrap_or_default(),
                    driver["familyName"].as_str().unwrap_or_default()
                );

                Ok(FormulaOneDriver::new(position, points, name.trim()))
            })
            .collect()
    }
}

impl Default for ErgastRankingProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Ergast sends numbers as strings, and points may be fractional
fn number(value: &Value) -> Option<i64> {
    match value {
        Value::String(raw) => raw.parse::<f64>().ok().map(|n| n.round() as i64),
        Value::Number(n) => n.as_f64().map(|n| n.round() as i64),
        _ => None,
    }
}

#[async_trait]
impl RankingProvider for ErgastRankingProvider {
    async fn fetch_drivers(&self, limit: usize) -> Result<Vec<FormulaOneDriver>> {
        let url = format!("{}/current/driverStandings.json", self.base_url);
        debug!("Fetching driver standings from {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(RecommenderError::ToolError(format!(
                "standings request failed with status {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let mut drivers = Self::parse_standings(&body)?;
        drivers.truncate(limit);
        Ok(drivers)
    }
}
