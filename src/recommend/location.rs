//! Re-running landmark generation as the user's location changes.
//!
//! Location updates arrive already debounced on a `tokio::sync::watch` channel. A
//! [`LocationTrigger`] decides which of them are worth a new generation, and never
//! fires while one is already loading.

use crate::providers::Coordinate;
use crate::recommend::landmarks::{LandmarkRecommenderPlus, LocationRecommender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Moves shorter than this do not trigger a new guide
pub const RETRIGGER_DISTANCE_METERS: f64 = 25.0;

/// Remembers the last location a generation was started for
#[derive(Debug, Clone, Default)]
pub struct LocationTrigger {
    last_coordinate: Option<Coordinate>,
    last_description: Option<String>,
}

impl LocationTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True on the first coordinate and whenever the user moved far enough since
    /// the last triggered one. Records `coordinate` when it returns true.
    pub fn should_trigger_for_coordinate(&mut self, coordinate: Coordinate, is_loading: bool) -> bool {
        if is_loading {
            return false;
        }

        let moved = match self.last_coordinate {
            None => true,
            Some(last) => last.distance_to(&coordinate) > RETRIGGER_DISTANCE_METERS,
        };
        if moved {
            self.last_coordinate = Some(coordinate);
        }
        moved
    }

    /// True when the trimmed description is non-blank and differs from the last
    /// triggered one
    pub fn should_trigger_for_description(&mut self, description: &str, is_loading: bool) -> bool {
        if is_loading {
            return false;
        }

        let description = description.trim();
        if description.is_empty() || self.last_description.as_deref() == Some(description) {
            return false;
        }
        self.last_description = Some(description.to_string());
        true
    }

    pub fn reset(&mut self) {
        self.last_coordinate = None;
        self.last_description = None;
    }
}

/// Generate a guide for every material coordinate change until `cancel` fires or
/// the sender is dropped.
pub async fn follow_coordinates(
    recommender: &LandmarkRecommenderPlus,
    mut updates: watch::Receiver<Option<Coordinate>>,
    radius_meters: Option<f64>,
    cancel: &CancellationToken,
) {
    let mut trigger = LocationTrigger::new();

    loop {
        let current = *updates.borrow_and_update();
        if let Some(coordinate) = current {
            if trigger.should_trigger_for_coordinate(coordinate, recommender.is_loading()) {
                debug!("Location changed to {:?}, regenerating guide", coordinate);
                recommender.generate(coordinate, radius_meters, cancel).await;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

/// Generate a guide for every new non-blank description until `cancel` fires or
/// the sender is dropped.
pub async fn follow_descriptions(
    recommender: &LocationRecommender,
    mut updates: watch::Receiver<String>,
    cancel: &CancellationToken,
) {
    let mut trigger = LocationTrigger::new();

    loop {
        let current = updates.borrow_and_update().clone();
        if trigger.should_trigger_for_description(&current, recommender.is_loading()) {
            debug!("Location description changed to {:?}, regenerating guide", current.trim());
            recommender.generate(&current, cancel).await;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
