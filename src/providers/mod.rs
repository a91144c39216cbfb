//! External collaborators that tools read from.

pub mod places;
pub mod ranking;

pub use places::{Coordinate, PlaceSearchProvider, PlaceSearchRequest, PointOfInterestCategory, StaticPlaceSearch};
pub use ranking::{ErgastRankingProvider, RankingProvider, StaticRankingProvider};
