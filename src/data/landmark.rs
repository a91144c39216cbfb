use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A place worth visiting, rated from 1 (least) to 5 (most)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Landmark {
    pub name: String,
    pub rating: i64,
}

impl Landmark {
    pub const MIN_RATING: i64 = 1;
    pub const MAX_RATING: i64 = 5;

    pub fn new(name: impl Into<String>, rating: i64) -> Self {
        Self {
            name: name.into(),
            rating,
        }
    }

    pub fn has_valid_rating(&self) -> bool {
        (Self::MIN_RATING..=Self::MAX_RATING).contains(&self.rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Landmark::new("Louvre", 5).has_valid_rating());
        assert!(Landmark::new("Jardin", 1).has_valid_rating());
        assert!(!Landmark::new("Nowhere", 0).has_valid_rating());
        assert!(!Landmark::new("Everywhere", 6).has_valid_rating());
    }
}
