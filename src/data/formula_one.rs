use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One row of the drivers' championship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FormulaOneDriver {
    #[schemars(description = "The championship position of the driver")]
    pub position: i64,
    #[schemars(description = "The current championship points of the driver, higher is better")]
    pub points: i64,
    pub name: String,
}

impl FormulaOneDriver {
    pub fn new(position: i64, points: i64, name: impl Into<String>) -> Self {
        Self {
            position,
            points,
            name: name.into(),
        }
    }
}
