pub mod coffee_tool;
pub mod coffee_tool_plus;
pub mod formula_one_tool;
pub mod landmark_tool;
mod registry;
mod tool;

pub use coffee_tool::CoffeeTool;
pub use coffee_tool_plus::CoffeeToolPlus;
pub use formula_one_tool::FormulaOneStatsTool;
pub use landmark_tool::{rank_landmarks, LandmarkTool};
pub use registry::{ToolOutput, ToolRegistry};
pub use tool::{FunctionDescriptor, LlmTool, ToolDescriptor, TypedTool};
