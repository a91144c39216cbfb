//! Plain value records exchanged with tools and returned by the model.

pub mod coffee;
pub mod formula_one;
pub mod landmark;

pub use coffee::{Coffee, CoffeeTag};
pub use formula_one::FormulaOneDriver;
pub use landmark::Landmark;
