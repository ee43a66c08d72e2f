//! Compute module - Interpreter, cost evaluation and evolutionary search.

mod cost;
mod interpreter;

pub mod evolution;

pub use cost::*;
pub use interpreter::*;
