//! Schema module - Programs, run configuration and report types.

mod options;
mod program;
mod report;

pub use options::*;
pub use program::*;
pub use report::*;
