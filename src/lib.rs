//! Evolve BF - Genetic search for tape-language programs.
//!
//! Given parallel lists of inputs and expected outputs, this crate breeds
//! programs in a minimal 8-symbol tape language until one maps every input
//! to its target exactly.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Programs, run configuration and report types
//! - `compute`: Interpreter, cost evaluation and evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use evolve_bf::{RunConfig, evolve};
//!
//! let config = RunConfig::default();
//! let report = evolve(&["Hello, world!"], &["Hello, world!"], &config)?;
//!
//! println!("{report}");
//! # Ok::<(), evolve_bf::EvolveError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, EvolveError, Supervisor, evolve, supervised_evolve};
pub use compute::{Cost, InterpretError, evaluate, score};
pub use schema::{
    CostOptions, EvolveOptions, MutateOptions, PenaltyTable, Program, ProgramReport, RunConfig,
    SupervisedReport,
};
