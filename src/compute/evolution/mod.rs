//! Evolutionary search for tape-language programs.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): Random generation, mutation, and crossover
//! - **Search** (`search`): The generational loop and its phase functions
//! - **Supervisor** (`supervisor`): Restarts searches that run out of generations
//!
//! # Example
//!
//! ```rust,no_run
//! use evolve_bf::schema::RunConfig;
//! use evolve_bf::compute::evolution::supervised_evolve;
//!
//! let config = RunConfig::default();
//! let outcome = supervised_evolve(&["1", "2"], &["one", "two"], &config, 5)?;
//!
//! println!("{}", outcome.report);
//! # Ok::<(), evolve_bf::compute::evolution::EvolveError>(())
//! ```

mod genome;
mod search;
mod supervisor;

pub use genome::{MutationKind, ProgramRng};
pub use search::{
    EvolutionEngine, EvolveError, Evaluation, ScoredProgram, StagnationTracker, cull,
    effective_cost_options, evaluate_population, evolve, mutate_all, recombine,
    replace_invalids, truncate,
};
pub use supervisor::{Supervisor, supervised_evolve};
