//! Run configuration for an evolutionary search.
//!
//! Options are grouped the way the search consumes them: [`CostOptions`] for
//! the cost evaluator, [`EvolveOptions`] for the generational loop and
//! [`MutateOptions`] for the mutation operator. All groups are plain data,
//! serde round-trippable, and checked by [`RunConfig::validate`].

use serde::{Deserialize, Serialize};

/// Top-level configuration for one evolutionary search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Cost evaluator settings.
    #[serde(default)]
    pub cost: CostOptions,
    /// Generational loop settings.
    #[serde(default)]
    pub evolve: EvolveOptions,
    /// Mutation operator settings.
    #[serde(default)]
    pub mutate: MutateOptions,
    /// Master random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// How program output is compared against the target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CostPolicy {
    /// Per-character code point distance; fine-grained.
    #[default]
    CharacterDistance,
    /// Fixed costs per failure bucket; coarse but cheap.
    Bucketed,
}

/// What a timed-out pair does to the candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Charge the pair as empty output plus `PenaltyTable::timeout` and continue.
    #[default]
    Penalize,
    /// Treat the whole program as invalid, like a syntax error.
    Disqualify,
}

/// Weight of each failure category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PenaltyTable {
    /// Pair exceeded its execution budget.
    #[serde(default = "default_timeout_penalty")]
    pub timeout: u64,
    /// Program produced nothing (bucketed policy).
    #[serde(default = "default_no_output_penalty")]
    pub no_output: u64,
    /// Output character outside ASCII letters and digits.
    #[serde(default = "default_non_ascii_penalty")]
    pub non_ascii: u64,
    /// Per character the output falls short of the target (bucketed policy).
    #[serde(default = "default_too_short_penalty")]
    pub too_short: u64,
    /// Per character the output overruns the target (bucketed policy).
    #[serde(default = "default_too_long_penalty")]
    pub too_long: u64,
    /// Per unit of code point distance (character distance policy).
    #[serde(default = "default_wrong_char_penalty")]
    pub wrong_char: u64,
    /// Per extra character when the target is a substring of the output.
    #[serde(default = "default_extra_char_penalty")]
    pub extra_char: u64,
    /// Per missing character when the output is a substring of the target.
    #[serde(default = "default_missing_char_penalty")]
    pub missing_char: u64,
    /// Per output character not present in the target.
    #[serde(default = "default_non_intersection_penalty")]
    pub non_intersection: u64,
    /// Flat cost of any mismatch.
    #[serde(default = "default_not_equal_penalty")]
    pub not_equal: u64,
}

impl Default for PenaltyTable {
    fn default() -> Self {
        Self {
            timeout: default_timeout_penalty(),
            no_output: default_no_output_penalty(),
            non_ascii: default_non_ascii_penalty(),
            too_short: default_too_short_penalty(),
            too_long: default_too_long_penalty(),
            wrong_char: default_wrong_char_penalty(),
            extra_char: default_extra_char_penalty(),
            missing_char: default_missing_char_penalty(),
            non_intersection: default_non_intersection_penalty(),
            not_equal: default_not_equal_penalty(),
        }
    }
}

fn default_timeout_penalty() -> u64 {
    50
}
fn default_no_output_penalty() -> u64 {
    25
}
fn default_non_ascii_penalty() -> u64 {
    1
}
fn default_too_short_penalty() -> u64 {
    5
}
fn default_too_long_penalty() -> u64 {
    1
}
fn default_wrong_char_penalty() -> u64 {
    1
}
fn default_extra_char_penalty() -> u64 {
    3
}
fn default_missing_char_penalty() -> u64 {
    2
}
fn default_non_intersection_penalty() -> u64 {
    1
}
fn default_not_equal_penalty() -> u64 {
    1
}

/// Cost evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CostOptions {
    /// Wall-clock budget per (input, target) pair, in milliseconds.
    #[serde(default = "default_cost_timeout")]
    pub program_timeout_ms: u64,
    /// Failure weights.
    #[serde(default)]
    pub penalties: PenaltyTable,
    /// Charge `non_ascii` for output characters outside ASCII letters and digits.
    #[serde(default = "default_ascii_only")]
    pub ascii_only: bool,
    /// Add measured runtime (ms) to imperfect costs as a tie-break.
    #[serde(default)]
    pub time_cost: bool,
    /// Output comparison policy.
    #[serde(default)]
    pub policy: CostPolicy,
    /// Timeout handling policy.
    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
}

impl Default for CostOptions {
    fn default() -> Self {
        Self {
            program_timeout_ms: default_cost_timeout(),
            penalties: PenaltyTable::default(),
            ascii_only: default_ascii_only(),
            time_cost: false,
            policy: CostPolicy::default(),
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

fn default_cost_timeout() -> u64 {
    10
}
fn default_ascii_only() -> bool {
    true
}

/// Generational loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvolveOptions {
    /// Fraction of the sorted population kept each generation.
    /// 0.5 keeps the population flat; lower grows it, higher shrinks it.
    #[serde(default = "default_cull_ratio")]
    pub cull_ratio: f64,
    /// Target population size after truncation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Length of programs in the starting population.
    #[serde(default = "default_initial_program_size")]
    pub initial_program_size: usize,
    /// Budget for running candidates outside of scoring (reports, progress), ms.
    #[serde(default = "default_program_timeout")]
    pub program_timeout_ms: u64,
    /// Give up after this many generations.
    #[serde(default = "default_generation_limit")]
    pub generation_limit: Option<usize>,
    /// Flat generations before runtime joins the cost as a tie-break.
    #[serde(default = "default_stagnation_generations")]
    pub stagnation_generations: usize,
    /// Log every generation at `info` rather than `debug`.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for EvolveOptions {
    fn default() -> Self {
        Self {
            cull_ratio: default_cull_ratio(),
            population_size: default_population_size(),
            initial_program_size: default_initial_program_size(),
            program_timeout_ms: default_program_timeout(),
            generation_limit: default_generation_limit(),
            stagnation_generations: default_stagnation_generations(),
            verbose: false,
        }
    }
}

fn default_cull_ratio() -> f64 {
    0.5
}
fn default_population_size() -> usize {
    1000
}
fn default_initial_program_size() -> usize {
    8
}
fn default_program_timeout() -> u64 {
    20
}
fn default_generation_limit() -> Option<usize> {
    Some(10_000)
}
fn default_stagnation_generations() -> usize {
    10
}

/// Mutation operator settings.
///
/// The four likelihoods are relative weights, not probabilities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutateOptions {
    /// Weight of replacing one symbol in place.
    #[serde(default = "default_inplace_weight")]
    pub likelihood_of_inplace: u32,
    /// Weight of inserting one symbol.
    #[serde(default = "default_addition_weight")]
    pub likelihood_of_addition: u32,
    /// Weight of deleting one symbol (or one bracket pair).
    #[serde(default = "default_deletion_weight")]
    pub likelihood_of_deletion: u32,
    /// Weight of copying the program unchanged.
    #[serde(default = "default_none_weight")]
    pub likelihood_of_none: u32,
    /// Probability (0.0-1.0) that an insertion or substitution writes a
    /// whole loop instead of a single symbol.
    #[serde(default = "default_loop_probability")]
    pub loop_probability: f64,
}

impl Default for MutateOptions {
    fn default() -> Self {
        Self {
            likelihood_of_inplace: default_inplace_weight(),
            likelihood_of_addition: default_addition_weight(),
            likelihood_of_deletion: default_deletion_weight(),
            likelihood_of_none: default_none_weight(),
            loop_probability: default_loop_probability(),
        }
    }
}

fn default_inplace_weight() -> u32 {
    100
}
fn default_addition_weight() -> u32 {
    30
}
fn default_deletion_weight() -> u32 {
    40
}
fn default_none_weight() -> u32 {
    1
}
fn default_loop_probability() -> f64 {
    0.2
}

// ============================================================================
// Validation
// ============================================================================

/// Run configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Cull ratio must be in (0, 1], got {0}")]
    InvalidCullRatio(f64),
    #[error("Loop probability must be in [0, 1], got {0}")]
    InvalidLoopProbability(f64),
    #[error("At least one mutation likelihood must be positive")]
    NoMutationWeights,
    #[error("Program timeout must be positive")]
    InvalidTimeout,
    #[error("Failed to parse run configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl RunConfig {
    /// Validate all option groups.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.evolve.population_size < 2 {
            return Err(OptionsError::PopulationTooSmall);
        }

        let ratio = self.evolve.cull_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(OptionsError::InvalidCullRatio(ratio));
        }

        let p = self.mutate.loop_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(OptionsError::InvalidLoopProbability(p));
        }

        let m = &self.mutate;
        if m.likelihood_of_inplace == 0
            && m.likelihood_of_addition == 0
            && m.likelihood_of_deletion == 0
            && m.likelihood_of_none == 0
        {
            return Err(OptionsError::NoMutationWeights);
        }

        if self.cost.program_timeout_ms == 0 || self.evolve.program_timeout_ms == 0 {
            return Err(OptionsError::InvalidTimeout);
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
