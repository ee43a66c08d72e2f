//! Progress and result types produced by a search.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Program;

/// One input and the output a program produced for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SamplePair {
    pub input: String,
    /// Live output, or the interpreter error rendered as text.
    pub output: String,
}

/// Report for a program that matched every example.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramReport {
    /// The winning program.
    pub program: Program,
    /// Its cost; always 0 for a winner.
    pub cost: u64,
    /// Generation index at which it was found.
    pub generation: usize,
    /// The program's output for every example input.
    pub samples: Vec<SamplePair>,
}

impl fmt::Display for ProgramReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Generation {}:", self.generation)?;
        writeln!(f, "\t{}", self.program)?;
        write!(f, "giving:")?;
        for sample in &self.samples {
            write!(f, "\n{}:{}", sample.input, sample.output)?;
        }
        Ok(())
    }
}

/// Report from the supervised runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupervisedReport {
    /// Number of runs started, including the successful one.
    pub attempts: usize,
    /// The successful run's report.
    pub report: ProgramReport,
}

/// Current phase of the generational loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    /// Generating the starting population.
    #[default]
    Initializing,
    /// Scoring candidates.
    Evaluating,
    /// A zero-cost program was found.
    Complete,
    /// Generation limit reached or cancelled.
    Stopped,
}

/// Progress update emitted once per generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current generation number.
    pub generation: usize,
    /// Generation limit, if any.
    pub generation_limit: Option<usize>,
    /// Candidates scored this generation.
    pub population_size: usize,
    /// Candidates disqualified this generation.
    pub invalid_count: usize,
    /// Best cost this generation, if any candidate was valid.
    pub best_cost: Option<u64>,
    /// Best program this generation.
    pub best_program: Option<Program>,
    /// Lowest cost this generation without runtime.
    pub best_base_cost: Option<u64>,
    /// Whether this generation's costs included runtime.
    pub time_cost: bool,
    /// Consecutive generations without a change in best cost.
    pub flat_generations: usize,
    /// Whether runtime is currently part of the cost.
    pub stagnant: bool,
    /// Current phase.
    pub phase: EvolutionPhase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = ProgramReport {
            program: Program::parse(",[.,]"),
            cost: 0,
            generation: 12,
            samples: vec![
                SamplePair {
                    input: "ab".to_string(),
                    output: "ab".to_string(),
                },
                SamplePair {
                    input: "c".to_string(),
                    output: "c".to_string(),
                },
            ],
        };

        assert_eq!(
            report.to_string(),
            "Generation 12:\n\t,[.,]\ngiving:\nab:ab\nc:c"
        );
    }
}
