//! Generational search for a program that maps every input to its target.
//!
//! Each generation runs the same pipeline over an owned population value:
//! evaluate, check for a winner, track stagnation, cull, replace invalid
//! programs, mutate, recombine and truncate. Every phase is a function that
//! takes the previous population by value and returns the next one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::Level;
use rayon::prelude::*;

use crate::compute::cost::{Cost, score_timed, with_runtime};
use crate::compute::interpreter::evaluate;
use crate::schema::{
    CostOptions, EvolutionPhase, EvolutionProgress, MutateOptions, OptionsError, Program,
    ProgramReport, RunConfig, SamplePair,
};

use super::genome::ProgramRng;

/// Errors that end a search without a winner.
#[derive(Debug, thiserror::Error)]
pub enum EvolveError {
    #[error("Invalid run configuration: {0}")]
    InvalidOptions(#[from] OptionsError),
    #[error("Got {inputs} inputs but {targets} targets")]
    MismatchedExamples { inputs: usize, targets: usize },
    #[error("At least one input/target pair is required")]
    NoExamples,
    #[error("No zero-cost program after {generations} generations")]
    Exhausted { generations: usize },
    #[error("No zero-cost program after {attempts} attempts")]
    RetriesExhausted { attempts: usize },
    #[error("Evolution cancelled")]
    Cancelled,
}

/// A program that ran and received a numeric cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredProgram {
    pub program: Program,
    /// Cost used for selection; includes runtime while stagnant.
    pub cost: u64,
    /// Cost without runtime.
    pub base_cost: u64,
}

/// Result of scoring one generation.
#[derive(Debug, Default)]
pub struct Evaluation {
    /// Valid programs in population order.
    pub scored: Vec<ScoredProgram>,
    /// Number of programs scored [`Cost::Invalid`].
    pub invalid: usize,
    /// First program, in population order, with cost 0.
    pub winner: Option<Program>,
    /// Whether runtime was part of the cost.
    pub time_cost: bool,
}

impl Evaluation {
    /// Lowest cost without runtime, if any program was valid.
    pub fn best_base_cost(&self) -> Option<u64> {
        self.scored.iter().map(|s| s.base_cost).min()
    }
}

/// Detects runs of generations whose best cost does not change.
#[derive(Debug, Clone)]
pub struct StagnationTracker {
    threshold: usize,
    last_best: Option<u64>,
    flat_generations: usize,
    stagnant: bool,
}

impl StagnationTracker {
    /// Flag stagnation after `threshold` consecutive unchanged generations.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            last_best: None,
            flat_generations: 0,
            stagnant: false,
        }
    }

    /// Record this generation's best cost; returns whether the run is stagnant.
    pub fn observe(&mut self, best: u64) -> bool {
        if self.last_best == Some(best) {
            self.flat_generations += 1;
            if self.flat_generations >= self.threshold {
                self.stagnant = true;
            }
        } else {
            self.last_best = Some(best);
            self.flat_generations = 0;
            self.stagnant = false;
        }
        self.stagnant
    }

    /// Whether runtime currently joins the cost.
    pub fn is_stagnant(&self) -> bool {
        self.stagnant
    }

    /// Consecutive generations without a change.
    pub fn flat_generations(&self) -> usize {
        self.flat_generations
    }
}

/// Cost options for the next evaluation: runtime is added while stagnant.
pub fn effective_cost_options(base: &CostOptions, stagnant: bool) -> CostOptions {
    CostOptions {
        time_cost: base.time_cost || stagnant,
        ..base.clone()
    }
}

/// Score every program in parallel. Results keep population order.
pub fn evaluate_population<S: AsRef<str> + Sync>(
    population: Vec<Program>,
    inputs: &[S],
    targets: &[S],
    options: &CostOptions,
) -> Evaluation {
    let costs: Vec<(Cost, Cost)> = population
        .par_iter()
        .map(|program| {
            let (base, elapsed) = score_timed(inputs, targets, program, options);
            (base, with_runtime(base, elapsed, options))
        })
        .collect();

    let mut evaluation = Evaluation {
        time_cost: options.time_cost,
        ..Default::default()
    };
    for (program, costs) in population.into_iter().zip(costs) {
        match costs {
            (Cost::Valid(base_cost), Cost::Valid(cost)) => {
                if cost == 0 && evaluation.winner.is_none() {
                    evaluation.winner = Some(program.clone());
                }
                evaluation.scored.push(ScoredProgram {
                    program,
                    cost,
                    base_cost,
                });
            }
            _ => evaluation.invalid += 1,
        }
    }
    evaluation
}

/// Keep the best `cull_ratio` fraction (rounded down, at least one).
///
/// `scored` must already be sorted ascending by cost.
pub fn cull(scored: Vec<ScoredProgram>, cull_ratio: f64) -> Vec<Program> {
    let keep = ((scored.len() as f64 * cull_ratio) as usize).max(1);
    scored.into_iter().take(keep).map(|s| s.program).collect()
}

/// Refill the slots of `quota` invalid programs.
///
/// About a quarter become mutated copies of `best`; the rest are fresh random
/// programs as long as a randomly chosen survivor.
pub fn replace_invalids(
    rng: &mut ProgramRng,
    mut survivors: Vec<Program>,
    best: &Program,
    quota: usize,
    options: &MutateOptions,
) -> Vec<Program> {
    if quota == 0 {
        return survivors;
    }

    let mutated = quota.div_ceil(4);
    let fresh = quota - mutated;

    let length = if survivors.is_empty() {
        best.len()
    } else {
        survivors[rng.index(survivors.len())].len()
    }
    .max(1);

    for _ in 0..mutated {
        survivors.push(rng.mutate(best, options));
    }
    survivors.extend(rng.random_population(fresh, length));
    survivors
}

/// Mutate every survivor once, producing the interstitial population.
pub fn mutate_all(
    rng: &mut ProgramRng,
    survivors: &[Program],
    options: &MutateOptions,
) -> Vec<Program> {
    survivors.iter().map(|p| rng.mutate(p, options)).collect()
}

/// Shuffle both populations, pair them by position, and cross each pair.
pub fn recombine(
    rng: &mut ProgramRng,
    mut survivors: Vec<Program>,
    mut interstitial: Vec<Program>,
) -> Vec<Program> {
    rng.shuffle(&mut survivors);
    rng.shuffle(&mut interstitial);

    let mut children = Vec::with_capacity(survivors.len() * 2);
    for (a, b) in survivors.iter().zip(&interstitial) {
        let (x, y) = rng.crossover(a, b);
        children.push(x);
        children.push(y);
    }
    children
}

/// Shuffle and cut the population down to `size`.
pub fn truncate(rng: &mut ProgramRng, mut population: Vec<Program>, size: usize) -> Vec<Program> {
    rng.shuffle(&mut population);
    population.truncate(size);
    population
}

/// Evolution engine that runs one search.
pub struct EvolutionEngine {
    config: RunConfig,
    inputs: Vec<String>,
    targets: Vec<String>,
    rng: ProgramRng,
    stagnation: StagnationTracker,
    generation: usize,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new engine for parallel `inputs` and `targets`.
    pub fn new<S: AsRef<str>>(
        config: RunConfig,
        inputs: &[S],
        targets: &[S],
    ) -> Result<Self, EvolveError> {
        config.validate()?;

        if inputs.len() != targets.len() {
            return Err(EvolveError::MismatchedExamples {
                inputs: inputs.len(),
                targets: targets.len(),
            });
        }
        if inputs.is_empty() {
            return Err(EvolveError::NoExamples);
        }

        let rng = match config.random_seed {
            Some(seed) => ProgramRng::new(seed),
            None => ProgramRng::random(),
        };
        let stagnation = StagnationTracker::new(config.evolve.stagnation_generations);

        Ok(Self {
            inputs: inputs.iter().map(|s| s.as_ref().to_string()).collect(),
            targets: targets.iter().map(|s| s.as_ref().to_string()).collect(),
            config,
            rng,
            stagnation,
            generation: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Share an existing cancellation flag.
    pub fn with_cancel_handle(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current generation index.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Whether runtime is currently part of the cost.
    pub fn is_stagnant(&self) -> bool {
        self.stagnation.is_stagnant()
    }

    fn log_level(&self) -> Level {
        if self.config.evolve.verbose {
            Level::Info
        } else {
            Level::Debug
        }
    }

    fn progress(
        &self,
        population_size: usize,
        evaluation: Option<&Evaluation>,
        phase: EvolutionPhase,
    ) -> EvolutionProgress {
        let best = evaluation.and_then(|e| e.scored.first());
        EvolutionProgress {
            generation: self.generation,
            generation_limit: self.config.evolve.generation_limit,
            population_size,
            invalid_count: evaluation.map_or(0, |e| e.invalid),
            best_cost: best.map(|s| s.cost),
            best_base_cost: evaluation.and_then(Evaluation::best_base_cost),
            time_cost: evaluation.is_some_and(|e| e.time_cost),
            best_program: best.map(|s| s.program.clone()),
            flat_generations: self.stagnation.flat_generations(),
            stagnant: self.stagnation.is_stagnant(),
            phase,
        }
    }

    /// Run every input through `program` for a human-readable sample.
    fn sample_outputs(&self, program: &Program) -> Vec<SamplePair> {
        self.inputs
            .iter()
            .map(|input| SamplePair {
                input: input.clone(),
                output: evaluate(program, input, self.config.evolve.program_timeout_ms)
                    .unwrap_or_else(|err| format!("<{err}>")),
            })
            .collect()
    }

    fn log_generation(&self, population_size: usize, evaluation: &Evaluation) {
        let level = self.log_level();
        if !log::log_enabled!(level) {
            return;
        }
        let Some(best) = evaluation.scored.first() else {
            return;
        };

        let output = evaluate(
            &best.program,
            &self.inputs[0],
            self.config.evolve.program_timeout_ms,
        );
        match output {
            Ok(output) => log::log!(
                level,
                "Gen. {}: {} programs, {} inviable. Min. cost {}\n{}\n{}",
                self.generation,
                population_size,
                evaluation.invalid,
                best.cost,
                best.program,
                output
            ),
            Err(err) => log::log!(level, "Gen. {}: best program failed: {err}", self.generation),
        }
    }

    /// Build the next population from a sorted evaluation.
    fn next_generation(&mut self, evaluation: Evaluation) -> Vec<Program> {
        let evolve = &self.config.evolve;
        let mutate = &self.config.mutate;

        let best = evaluation.scored[0].program.clone();
        let survivors = cull(evaluation.scored, evolve.cull_ratio);
        let survivors =
            replace_invalids(&mut self.rng, survivors, &best, evaluation.invalid, mutate);
        let interstitial = mutate_all(&mut self.rng, &survivors, mutate);
        let children = recombine(&mut self.rng, survivors, interstitial);
        truncate(&mut self.rng, children, evolve.population_size)
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<ProgramReport, EvolveError>
    where
        F: FnMut(&EvolutionProgress),
    {
        let evolve = self.config.evolve.clone();

        // Initialize
        self.generation = 0;
        self.stagnation = StagnationTracker::new(evolve.stagnation_generations);
        let mut population = self
            .rng
            .random_population(evolve.population_size, evolve.initial_program_size);
        callback(&self.progress(population.len(), None, EvolutionPhase::Initializing));

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                log::info!("Evolution cancelled at generation {}", self.generation);
                callback(&self.progress(population.len(), None, EvolutionPhase::Stopped));
                return Err(EvolveError::Cancelled);
            }

            if let Some(limit) = evolve.generation_limit
                && self.generation >= limit
            {
                log::info!("Generation limit {limit} reached without a winner");
                callback(&self.progress(population.len(), None, EvolutionPhase::Stopped));
                return Err(EvolveError::Exhausted {
                    generations: self.generation,
                });
            }

            let cost_options =
                effective_cost_options(&self.config.cost, self.stagnation.is_stagnant());
            let population_size = population.len();
            let mut evaluation =
                evaluate_population(population, &self.inputs, &self.targets, &cost_options);
            // Stable: equal costs keep population order.
            evaluation.scored.sort_by_key(|s| s.cost);

            if let Some(winner) = evaluation.winner.take() {
                log::info!("Found a zero-cost program at generation {}", self.generation);
                let report = ProgramReport {
                    samples: self.sample_outputs(&winner),
                    program: winner,
                    cost: 0,
                    generation: self.generation,
                };
                callback(&self.progress(
                    population_size,
                    Some(&evaluation),
                    EvolutionPhase::Complete,
                ));
                return Ok(report);
            }

            let Some(base_cost) = evaluation.best_base_cost() else {
                log::warn!(
                    "Gen. {}: all {} programs inviable, regenerating population",
                    self.generation,
                    population_size
                );
                callback(&self.progress(
                    population_size,
                    Some(&evaluation),
                    EvolutionPhase::Evaluating,
                ));
                population = self
                    .rng
                    .random_population(evolve.population_size, evolve.initial_program_size);
                self.generation += 1;
                continue;
            };

            // Only the base cost decides stagnation.
            let was_stagnant = self.stagnation.is_stagnant();
            let stagnant = self.stagnation.observe(base_cost);
            if stagnant && !was_stagnant {
                log::info!(
                    "Gen. {}: best cost flat for {} generations, adding runtime to cost",
                    self.generation,
                    self.stagnation.flat_generations()
                );
            } else if was_stagnant && !stagnant {
                log::info!("Gen. {}: best cost moved, dropping runtime cost", self.generation);
            }

            self.log_generation(population_size, &evaluation);
            callback(&self.progress(
                population_size,
                Some(&evaluation),
                EvolutionPhase::Evaluating,
            ));

            population = self.next_generation(evaluation);
            self.generation += 1;
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<ProgramReport, EvolveError> {
        self.run_with_callback(|_| {})
    }
}

/// Run one search for a program mapping each input to its target.
pub fn evolve<S: AsRef<str>>(
    inputs: &[S],
    targets: &[S],
    config: &RunConfig,
) -> Result<ProgramReport, EvolveError> {
    EvolutionEngine::new(config.clone(), inputs, targets)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EvolveOptions, Symbol};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn small_config(seed: u64) -> RunConfig {
        RunConfig {
            evolve: EvolveOptions {
                population_size: 200,
                initial_program_size: 2,
                generation_limit: Some(300),
                ..Default::default()
            },
            random_seed: Some(seed),
            ..Default::default()
        }
    }

    fn scored(costs: &[u64]) -> Vec<ScoredProgram> {
        costs
            .iter()
            .map(|&cost| ScoredProgram {
                program: Program::new(vec![Symbol::Increment; cost as usize + 1]),
                cost,
                base_cost: cost,
            })
            .collect()
    }

    #[test]
    fn test_stagnation_tracker() {
        let mut tracker = StagnationTracker::new(3);
        assert!(!tracker.observe(10));
        assert!(!tracker.observe(10));
        assert!(!tracker.observe(10));
        assert!(tracker.observe(10));
        assert!(tracker.observe(10));
        assert_eq!(tracker.flat_generations(), 4);

        // Any change clears the flag.
        assert!(!tracker.observe(9));
        assert_eq!(tracker.flat_generations(), 0);
    }

    #[test]
    fn test_stagnation_switches_on_time_cost() {
        let base = CostOptions::default();
        assert!(!effective_cost_options(&base, false).time_cost);
        assert!(effective_cost_options(&base, true).time_cost);

        let always = CostOptions {
            time_cost: true,
            ..Default::default()
        };
        assert!(effective_cost_options(&always, false).time_cost);
    }

    #[test]
    fn test_evaluate_population() {
        let population = vec![
            Program::parse("+]"),
            Program::parse(",."),
            Program::parse(",[.,]"),
            Program::parse(""),
        ];
        let evaluation =
            evaluate_population(population, &["ab"], &["ab"], &CostOptions::default());

        assert_eq!(evaluation.invalid, 1);
        assert_eq!(evaluation.scored.len(), 3);
        assert_eq!(evaluation.scored[0].program.to_string(), ",.");
        assert_eq!(evaluation.winner, Some(Program::parse(",[.,]")));
    }

    #[test]
    fn test_cull_keeps_best_fraction() {
        let survivors = cull(scored(&[0, 1, 2, 3, 4, 5, 6]), 0.5);
        assert_eq!(survivors.len(), 3);
        assert_eq!(survivors[0].len(), 1);
        assert_eq!(survivors[2].len(), 3);

        assert_eq!(cull(scored(&[4]), 0.5).len(), 1);
        assert_eq!(cull(scored(&[1, 2, 3, 4]), 1.0).len(), 4);
    }

    #[test]
    fn test_replace_invalids_restores_mass() {
        let mut rng = ProgramRng::new(1);
        let survivors = vec![Program::parse("+++"), Program::parse("---")];
        let best = Program::parse("+++");
        let options = MutateOptions::default();

        let refilled = replace_invalids(&mut rng, survivors.clone(), &best, 8, &options);
        assert_eq!(refilled.len(), 10);
        assert_eq!(&refilled[..2], &survivors[..]);
        // Fresh programs are sized like a survivor.
        assert!(refilled[4..].iter().all(|p| p.len() == 3));

        let untouched = replace_invalids(&mut rng, survivors.clone(), &best, 0, &options);
        assert_eq!(untouched, survivors);
    }

    #[test]
    fn test_recombine_and_truncate() {
        let mut rng = ProgramRng::new(2);
        let survivors = rng.random_population(10, 6);
        let interstitial = mutate_all(&mut rng, &survivors, &MutateOptions::default());
        assert_eq!(interstitial.len(), 10);

        let total: usize = survivors.iter().chain(&interstitial).map(Program::len).sum();
        let children = recombine(&mut rng, survivors, interstitial);
        assert_eq!(children.len(), 20);
        assert_eq!(children.iter().map(Program::len).sum::<usize>(), total);

        assert_eq!(truncate(&mut rng, children.clone(), 15).len(), 15);
        assert_eq!(truncate(&mut rng, children, 50).len(), 20);
    }

    #[test]
    fn test_rejects_mismatched_examples() {
        let result = EvolutionEngine::new(RunConfig::default(), &["a", "b"], &["a"]);
        assert!(matches!(
            result,
            Err(EvolveError::MismatchedExamples {
                inputs: 2,
                targets: 1
            })
        ));

        let empty: [&str; 0] = [];
        assert!(matches!(
            EvolutionEngine::new(RunConfig::default(), &empty, &empty),
            Err(EvolveError::NoExamples)
        ));
    }

    #[test]
    fn test_rejects_invalid_options() {
        let mut config = RunConfig::default();
        config.evolve.population_size = 1;
        assert!(matches!(
            EvolutionEngine::new(config, &["a"], &["a"]),
            Err(EvolveError::InvalidOptions(OptionsError::PopulationTooSmall))
        ));
    }

    #[test]
    fn test_small_identity_search() {
        init_logger();
        let report = evolve(&["A"], &["A"], &small_config(7)).unwrap();

        assert_eq!(report.cost, 0);
        assert_eq!(evaluate(&report.program, "A", 100).unwrap(), "A");
        assert_eq!(
            report.samples,
            vec![SamplePair {
                input: "A".to_string(),
                output: "A".to_string(),
            }]
        );
    }

    #[test]
    fn test_generation_limit_exhausts() {
        init_logger();
        let mut config = small_config(3);
        config.evolve.population_size = 20;
        config.evolve.generation_limit = Some(3);

        // Output cells never exceed 255, so this target is unreachable.
        let result = evolve(&["a"], &["\u{20ac}"], &config);
        assert!(matches!(result, Err(EvolveError::Exhausted { generations: 3 })));
    }

    #[test]
    fn test_progress_reported_each_generation() {
        init_logger();
        let mut config = small_config(5);
        config.evolve.population_size = 20;
        config.evolve.generation_limit = Some(4);

        let mut engine = EvolutionEngine::new(config, &["a"], &["\u{20ac}"]).unwrap();
        let mut seen = Vec::new();
        let result = engine.run_with_callback(|progress| {
            seen.push((progress.generation, progress.phase));
        });

        assert!(result.is_err());
        assert_eq!(seen.first(), Some(&(0, EvolutionPhase::Initializing)));
        assert_eq!(seen.last(), Some(&(4, EvolutionPhase::Stopped)));
        let evaluated: Vec<usize> = seen
            .iter()
            .filter(|(_, phase)| *phase == EvolutionPhase::Evaluating)
            .map(|(generation, _)| *generation)
            .collect();
        assert_eq!(evaluated, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_stagnant_run_switches_to_time_cost() {
        init_logger();
        let mut config = small_config(9);
        config.evolve.population_size = 30;
        config.evolve.generation_limit = Some(8);
        config.evolve.stagnation_generations = 2;

        // Silent programs are the best possible here, so the base cost never
        // moves: not_equal plus one missing character.
        let mut engine = EvolutionEngine::new(config, &[""], &["\u{20ac}"]).unwrap();
        let mut seen = Vec::new();
        let result = engine.run_with_callback(|progress| {
            if progress.phase == EvolutionPhase::Evaluating {
                seen.push((progress.best_base_cost, progress.stagnant, progress.time_cost));
                assert!(progress.best_cost >= progress.best_base_cost);
            }
        });

        assert!(matches!(result, Err(EvolveError::Exhausted { generations: 8 })));
        assert_eq!(seen.len(), 8);
        assert!(seen.iter().all(|(base, _, _)| *base == Some(256)));

        let stagnant: Vec<bool> = seen.iter().map(|(_, stagnant, _)| *stagnant).collect();
        assert_eq!(
            stagnant,
            vec![false, false, true, true, true, true, true, true]
        );

        // Runtime joins the cost from the generation after stagnation begins.
        let timed: Vec<bool> = seen.iter().map(|(_, _, timed)| *timed).collect();
        assert_eq!(
            timed,
            vec![false, false, false, true, true, true, true, true]
        );
        assert!(engine.is_stagnant());
    }

    #[test]
    fn test_evaluation_tracks_base_cost() {
        let options = CostOptions {
            time_cost: true,
            ascii_only: false,
            ..Default::default()
        };
        let population = vec![Program::parse("+[]"), Program::parse("+")];
        let evaluation = evaluate_population(population, &["a"], &["a"], &options);

        assert!(evaluation.time_cost);
        assert_eq!(evaluation.scored.len(), 2);
        let spin = &evaluation.scored[0];
        assert!(spin.cost >= spin.base_cost + options.program_timeout_ms);
        // Silent: not_equal plus one missing character.
        assert_eq!(evaluation.best_base_cost(), Some(1 + 255));
    }

    #[test]
    fn test_cancellation() {
        let config = small_config(11);
        let mut engine = EvolutionEngine::new(config, &["a"], &["\u{20ac}"]).unwrap();
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        assert!(matches!(engine.run(), Err(EvolveError::Cancelled)));
    }

    #[test]
    #[ignore = "long-running end-to-end search"]
    fn test_hello_world_identity() {
        init_logger();
        let config = RunConfig {
            evolve: EvolveOptions {
                generation_limit: None,
                verbose: true,
                ..Default::default()
            },
            random_seed: Some(2015),
            ..Default::default()
        };

        let inputs = ["Hello, world!"];
        let report = evolve(&inputs, &inputs, &config).unwrap();
        assert_eq!(
            evaluate(&report.program, "Hello, world!", 100).unwrap(),
            "Hello, world!"
        );
    }
}
