//! Supervised runner: restarts a search that ran out of generations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::schema::{RunConfig, SupervisedReport};

use super::genome::ProgramRng;
use super::search::{EvolutionEngine, EvolveError};

/// Retries exhausted searches from fresh random populations.
pub struct Supervisor {
    config: RunConfig,
    max_attempts: usize,
    cancelled: Arc<AtomicBool>,
}

impl Supervisor {
    /// Create a supervisor allowing `max_attempts` runs; 0 retries forever.
    pub fn new(config: RunConfig, max_attempts: usize) -> Self {
        Self {
            config,
            max_attempts,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get cancellation handle. Cancelling stops the current run and is never retried.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Run until a search succeeds, the attempt budget runs out, or the run
    /// is cancelled.
    pub fn run<S: AsRef<str>>(
        &self,
        inputs: &[S],
        targets: &[S],
    ) -> Result<SupervisedReport, EvolveError> {
        let mut seeds = match self.config.random_seed {
            Some(seed) => ProgramRng::new(seed),
            None => ProgramRng::random(),
        };

        let mut attempts = 0;
        loop {
            if self.max_attempts != 0 && attempts >= self.max_attempts {
                log::warn!("Supervised evolution gave up after {attempts} attempts");
                return Err(EvolveError::RetriesExhausted { attempts });
            }
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(EvolveError::Cancelled);
            }
            attempts += 1;

            let config = RunConfig {
                random_seed: Some(seeds.next_seed()),
                ..self.config.clone()
            };
            let mut engine = EvolutionEngine::new(config, inputs, targets)?
                .with_cancel_handle(Arc::clone(&self.cancelled));

            match engine.run() {
                Ok(report) => {
                    log::info!("After {attempts} tries, evolution succeeded!");
                    log::info!("Success!\n{report}");
                    return Ok(SupervisedReport { attempts, report });
                }
                Err(EvolveError::Exhausted { generations }) => {
                    log::warn!(
                        "Attempt {attempts} exhausted after {generations} generations, restarting"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Run a search, retrying up to `max_attempts` times (0 retries forever).
pub fn supervised_evolve<S: AsRef<str>>(
    inputs: &[S],
    targets: &[S],
    config: &RunConfig,
    max_attempts: usize,
) -> Result<SupervisedReport, EvolveError> {
    Supervisor::new(config.clone(), max_attempts).run(inputs, targets)
}
