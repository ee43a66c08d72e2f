//! Program manipulation utilities for evolutionary search.
//!
//! Provides random generation, mutation, and crossover of programs.

use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;

use crate::schema::{MutateOptions, Program, Symbol};

/// The four edit kinds a mutation can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Replace one symbol.
    InPlace,
    /// Insert one symbol.
    Addition,
    /// Remove one symbol, or both halves of a bracket pair.
    Deletion,
    /// Copy unchanged.
    None,
}

impl MutationKind {
    const ALL: [MutationKind; 4] = [
        MutationKind::InPlace,
        MutationKind::Addition,
        MutationKind::Deletion,
        MutationKind::None,
    ];
}

/// Random number generator wrapper for program operations.
pub struct ProgramRng {
    rng: StdRng,
}

impl ProgramRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Pick a symbol from a non-empty set.
    fn symbol(&mut self, set: &[Symbol]) -> Symbol {
        set[self.rng.gen_range(0..set.len())]
    }

    /// Generate a balanced program of exactly `length` symbols.
    ///
    /// Loops are only opened when at least 4 positions remain; the loop body
    /// never contains brackets.
    pub fn random_program(&mut self, length: usize) -> Program {
        let mut symbols = Vec::with_capacity(length);

        while symbols.len() < length {
            let remaining = length - symbols.len();
            let next = self.symbol(&Symbol::NO_LOOP_CLOSE);

            if next != Symbol::LoopOpen {
                symbols.push(next);
            } else if remaining < 4 {
                // No room for a loop.
                symbols.push(self.symbol(&Symbol::NO_LOOPS));
            } else {
                let body = self.rng.gen_range(1..=remaining - 2);
                symbols.push(Symbol::LoopOpen);
                for _ in 0..body {
                    symbols.push(self.symbol(&Symbol::NO_LOOPS));
                }
                symbols.push(Symbol::LoopClose);
            }
        }

        Program::new(symbols)
    }

    /// Generate `count` random programs of `length` symbols.
    pub fn random_population(&mut self, count: usize, length: usize) -> Vec<Program> {
        (0..count).map(|_| self.random_program(length)).collect()
    }

    /// Pick an edit kind in proportion to the configured likelihoods.
    pub fn mutation_kind(&mut self, options: &MutateOptions) -> MutationKind {
        let weights = [
            options.likelihood_of_inplace,
            options.likelihood_of_addition,
            options.likelihood_of_deletion,
            options.likelihood_of_none,
        ];

        match WeightedIndex::new(weights) {
            Ok(dist) => MutationKind::ALL[dist.sample(&mut self.rng)],
            Err(_) => MutationKind::None,
        }
    }

    /// `[`, a short run of non-loop symbols, `]`.
    fn loop_construct(&mut self, program_len: usize) -> Vec<Symbol> {
        let body = self.rng.gen_range(1..=(program_len / 2).max(1));
        let mut symbols = Vec::with_capacity(body + 2);
        symbols.push(Symbol::LoopOpen);
        for _ in 0..body {
            symbols.push(self.symbol(&Symbol::NO_LOOPS));
        }
        symbols.push(Symbol::LoopClose);
        symbols
    }

    fn wants_loop(&mut self, options: &MutateOptions) -> bool {
        self.rng.r#gen::<f64>() < options.loop_probability
    }

    /// Return a mutated copy of `program`.
    ///
    /// Programs of one symbol or fewer always grow by one non-loop symbol.
    /// Substitution landing on a bracket leaves the program unchanged.
    /// The result is never empty.
    pub fn mutate(&mut self, program: &Program, options: &MutateOptions) -> Program {
        let mut symbols = program.symbols().to_vec();

        if symbols.len() <= 1 {
            symbols.push(self.symbol(&Symbol::NO_LOOPS));
            return Program::new(symbols);
        }

        let len = symbols.len();
        match self.mutation_kind(options) {
            MutationKind::InPlace => {
                let index = self.rng.gen_range(0..len);
                if !symbols[index].is_bracket() {
                    if self.wants_loop(options) {
                        let construct = self.loop_construct(len);
                        symbols.splice(index..=index, construct);
                    } else {
                        symbols[index] = self.symbol(&Symbol::NO_LOOPS);
                    }
                }
            }
            MutationKind::Addition => {
                let index = self.rng.gen_range(0..=len);
                let insert = if self.wants_loop(options) {
                    self.loop_construct(len)
                } else {
                    vec![self.symbol(&Symbol::NO_LOOPS)]
                };
                symbols.splice(index..index, insert);
            }
            MutationKind::Deletion => {
                let index = self.rng.gen_range(0..len);
                match program.matching_bracket(index) {
                    Some(partner) => {
                        let (first, second) = (index.min(partner), index.max(partner));
                        symbols.remove(second);
                        symbols.remove(first);
                    }
                    None => {
                        symbols.remove(index);
                    }
                }
            }
            MutationKind::None => {}
        }

        if symbols.is_empty() {
            symbols.push(self.symbol(&Symbol::NO_LOOPS));
        }

        Program::new(symbols)
    }

    /// Single-point crossover: exchange suffixes at one random index.
    ///
    /// If either parent has one symbol, the children are the two
    /// concatenations instead. Bracket balance is not preserved.
    pub fn crossover(&mut self, a: &Program, b: &Program) -> (Program, Program) {
        let (a, b) = (a.symbols(), b.symbols());

        if a.len() == 1 || b.len() == 1 {
            return (
                Program::new([a, b].concat()),
                Program::new([b, a].concat()),
            );
        }

        let point = self.rng.gen_range(0..=a.len().min(b.len()));
        let child_a = [&a[..point], &b[point..]].concat();
        let child_b = [&b[..point], &a[point..]].concat();

        (Program::new(child_a), Program::new(child_b))
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Uniform index in `0..len`. `len` must be positive.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}
