//! Interpreter for the tape language.
//!
//! Every call builds a fresh tape and bracket map, runs until the program
//! ends or the wall-clock deadline passes, and returns the collected output.
//! Evolved programs routinely loop forever, so the deadline is checked before
//! every executed symbol.

use std::time::{Duration, Instant};

use crate::schema::{Program, Symbol};

/// Errors raised while running a program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpretError {
    #[error("Loop close without loop open at {position}")]
    UnmatchedClose { position: usize },
    #[error("Loop open without loop close reached at {position}")]
    UnmatchedOpen { position: usize },
    #[error("Program timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}

impl InterpretError {
    /// Whether the error comes from malformed brackets rather than the budget.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            InterpretError::UnmatchedClose { .. } | InterpretError::UnmatchedOpen { .. }
        )
    }
}

/// Jump targets for every bracket, indexed by code position.
///
/// `targets[i]` holds the partner of the bracket at `i`. Non-bracket positions
/// and `[`s that are never closed hold `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketMap {
    targets: Vec<Option<usize>>,
}

impl BracketMap {
    /// Build the map, failing on the first `]` with no open `[` before it.
    pub fn build(code: &[Symbol]) -> Result<Self, InterpretError> {
        let mut targets = vec![None; code.len()];
        let mut open = Vec::new();

        for (position, symbol) in code.iter().enumerate() {
            match symbol {
                Symbol::LoopOpen => open.push(position),
                Symbol::LoopClose => {
                    let start = open
                        .pop()
                        .ok_or(InterpretError::UnmatchedClose { position })?;
                    targets[start] = Some(position);
                    targets[position] = Some(start);
                }
                _ => {}
            }
        }

        Ok(Self { targets })
    }

    /// Partner of the bracket at `position`.
    pub fn jump(&self, position: usize) -> Option<usize> {
        self.targets.get(position).copied().flatten()
    }
}

/// Growable byte tape with a cursor that never goes below 0.
#[derive(Debug)]
struct Tape {
    cells: Vec<u8>,
    cursor: usize,
}

impl Tape {
    fn new() -> Self {
        Self {
            cells: vec![0],
            cursor: 0,
        }
    }

    #[inline]
    fn right(&mut self) {
        self.cursor += 1;
        if self.cursor == self.cells.len() {
            self.cells.push(0);
        }
    }

    #[inline]
    fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    #[inline]
    fn get(&self) -> u8 {
        self.cells[self.cursor]
    }

    #[inline]
    fn set(&mut self, value: u8) {
        self.cells[self.cursor] = value;
    }
}

/// Run `program` on `input` with a wall-clock budget of `timeout_ms`.
///
/// Reads past the end of `input` yield 0. Input characters are stored as
/// their code point modulo 256; output cells are emitted as the code point of
/// their value.
pub fn evaluate(program: &Program, input: &str, timeout_ms: u64) -> Result<String, InterpretError> {
    let code = program.symbols();
    let brackets = BracketMap::build(code)?;

    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let mut tape = Tape::new();
    let mut input = input.chars();
    let mut output = String::new();
    let mut pc = 0usize;

    while pc < code.len() {
        if Instant::now() > deadline {
            return Err(InterpretError::Timeout { timeout_ms });
        }

        match code[pc] {
            Symbol::Right => tape.right(),
            Symbol::Left => tape.left(),
            Symbol::Increment => tape.set(tape.get().wrapping_add(1)),
            Symbol::Decrement => tape.set(tape.get().wrapping_sub(1)),
            Symbol::LoopOpen => {
                if tape.get() == 0 {
                    pc = brackets
                        .jump(pc)
                        .ok_or(InterpretError::UnmatchedOpen { position: pc })?;
                }
            }
            Symbol::LoopClose => {
                if tape.get() != 0 {
                    pc = brackets
                        .jump(pc)
                        .ok_or(InterpretError::UnmatchedClose { position: pc })?;
                }
            }
            Symbol::Output => output.push(char::from(tape.get())),
            Symbol::Input => {
                let value = input.next().map_or(0, |c| (u32::from(c) & 0xFF) as u8);
                tape.set(value);
            }
        }

        pc += 1;
    }

    Ok(output)
}
