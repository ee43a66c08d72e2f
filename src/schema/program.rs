//! Program representation for the tape language.
//!
//! A program is an owned sequence of [`Symbol`]s. Source text is parsed by
//! dropping every character outside the 8-symbol alphabet, so comments and
//! whitespace never reach the interpreter.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One instruction of the tape language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// `+`: increment the current cell (wrapping).
    Increment,
    /// `-`: decrement the current cell (wrapping).
    Decrement,
    /// `<`: move the cursor left, saturating at 0.
    Left,
    /// `>`: move the cursor right, growing the tape as needed.
    Right,
    /// `.`: append the current cell to the output.
    Output,
    /// `,`: read the next input character into the current cell.
    Input,
    /// `[`: jump past the matching `]` when the current cell is 0.
    LoopOpen,
    /// `]`: jump back to the matching `[` when the current cell is non-zero.
    LoopClose,
}

impl Symbol {
    /// Every symbol of the language.
    pub const ALL: [Symbol; 8] = [
        Symbol::Increment,
        Symbol::Decrement,
        Symbol::Left,
        Symbol::Right,
        Symbol::Output,
        Symbol::Input,
        Symbol::LoopOpen,
        Symbol::LoopClose,
    ];

    /// Symbols that may start a fresh position in a generated program.
    /// `]` is excluded since it is only ever emitted to close a loop.
    pub const NO_LOOP_CLOSE: [Symbol; 7] = [
        Symbol::Increment,
        Symbol::Decrement,
        Symbol::Left,
        Symbol::Right,
        Symbol::Output,
        Symbol::Input,
        Symbol::LoopOpen,
    ];

    /// Symbols that never affect bracket balance.
    pub const NO_LOOPS: [Symbol; 6] = [
        Symbol::Increment,
        Symbol::Decrement,
        Symbol::Left,
        Symbol::Right,
        Symbol::Output,
        Symbol::Input,
    ];

    /// Parse a single source character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Symbol::Increment),
            '-' => Some(Symbol::Decrement),
            '<' => Some(Symbol::Left),
            '>' => Some(Symbol::Right),
            '.' => Some(Symbol::Output),
            ',' => Some(Symbol::Input),
            '[' => Some(Symbol::LoopOpen),
            ']' => Some(Symbol::LoopClose),
            _ => None,
        }
    }

    /// Source character for this symbol.
    pub fn as_char(self) -> char {
        match self {
            Symbol::Increment => '+',
            Symbol::Decrement => '-',
            Symbol::Left => '<',
            Symbol::Right => '>',
            Symbol::Output => '.',
            Symbol::Input => ',',
            Symbol::LoopOpen => '[',
            Symbol::LoopClose => ']',
        }
    }

    /// Whether this symbol is `[` or `]`.
    pub fn is_bracket(self) -> bool {
        matches!(self, Symbol::LoopOpen | Symbol::LoopClose)
    }
}

/// A candidate program.
///
/// Programs are values: every operator copies rather than aliases them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Program {
    symbols: Vec<Symbol>,
}

impl Program {
    /// Create a program from symbols.
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    /// Parse source text, ignoring characters outside the alphabet.
    pub fn parse(source: &str) -> Self {
        Self {
            symbols: source.chars().filter_map(Symbol::from_char).collect(),
        }
    }

    /// Symbols of the program.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Consume the program, returning its symbols.
    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the program has no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether every `]` closes an earlier `[` and every `[` is closed.
    pub fn is_balanced(&self) -> bool {
        let mut depth = 0usize;
        for symbol in &self.symbols {
            match symbol {
                Symbol::LoopOpen => depth += 1,
                Symbol::LoopClose => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        depth == 0
    }

    /// Index of the bracket matching the one at `index`, if it is a bracket
    /// and has a partner.
    pub fn matching_bracket(&self, index: usize) -> Option<usize> {
        match self.symbols.get(index)? {
            Symbol::LoopOpen => {
                let mut depth = 0usize;
                for (offset, symbol) in self.symbols[index..].iter().enumerate() {
                    match symbol {
                        Symbol::LoopOpen => depth += 1,
                        Symbol::LoopClose => {
                            depth -= 1;
                            if depth == 0 {
                                return Some(index + offset);
                            }
                        }
                        _ => {}
                    }
                }
                None
            }
            Symbol::LoopClose => {
                let mut depth = 0usize;
                for position in (0..=index).rev() {
                    match self.symbols[position] {
                        Symbol::LoopClose => depth += 1,
                        Symbol::LoopOpen => {
                            depth -= 1;
                            if depth == 0 {
                                return Some(position);
                            }
                        }
                        _ => {}
                    }
                }
                None
            }
            _ => None,
        }
    }
}

impl From<Vec<Symbol>> for Program {
    fn from(symbols: Vec<Symbol>) -> Self {
        Self::new(symbols)
    }
}

impl From<&str> for Program {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}

impl From<String> for Program {
    fn from(source: String) -> Self {
        Self::parse(&source)
    }
}

impl From<Program> for String {
    fn from(program: Program) -> Self {
        program.to_string()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            write!(f, "{}", symbol.as_char())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_comments() {
        let program = Program::parse("read ,[ echo . read again , ]\n");
        assert_eq!(program.to_string(), ",[.,]");
        assert_eq!(program.len(), 5);
    }

    #[test]
    fn test_balance() {
        assert!(Program::parse("+[-[>]<]").is_balanced());
        assert!(!Program::parse("+]").is_balanced());
        assert!(!Program::parse("[[]").is_balanced());
        assert!(Program::parse("").is_balanced());
    }

    #[test]
    fn test_matching_bracket() {
        let program = Program::parse("+[-[>]<]");
        assert_eq!(program.matching_bracket(1), Some(7));
        assert_eq!(program.matching_bracket(7), Some(1));
        assert_eq!(program.matching_bracket(3), Some(5));
        assert_eq!(program.matching_bracket(5), Some(3));
        assert_eq!(program.matching_bracket(0), None);

        let unbalanced = Program::parse("[+");
        assert_eq!(unbalanced.matching_bracket(0), None);
        let stray = Program::parse("+]");
        assert_eq!(stray.matching_bracket(1), None);
    }

    #[test]
    fn test_serialization() {
        let program = Program::parse("++[>.<-]");
        let json = serde_json::to_string(&program).unwrap();
        assert_eq!(json, "\"++[>.<-]\"");
        let parsed: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, program);
    }
}
