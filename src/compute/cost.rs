//! Cost evaluation: how far a program is from producing every target.
//!
//! A program is run once per (input, target) pair. Exact matches cost
//! nothing; mismatches are charged through the [`PenaltyTable`] according to
//! the configured [`CostPolicy`]. Malformed programs are not charged at all:
//! they score [`Cost::Invalid`], which orders after every numeric cost.

use std::fmt;
use std::time::{Duration, Instant};

use crate::schema::{CostOptions, CostPolicy, PenaltyTable, Program, TimeoutPolicy};

use super::interpreter::{BracketMap, InterpretError, evaluate};

/// Largest value an output cell can hold.
pub const MAX_CODE_POINT: u64 = u8::MAX as u64;

/// Score of one program. Lower is better and `Valid(0)` is a perfect match.
///
/// The derived ordering places `Invalid` after every `Valid` cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cost {
    /// Program ran; total penalty across all pairs.
    Valid(u64),
    /// Program cannot be run deterministically and must be replaced.
    Invalid,
}

impl Cost {
    /// Numeric cost, if valid.
    pub fn value(self) -> Option<u64> {
        match self {
            Cost::Valid(cost) => Some(cost),
            Cost::Invalid => None,
        }
    }

    /// Whether the program matched every target.
    pub fn is_perfect(self) -> bool {
        self == Cost::Valid(0)
    }

    /// Whether the program was disqualified.
    pub fn is_invalid(self) -> bool {
        self == Cost::Invalid
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Valid(cost) => write!(f, "{cost}"),
            Cost::Invalid => write!(f, "invalid"),
        }
    }
}

/// Score `program` against parallel `inputs` and `targets`.
///
/// Runtime joins the cost only when `options.time_cost` is set.
pub fn score<S: AsRef<str>>(
    inputs: &[S],
    targets: &[S],
    program: &Program,
    options: &CostOptions,
) -> Cost {
    let (cost, elapsed) = score_timed(inputs, targets, program, options);
    with_runtime(cost, elapsed, options)
}

/// Base cost of `program`, without runtime, and the wall-clock time it took.
pub fn score_timed<S: AsRef<str>>(
    inputs: &[S],
    targets: &[S],
    program: &Program,
    options: &CostOptions,
) -> (Cost, Duration) {
    debug_assert_eq!(inputs.len(), targets.len());

    let mut elapsed = Duration::ZERO;
    if BracketMap::build(program.symbols()).is_err() {
        return (Cost::Invalid, elapsed);
    }

    let mut total = 0u64;
    for (input, target) in inputs.iter().zip(targets) {
        let start = Instant::now();
        let result = evaluate(program, input.as_ref(), options.program_timeout_ms);
        elapsed += start.elapsed();

        let pair = match result {
            Ok(output) => pair_cost(&output, target.as_ref(), options),
            Err(InterpretError::Timeout { .. }) => match options.timeout_policy {
                TimeoutPolicy::Penalize => timeout_cost(target.as_ref(), options),
                TimeoutPolicy::Disqualify => return (Cost::Invalid, elapsed),
            },
            Err(InterpretError::UnmatchedClose { .. } | InterpretError::UnmatchedOpen { .. }) => {
                return (Cost::Invalid, elapsed);
            }
        };
        total = total.saturating_add(pair);
    }

    (Cost::Valid(total), elapsed)
}

/// Add `elapsed` milliseconds to an imperfect cost when `time_cost` is set.
///
/// A perfect program stays perfect no matter how slow it ran.
pub fn with_runtime(cost: Cost, elapsed: Duration, options: &CostOptions) -> Cost {
    match cost {
        Cost::Valid(total) if options.time_cost && total > 0 => {
            let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
            Cost::Valid(total.saturating_add(millis))
        }
        other => other,
    }
}

/// Cost of a pair whose run timed out.
///
/// Charged as empty output plus `penalties.timeout`, so a program that never
/// halts always scores worse than one that halts silently.
pub fn timeout_cost(target: &str, options: &CostOptions) -> u64 {
    pair_cost("", target, options).saturating_add(options.penalties.timeout)
}

/// Cost of one pair whose program produced `output`.
pub fn pair_cost(output: &str, target: &str, options: &CostOptions) -> u64 {
    if output == target {
        return 0;
    }

    let penalties = &options.penalties;
    let distance = match options.policy {
        CostPolicy::CharacterDistance => character_distance_cost(output, target, penalties),
        CostPolicy::Bucketed => bucketed_cost(output, target, penalties),
    };
    let mut cost = penalties.not_equal.saturating_add(distance);

    if options.ascii_only {
        cost = cost.saturating_add(non_ascii_cost(output, penalties));
    }

    cost
}

/// Code point distance between `output` and `target`.
///
/// Aligned characters cost their absolute difference. Each missing trailing
/// character costs [`MAX_CODE_POINT`], so empty output is the worst outcome
/// short of a timeout. Each extra trailing character costs its own code point.
/// Every unit is scaled by `wrong_char`.
pub fn character_distance_cost(output: &str, target: &str, penalties: &PenaltyTable) -> u64 {
    let output: Vec<u64> = output.chars().map(|c| u64::from(u32::from(c))).collect();
    let target: Vec<u64> = target.chars().map(|c| u64::from(u32::from(c))).collect();
    let weight = penalties.wrong_char;

    let aligned = output
        .iter()
        .zip(&target)
        .fold(0u64, |sum, (&o, &t)| sum.saturating_add(o.abs_diff(t)));

    let tail = if output.len() < target.len() {
        ((target.len() - output.len()) as u64).saturating_mul(MAX_CODE_POINT)
    } else {
        output[target.len()..]
            .iter()
            .fold(0u64, |sum, &c| sum.saturating_add(c))
    };

    weight.saturating_mul(aligned.saturating_add(tail))
}

/// Coarse bucket-based divergence between `output` and `target`.
pub fn bucketed_cost(output: &str, target: &str, penalties: &PenaltyTable) -> u64 {
    if output.is_empty() {
        return penalties.no_output;
    }

    let output_len = output.chars().count() as u64;
    let target_len = target.chars().count() as u64;
    let length = if output_len > target_len {
        penalties.too_long.saturating_mul(output_len - target_len)
    } else {
        penalties.too_short.saturating_mul(target_len - output_len)
    };

    let content = if output.contains(target) {
        penalties.extra_char.saturating_mul(output_len - target_len)
    } else if target.contains(output) {
        penalties.missing_char.saturating_mul(target_len - output_len)
    } else {
        let shared = target.chars().filter(|&c| output.contains(c)).count() as u64;
        penalties
            .non_intersection
            .saturating_mul(output_len.saturating_sub(shared))
    };

    length.saturating_add(content)
}

/// Charge for output characters outside ASCII letters and digits.
fn non_ascii_cost(output: &str, penalties: &PenaltyTable) -> u64 {
    let count = output.chars().filter(|c| !c.is_ascii_alphanumeric()).count() as u64;
    count.saturating_mul(penalties.non_ascii)
}
