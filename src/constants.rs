//! Cross-cutting, shared constants.

/// Default width of the shared span hidden space.
pub const DEFAULT_SPAN_HIDDEN_DIM: usize = 100;

/// Finite stand-in for `-inf` on masked or absent span slots.
///
/// Large enough that `exp(MASKED_SCORE - max)` underflows to zero, small
/// enough that subtracting two of them stays finite.
pub const MASKED_SCORE: f32 = -1.0e20;

/// Fixed logit of the "no answer" option in the multinomial objective.
pub const NO_ANSWER_SCORE: f32 = 0.0;

/// Fraction of annotators needed for a majority decision.
pub const MAJORITY_FRACTION: f32 = 0.5;
