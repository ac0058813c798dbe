//! Answer span scoring.
//!
//! [`AnswerScorer`] combines three externally encoded inputs into one logit
//! per candidate span:
//!
//! ```text
//! logit(span) = w · relu(span_hidden + W_p · pred + W_q · question) + b
//! ```
//!
//! The objective is fixed at construction:
//!
//! - **binary**: sigmoid per span, plus a learned invalidity classifier on the
//!   question. Loss is summed span BCE plus invalidity BCE.
//! - **multinomial**: softmax over a fixed no-answer score and all present
//!   spans. Loss is the negative log of the summed probability of every
//!   correct option. Requires a `union` or `majority` selection policy.
//!
//! With a pruning ratio configured, only the top `ceil(ratio * n)` spans per
//! sentence are scored against gold and decoded.

pub mod error;
pub mod loss;
pub mod objective;
pub mod scorer;
pub mod types;


pub use error::ScoringError;
pub use objective::{AnswerObjective, BinaryObjective, MultinomialObjective};
pub use scorer::{AnswerScorer, QuestionEncoder};
pub use types::{AnswerInput, GoldTargets, ObjectivePrediction, QuestionInput, ScorerOutput};
