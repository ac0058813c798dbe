//! Span-based answer scoring for question answering over sentences.
//!
//! Every contiguous token span `[start, end]` of a sentence is a candidate
//! answer. The crate covers:
//!
//! - [`span`]: the triangular span enumeration and its index bijection
//! - [`consolidation`]: turning several annotators' judgments into gold
//!   span labels and an invalidity target
//! - [`pruning`]: keeping the top-K spans per sentence
//! - [`scoring`]: the span scorer with its binary and multinomial objectives
//! - [`decode`]: mapping scores back to spans for evaluation
//!
//! Configuration lives in [`config`] and can be read from `SPANQA_*`
//! environment variables.

pub mod config;
pub mod consolidation;
pub mod constants;
pub mod decode;
pub mod pruning;
pub mod scoring;
pub mod span;

pub use config::{Config, ConfigError, Objective, SelectionPolicy};
pub use consolidation::{
    AnswerJudgment, ConsolidationError, GoldLabelConsolidator, GoldLabels, QuestionLabel,
    QuestionSlots,
};
pub use decode::{
    AnswerMetric, AnswerPrediction, DecodeError, ScoredSpan, decode_pruned, decode_spans,
};
pub use pruning::{PrunedSpanSet, PruningError, SpanPruner, pruning_width};
pub use scoring::{
    AnswerInput, AnswerObjective, AnswerScorer, QuestionEncoder, QuestionInput, ScorerOutput,
    ScoringError,
};
pub use span::{Span, SpanError, SpanIndex, enumerate_spans, sequence_len_for_span_count, span_count};
