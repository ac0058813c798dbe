use thiserror::Error;

use crate::span::SpanError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsolidationError {
    /// Questions without judgments must be filtered before consolidation.
    #[error("question has no answer judgments")]
    NoJudgments,

    #[error("judged span does not fit the sentence: {0}")]
    Span(#[from] SpanError),
}
