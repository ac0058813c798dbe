use thiserror::Error;

use crate::config::ConfigError;
use crate::consolidation::ConsolidationError;
use crate::decode::DecodeError;
use crate::pruning::PruningError;
use crate::span::SpanError;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid scorer configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("missing required input: {field}")]
    MissingInput { field: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("predicate index {index} out of range for sequence length {seq_len}")]
    PredicateOutOfRange { index: usize, seq_len: usize },

    #[error(transparent)]
    Span(#[from] SpanError),

    #[error("gold label consolidation failed: {0}")]
    Consolidation(#[from] ConsolidationError),

    #[error("span pruning failed: {0}")]
    Pruning(#[from] PruningError),

    #[error("decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("scoring computation failed: {reason}")]
    ComputationFailed { reason: String },
}

impl ScoringError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        ScoringError::MissingInput {
            field: field.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ScoringError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<candle_core::Error> for ScoringError {
    fn from(err: candle_core::Error) -> Self {
        ScoringError::ComputationFailed {
            reason: err.to_string(),
        }
    }
}
