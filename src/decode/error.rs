use thiserror::Error;

use crate::span::SpanError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("probability/mask length mismatch: {probs} probabilities, {mask} mask entries")]
    LengthMismatch { probs: usize, mask: usize },

    #[error(transparent)]
    Span(#[from] SpanError),
}
