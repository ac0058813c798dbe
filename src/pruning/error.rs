use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PruningError {
    #[error("score/mask length mismatch: {scores} scores, {mask} mask entries")]
    LengthMismatch { scores: usize, mask: usize },

    #[error("batch size mismatch: {scores} score rows, {masks} mask rows")]
    BatchMismatch { scores: usize, masks: usize },

    #[error("pruned slot points at span {index}, but only {len} values were given")]
    IndexOutOfBounds { index: usize, len: usize },
}
