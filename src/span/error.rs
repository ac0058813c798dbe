use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("span ({start}, {end}) out of range for sequence length {seq_len}")]
    OutOfRange {
        start: usize,
        end: usize,
        seq_len: usize,
    },

    #[error("span start {start} is after end {end}")]
    Reversed { start: usize, end: usize },

    #[error("span index {index} out of range (sequence length {seq_len} has {count} spans)")]
    IndexOutOfRange {
        index: usize,
        seq_len: usize,
        count: usize,
    },

    #[error("{count} is not a triangular span count")]
    NotTriangular { count: usize },

    #[error("malformed span [{begin}, {end_exclusive}): end must be greater than begin")]
    Malformed { begin: i64, end_exclusive: i64 },
}
