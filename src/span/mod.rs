//! Contiguous token spans and their dense triangular numbering.
//!
//! Every span `(start, end)` (inclusive) over a sequence of length `n` maps to
//! a unique index in `0..n(n+1)/2`. The canonical order enumerates spans by
//! start, then by end:
//!
//! ```text
//! n = 3:  (0,0)=0 (0,1)=1 (0,2)=2 (1,1)=3 (1,2)=4 (2,2)=5
//! ```
//!
//! Gold labels, pruned slots and decoded answers all address spans through
//! this numbering, so [`SpanIndex::to_index`] and [`SpanIndex::iter`] must
//! always agree.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::SpanError;

use std::fmt;

use serde::{Serialize, Serializer};

/// An inclusive token range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Creates a span, rejecting `start > end`.
    pub fn new(start: usize, end: usize) -> Result<Self, SpanError> {
        if start > end {
            return Err(SpanError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// Converts a half-open `[begin, end_exclusive)` pair to an inclusive span.
    pub fn from_exclusive(begin: i64, end_exclusive: i64) -> Result<Self, SpanError> {
        if begin < 0 || end_exclusive <= begin {
            return Err(SpanError::Malformed {
                begin,
                end_exclusive,
            });
        }
        Ok(Self {
            start: begin as usize,
            end: (end_exclusive - 1) as usize,
        })
    }

    /// Returns `(begin, end_exclusive)`.
    pub fn to_exclusive(self) -> (usize, usize) {
        (self.start, self.end + 1)
    }

    /// Number of tokens covered (at least one).
    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Serializes as an inclusive `[start, end]` pair.
impl Serialize for Span {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.start, self.end).serialize(serializer)
    }
}

/// Number of spans over a sequence of length `seq_len`.
pub const fn span_count(seq_len: usize) -> usize {
    seq_len * (seq_len + 1) / 2
}

/// Recovers `n` from `n(n+1)/2`; fails if `count` is not triangular.
pub fn sequence_len_for_span_count(count: usize) -> Result<usize, SpanError> {
    let estimate = ((((8 * count + 1) as f64).sqrt() - 1.0) / 2.0).round() as usize;
    // float rounding can land one off for large counts
    (estimate.saturating_sub(1)..=estimate + 1)
        .find(|&n| span_count(n) == count)
        .ok_or(SpanError::NotTriangular { count })
}

/// Bijection between the spans of a fixed-length sequence and `0..count()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanIndex {
    seq_len: usize,
}

impl SpanIndex {
    pub fn new(seq_len: usize) -> Self {
        Self { seq_len }
    }

    /// Builds the index for a dense per-span vector of `count` entries.
    pub fn for_span_count(count: usize) -> Result<Self, SpanError> {
        sequence_len_for_span_count(count).map(Self::new)
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn count(&self) -> usize {
        span_count(self.seq_len)
    }

    /// Closed-form index: spans starting before `start`, plus the offset of `end`.
    pub fn to_index(&self, span: Span) -> Result<usize, SpanError> {
        let Span { start, end } = span;
        let n = self.seq_len;
        if start > end || end >= n {
            return Err(SpanError::OutOfRange {
                start,
                end,
                seq_len: n,
            });
        }
        Ok(Self::offset(start, n) + (end - start))
    }

    /// Inverse of [`to_index`](Self::to_index).
    pub fn from_index(&self, index: usize) -> Result<Span, SpanError> {
        let n = self.seq_len;
        if index >= self.count() {
            return Err(SpanError::IndexOutOfRange {
                index,
                seq_len: n,
                count: self.count(),
            });
        }

        // largest start whose first index is <= index
        let (mut lo, mut hi) = (0usize, n);
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if Self::offset(mid, n) <= index {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        Ok(Span {
            start: lo,
            end: lo + (index - Self::offset(lo, n)),
        })
    }

    /// All spans in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Span> + use<> {
        let n = self.seq_len;
        (0..n).flat_map(move |start| (start..n).map(move |end| Span { start, end }))
    }

    /// Spans paired with their index, in canonical order.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, Span)> + use<> {
        self.iter().enumerate()
    }

    // s*n - s(s-1)/2, written to stay in unsigned arithmetic at s = 0
    fn offset(start: usize, n: usize) -> usize {
        start * (2 * n + 1 - start) / 2
    }
}

/// Enumerates all spans of a sequence of length `seq_len` in canonical order.
pub fn enumerate_spans(seq_len: usize) -> Vec<Span> {
    SpanIndex::new(seq_len).iter().collect()
}
