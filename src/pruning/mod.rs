//! Top-K span pruning.
//!
//! A sentence of `n` tokens has `n(n+1)/2` candidate spans. [`SpanPruner`]
//! keeps the `K` best-scoring valid spans and records, per kept slot, which
//! span index it came from so labels and decoded answers can be mapped back.

pub mod error;


pub use error::PruningError;

use std::cmp::Ordering;

use tracing::debug;

use crate::constants::MASKED_SCORE;
use crate::span::span_count;

/// Number of slots to keep for a sentence of `seq_len` tokens.
///
/// `ceil(ratio * seq_len)`, capped at the number of spans.
pub fn pruning_width(seq_len: usize, ratio: f32) -> usize {
    let width = (ratio as f64 * seq_len as f64).ceil().max(0.0) as usize;
    width.min(span_count(seq_len))
}

/// The `K` slots kept for one sentence.
///
/// Present slots come first, ordered by descending score (ties by ascending
/// span index). Absent slots point at span index 0 and carry
/// [`MASKED_SCORE`]; consumers must check [`is_present`](Self::is_present).
#[derive(Debug, Clone, PartialEq)]
pub struct PrunedSpanSet {
    indices: Vec<usize>,
    scores: Vec<f32>,
    mask: Vec<bool>,
}

impl PrunedSpanSet {
    /// Number of slots (`K`), present or not.
    pub fn width(&self) -> usize {
        self.indices.len()
    }

    pub fn num_present(&self) -> usize {
        self.mask.iter().filter(|&&present| present).count()
    }

    /// Slot → original span index.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn is_present(&self, slot: usize) -> bool {
        self.mask.get(slot).copied().unwrap_or(false)
    }

    /// `(slot, span_index, score)` for every present slot.
    pub fn present(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.indices
            .iter()
            .zip(&self.scores)
            .zip(&self.mask)
            .enumerate()
            .filter(|(_, (_, present))| **present)
            .map(|(slot, ((&index, &score), _))| (slot, index, score))
    }

    /// Reads per-span values through the slot mapping; absent slots get `fill`.
    pub fn gather(&self, per_span: &[f32], fill: f32) -> Result<Vec<f32>, PruningError> {
        self.indices
            .iter()
            .zip(&self.mask)
            .map(|(&index, &present)| {
                if !present {
                    return Ok(fill);
                }
                per_span
                    .get(index)
                    .copied()
                    .ok_or(PruningError::IndexOutOfBounds {
                        index,
                        len: per_span.len(),
                    })
            })
            .collect()
    }

    /// Slot indices as `u32`, for tensor gathers.
    pub fn indices_u32(&self) -> Vec<u32> {
        self.indices.iter().map(|&i| i as u32).collect()
    }

    /// Mask as `0.0` / `1.0`.
    pub fn mask_f32(&self) -> Vec<f32> {
        self.mask.iter().map(|&m| f32::from(u8::from(m))).collect()
    }
}

/// Selects the `max_spans` highest-scoring valid spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanPruner {
    max_spans: usize,
}

impl SpanPruner {
    pub fn new(max_spans: usize) -> Self {
        Self { max_spans }
    }

    /// Pruner keeping `ceil(ratio * seq_len)` spans.
    pub fn for_sequence(seq_len: usize, ratio: f32) -> Self {
        Self::new(pruning_width(seq_len, ratio))
    }

    pub fn max_spans(&self) -> usize {
        self.max_spans
    }

    /// Prunes one sentence.
    ///
    /// A span is a candidate when its mask entry is set and its score is a
    /// number above `-inf`. Fewer candidates than `max_spans` leaves the
    /// trailing slots absent.
    pub fn prune(&self, scores: &[f32], mask: &[bool]) -> Result<PrunedSpanSet, PruningError> {
        if scores.len() != mask.len() {
            return Err(PruningError::LengthMismatch {
                scores: scores.len(),
                mask: mask.len(),
            });
        }

        let mut candidates: Vec<usize> = (0..scores.len())
            .filter(|&i| mask[i] && !scores[i].is_nan() && scores[i] > f32::NEG_INFINITY)
            .collect();

        candidates.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        candidates.truncate(self.max_spans);

        let kept = candidates.len();
        let absent = self.max_spans - kept;

        let scores_out = candidates
            .iter()
            .map(|&i| scores[i])
            .chain(std::iter::repeat_n(MASKED_SCORE, absent))
            .collect();
        let mask_out = std::iter::repeat_n(true, kept)
            .chain(std::iter::repeat_n(false, absent))
            .collect();
        candidates.extend(std::iter::repeat_n(0, absent));

        debug!(
            num_spans = scores.len(),
            max_spans = self.max_spans,
            kept,
            "Pruned candidate spans"
        );

        Ok(PrunedSpanSet {
            indices: candidates,
            scores: scores_out,
            mask: mask_out,
        })
    }

    /// Prunes every row of a batch independently.
    pub fn prune_batch(
        &self,
        scores: &[Vec<f32>],
        masks: &[Vec<bool>],
    ) -> Result<Vec<PrunedSpanSet>, PruningError> {
        if scores.len() != masks.len() {
            return Err(PruningError::BatchMismatch {
                scores: scores.len(),
                masks: masks.len(),
            });
        }
        scores
            .iter()
            .zip(masks)
            .map(|(row, mask)| self.prune(row, mask))
            .collect()
    }
}
