//! Turning per-span probabilities back into spans.
//!
//! Output lists every present span in span-enumeration order, unsorted and
//! unfiltered. Ranking and thresholding belong to the consumer.

pub mod error;


pub use error::DecodeError;

use serde::Serialize;

use crate::consolidation::QuestionLabel;
use crate::pruning::PrunedSpanSet;
use crate::span::{Span, SpanIndex};

/// A span with its answer probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredSpan {
    pub span: Span,
    pub probability: f32,
}

impl ScoredSpan {
    pub fn new(span: Span, probability: f32) -> Self {
        Self { span, probability }
    }
}

/// Decoded answers for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPrediction {
    pub spans: Vec<ScoredSpan>,
    pub invalidity: f32,
}

impl AnswerPrediction {
    /// Spans sorted by descending probability.
    pub fn ranked(&self) -> Vec<ScoredSpan> {
        let mut ranked = self.spans.clone();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        ranked
    }
}

/// Decodes a dense per-span vector over all `n(n+1)/2` spans.
///
/// The sequence length is recovered from `probs.len()`.
pub fn decode_spans(probs: &[f32], mask: &[bool]) -> Result<Vec<ScoredSpan>, DecodeError> {
    if probs.len() != mask.len() {
        return Err(DecodeError::LengthMismatch {
            probs: probs.len(),
            mask: mask.len(),
        });
    }

    let index = SpanIndex::for_span_count(probs.len())?;
    Ok(index
        .iter()
        .zip(probs.iter().zip(mask))
        .filter(|(_, (_, present))| **present)
        .map(|(span, (&probability, _))| ScoredSpan::new(span, probability))
        .collect())
}

/// Decodes per-slot probabilities of a pruned set over a sentence of `seq_len` tokens.
///
/// Absent slots are skipped; the result is re-ordered by span index.
pub fn decode_pruned(
    probs: &[f32],
    pruned: &PrunedSpanSet,
    seq_len: usize,
) -> Result<Vec<ScoredSpan>, DecodeError> {
    if probs.len() != pruned.width() {
        return Err(DecodeError::LengthMismatch {
            probs: probs.len(),
            mask: pruned.width(),
        });
    }

    let index = SpanIndex::new(seq_len);
    let mut present: Vec<(usize, f32)> = pruned
        .present()
        .map(|(slot, span_index, _)| (span_index, probs[slot]))
        .collect();
    present.sort_by_key(|&(span_index, _)| span_index);

    present
        .into_iter()
        .map(|(span_index, probability)| {
            Ok(ScoredSpan::new(index.from_index(span_index)?, probability))
        })
        .collect()
}

/// Aggregate answer metric fed with decoded predictions.
///
/// Implemented outside this crate (e.g. F1 at several thresholds); the scorer
/// only hands data over.
pub trait AnswerMetric {
    fn observe(
        &mut self,
        spans: &[ScoredSpan],
        question: &QuestionLabel,
        invalidity: f32,
        num_invalids: usize,
        num_answers: usize,
    );
}
