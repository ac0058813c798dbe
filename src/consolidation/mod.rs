//! Gold label consolidation.
//!
//! Several annotators answer each question. Each either marks the question
//! invalid or submits one or more spans. [`GoldLabelConsolidator`] folds all
//! judgments for a question into one label per span index under a
//! [`SelectionPolicy`]:
//!
//! | policy | span label | invalidity decision |
//! | --- | --- | --- |
//! | `union` | `count > 0` | `invalids >= 1` |
//! | `majority` | `count / A >= 0.5` | `invalids >= A / 2` |
//! | `weighted` | `min(count / A, 1)` | `invalids / A` |
//!
//! where `A` counts every judgment, valid or not. Repeated spans (within or
//! across annotators) each add one to the count.

pub mod error;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::ConsolidationError;
pub use types::{AnswerJudgment, QuestionLabel, QuestionSlots};

use tracing::debug;

use crate::config::SelectionPolicy;
use crate::constants::MAJORITY_FRACTION;
use crate::span::{Span, SpanIndex};

/// Consolidated targets for one question over a sentence of fixed length.
#[derive(Debug, Clone, PartialEq)]
pub struct GoldLabels {
    policy: SelectionPolicy,
    seq_len: usize,
    labels: Vec<f32>,
    num_invalids: usize,
    num_answers: usize,
}

impl GoldLabels {
    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Dense label vector in span-index order.
    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    /// Label of a single span; out-of-range spans are an error.
    pub fn label(&self, span: Span) -> Result<f32, ConsolidationError> {
        let index = SpanIndex::new(self.seq_len).to_index(span)?;
        Ok(self.labels[index])
    }

    /// Spans with a non-zero label, in span-index order.
    pub fn positive_spans(&self) -> impl Iterator<Item = (Span, f32)> + '_ {
        SpanIndex::new(self.seq_len)
            .iter()
            .zip(self.labels.iter().copied())
            .filter(|(_, label)| *label > 0.0)
    }

    pub fn has_positive_span(&self) -> bool {
        self.labels.iter().any(|&label| label > 0.0)
    }

    pub fn num_invalids(&self) -> usize {
        self.num_invalids
    }

    pub fn num_answers(&self) -> usize {
        self.num_answers
    }

    /// Fraction of judgments that marked the question invalid.
    pub fn invalidity_rate(&self) -> f32 {
        self.num_invalids as f32 / self.num_answers as f32
    }

    /// Aggregate invalidity under the configured policy.
    ///
    /// `weighted` yields the rate; `union` and `majority` yield 0.0 or 1.0.
    pub fn invalidity(&self) -> f32 {
        match self.policy {
            SelectionPolicy::Weighted => self.invalidity_rate(),
            SelectionPolicy::Union | SelectionPolicy::Majority => {
                if self.is_invalid() {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Thresholded invalidity decision. For `weighted` this applies the
    /// majority rule to the rate.
    pub fn is_invalid(&self) -> bool {
        match self.policy {
            SelectionPolicy::Union => self.num_invalids >= 1,
            SelectionPolicy::Majority | SelectionPolicy::Weighted => {
                self.invalidity_rate() >= MAJORITY_FRACTION
            }
        }
    }
}

/// Folds annotator judgments into [`GoldLabels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoldLabelConsolidator {
    policy: SelectionPolicy,
}

impl GoldLabelConsolidator {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn consolidate(
        &self,
        seq_len: usize,
        judgments: &[AnswerJudgment],
    ) -> Result<GoldLabels, ConsolidationError> {
        if judgments.is_empty() {
            return Err(ConsolidationError::NoJudgments);
        }

        let index = SpanIndex::new(seq_len);
        let counts = judgments
            .iter()
            .flat_map(AnswerJudgment::counted_spans)
            .try_fold(vec![0u32; index.count()], |mut counts, span| {
                counts[index.to_index(*span)?] += 1;
                Ok::<_, ConsolidationError>(counts)
            })?;

        let num_answers = judgments.len();
        let num_invalids = judgments.iter().filter(|j| !j.is_valid).count();
        let labels = counts
            .into_iter()
            .map(|count| self.label_for(count, num_answers))
            .collect();

        let gold = GoldLabels {
            policy: self.policy,
            seq_len,
            labels,
            num_invalids,
            num_answers,
        };

        debug!(
            policy = %self.policy,
            seq_len,
            num_answers,
            num_invalids,
            positive = gold.positive_spans().count(),
            "Consolidated answer judgments"
        );

        Ok(gold)
    }

    /// Consolidates the judgments carried by a raw question label.
    pub fn consolidate_question(
        &self,
        seq_len: usize,
        question: &QuestionLabel,
    ) -> Result<GoldLabels, ConsolidationError> {
        self.consolidate(seq_len, &question.answer_judgments)
    }

    fn label_for(&self, count: u32, num_answers: usize) -> f32 {
        let fraction = count as f32 / num_answers as f32;
        match self.policy {
            SelectionPolicy::Union => f32::from(u8::from(count > 0)),
            SelectionPolicy::Majority => f32::from(u8::from(fraction >= MAJORITY_FRACTION)),
            // a single annotator may repeat a span
            SelectionPolicy::Weighted => fraction.min(1.0),
        }
    }
}
