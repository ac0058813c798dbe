use candle_core::{DType, Tensor};

use crate::consolidation::{QuestionLabel, QuestionSlots};
use crate::decode::{AnswerMetric, AnswerPrediction, decode_pruned, decode_spans};
use crate::pruning::PrunedSpanSet;

use super::error::ScoringError;

/// How the question reaches the scorer.
#[derive(Debug, Clone)]
pub enum QuestionInput {
    /// Templated slot values, encoded by the scorer's [`QuestionEncoder`](super::QuestionEncoder).
    Slots { slots: Vec<QuestionSlots> },
    /// A question embedding of shape `[batch, question_dim]`.
    Encoded { embedding: Tensor },
}

impl QuestionInput {
    /// Slot input taken from each label's `questionSlots`.
    pub fn from_labels(labels: &[QuestionLabel]) -> Self {
        QuestionInput::Slots {
            slots: labels.iter().map(|l| l.question_slots.clone()).collect(),
        }
    }
}

/// Per-batch features supplied by the encoder.
///
/// Shapes (with `S = n(n+1)/2` for padded length `n`):
/// - `encoded_text`: `[batch, n, encoder_dim]`
/// - `span_hidden`: `[batch, S, span_hidden_dim]`
/// - `span_mask`: `[batch, S]`, non-zero for spans that may be scored; any
///   non-zero value counts as fully present
#[derive(Debug, Clone)]
pub struct AnswerInput {
    pub encoded_text: Tensor,
    pub span_hidden: Tensor,
    pub span_mask: Tensor,
    pub predicate_index: Option<Vec<usize>>,
    pub question: Option<QuestionInput>,
}

impl AnswerInput {
    pub fn new(encoded_text: Tensor, span_hidden: Tensor, span_mask: Tensor) -> Self {
        Self {
            encoded_text,
            span_hidden,
            span_mask,
            predicate_index: None,
            question: None,
        }
    }

    pub fn with_predicate_index(mut self, predicate_index: Vec<usize>) -> Self {
        self.predicate_index = Some(predicate_index);
        self
    }

    pub fn with_question(mut self, question: QuestionInput) -> Self {
        self.question = Some(question);
        self
    }
}

/// Objective output before any loss is taken.
#[derive(Debug, Clone)]
pub struct ObjectivePrediction {
    /// `[batch, slots]`, zero on masked slots.
    pub span_probs: Tensor,
    /// `[batch]`
    pub invalidity_prob: Tensor,
    /// `[batch]`, only for objectives with a separate invalidity classifier.
    pub invalidity_logit: Option<Tensor>,
}

/// Consolidated targets aligned with the scored slots.
#[derive(Debug, Clone)]
pub struct GoldTargets {
    /// `[batch, slots]`, gathered through the pruning map when pruning is on.
    pub span_labels: Tensor,
    /// `[batch]`, invalid judgments / all judgments.
    pub invalidity_rate: Tensor,
    /// `[batch]`, policy-level invalidity (see [`GoldLabels::invalidity`](crate::consolidation::GoldLabels::invalidity)).
    pub invalidity: Tensor,
}

/// Everything one forward pass produces.
#[derive(Debug, Clone)]
pub struct ScorerOutput {
    /// `[batch, slots]`
    pub span_logits: Tensor,
    /// `[batch, slots]`, probabilities under the configured objective.
    pub span_probs: Tensor,
    /// `[batch, slots]`, `1.0` for present slots and `0.0` elsewhere.
    pub span_mask: Tensor,
    /// `[batch]`
    pub invalidity_prob: Tensor,
    /// Slot → span mapping per example when pruning is on.
    pub pruned: Option<Vec<PrunedSpanSet>>,
    /// Padded sentence length the spans were enumerated over.
    pub seq_len: usize,
    /// Scalar loss, present when gold labels were given.
    pub loss: Option<Tensor>,
}

impl ScorerOutput {
    pub fn batch_size(&self) -> usize {
        self.span_probs.dims().first().copied().unwrap_or(0)
    }

    pub fn loss_value(&self) -> Result<Option<f32>, ScoringError> {
        self.loss
            .as_ref()
            .map(|loss| {
                loss.to_dtype(DType::F32)
                    .and_then(|loss| loss.to_scalar::<f32>())
                    .map_err(ScoringError::from)
            })
            .transpose()
    }

    /// Present spans with probabilities, per example, in span order.
    pub fn decode(&self) -> Result<Vec<AnswerPrediction>, ScoringError> {
        let probs = self.span_probs.to_dtype(DType::F32)?.to_vec2::<f32>()?;
        let masks = self.span_mask.to_dtype(DType::F32)?.to_vec2::<f32>()?;
        let invalidity = self.invalidity_prob.to_dtype(DType::F32)?.to_vec1::<f32>()?;

        probs
            .iter()
            .zip(&masks)
            .zip(invalidity)
            .enumerate()
            .map(|(b, ((row, mask), invalidity))| {
                let spans = match &self.pruned {
                    Some(pruned) => decode_pruned(row, &pruned[b], self.seq_len)?,
                    None => {
                        let mask: Vec<bool> = mask.iter().map(|&m| m > 0.0).collect();
                        decode_spans(row, &mask)?
                    }
                };
                Ok(AnswerPrediction { spans, invalidity })
            })
            .collect()
    }

    /// Decodes and hands each example to `metric` with its raw question label.
    pub fn report(
        &self,
        labels: &[QuestionLabel],
        metric: &mut dyn AnswerMetric,
    ) -> Result<(), ScoringError> {
        let predictions = self.decode()?;
        if predictions.len() != labels.len() {
            return Err(ScoringError::invalid(format!(
                "{} question labels for a batch of {}",
                labels.len(),
                predictions.len()
            )));
        }

        for (prediction, label) in predictions.iter().zip(labels) {
            metric.observe(
                &prediction.spans,
                label,
                prediction.invalidity,
                label.num_invalids(),
                label.num_answers(),
            );
        }
        Ok(())
    }
}
