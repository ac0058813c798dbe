//! Training objectives.
//!
//! The objective is picked once when the scorer is built. Both produce span
//! and invalidity probabilities so decoding does not care which one ran.

use candle_core::{D, DType, Tensor};
use candle_nn::{Init, Linear, Module, VarBuilder};
use tracing::debug;

use crate::config::Objective;
use crate::constants::{MASKED_SCORE, NO_ANSWER_SCORE};

use super::error::ScoringError;
use super::loss::{binary_cross_entropy_with_logits_sum, log_sum_exp};
use super::types::{GoldTargets, ObjectivePrediction};

pub trait AnswerObjective: std::fmt::Debug + Send + Sync {
    fn kind(&self) -> Objective;

    /// `span_logits`/`span_mask`: `[batch, slots]`; `question_hidden`: `[batch, 1, hidden]`.
    fn predict(
        &self,
        span_logits: &Tensor,
        span_mask: &Tensor,
        question_hidden: &Tensor,
    ) -> Result<ObjectivePrediction, ScoringError>;

    /// Summed loss over the batch.
    fn loss(
        &self,
        span_logits: &Tensor,
        span_mask: &Tensor,
        prediction: &ObjectivePrediction,
        gold: &GoldTargets,
    ) -> Result<Tensor, ScoringError>;
}

/// Builds the objective selected by `kind`, registering its parameters under `vb`.
pub fn build_objective(
    kind: Objective,
    span_hidden_dim: usize,
    vb: VarBuilder,
) -> Result<Box<dyn AnswerObjective>, ScoringError> {
    Ok(match kind {
        Objective::Binary => Box::new(BinaryObjective::new(span_hidden_dim, vb)?),
        Objective::Multinomial => Box::new(MultinomialObjective),
    })
}

/// Independent per-span sigmoid plus a question-level invalidity classifier.
#[derive(Debug, Clone)]
pub struct BinaryObjective {
    invalid_embedding: Tensor,
    invalid_pred: Linear,
}

impl BinaryObjective {
    pub fn new(span_hidden_dim: usize, vb: VarBuilder) -> Result<Self, ScoringError> {
        let invalid_embedding = vb.get_with_hints(
            span_hidden_dim,
            "invalid_embedding",
            Init::Randn {
                mean: 0.0,
                stdev: 1.0,
            },
        )?;
        let invalid_pred = candle_nn::linear(span_hidden_dim, 1, vb.pp("invalid_pred"))?;

        Ok(Self {
            invalid_embedding,
            invalid_pred,
        })
    }
}

impl AnswerObjective for BinaryObjective {
    fn kind(&self) -> Objective {
        Objective::Binary
    }

    fn predict(
        &self,
        span_logits: &Tensor,
        span_mask: &Tensor,
        question_hidden: &Tensor,
    ) -> Result<ObjectivePrediction, ScoringError> {
        let span_probs = (candle_nn::ops::sigmoid(span_logits)? * span_mask)?;

        let invalid_hidden = question_hidden
            .broadcast_add(&self.invalid_embedding)?
            .relu()?;
        let invalidity_logit = self.invalid_pred.forward(&invalid_hidden)?.flatten_all()?;
        let invalidity_prob = candle_nn::ops::sigmoid(&invalidity_logit)?;

        Ok(ObjectivePrediction {
            span_probs,
            invalidity_prob,
            invalidity_logit: Some(invalidity_logit),
        })
    }

    fn loss(
        &self,
        span_logits: &Tensor,
        span_mask: &Tensor,
        prediction: &ObjectivePrediction,
        gold: &GoldTargets,
    ) -> Result<Tensor, ScoringError> {
        let invalidity_logit = prediction.invalidity_logit.as_ref().ok_or_else(|| {
            ScoringError::ComputationFailed {
                reason: "binary prediction carries no invalidity logit".to_string(),
            }
        })?;

        let span_loss =
            binary_cross_entropy_with_logits_sum(span_logits, &gold.span_labels, Some(span_mask))?;
        let invalidity_loss =
            binary_cross_entropy_with_logits_sum(invalidity_logit, &gold.invalidity_rate, None)?;

        Ok((span_loss + invalidity_loss)?)
    }
}

/// One softmax over a fixed "no answer" score and every present span.
///
/// The loss is the negative log of the total probability of all correct
/// options (marginal likelihood), not single-label cross-entropy.
#[derive(Debug, Clone, Copy)]
pub struct MultinomialObjective;

impl MultinomialObjective {
    /// `[batch, 1 + slots]`: the dummy score followed by span logits, masked slots at [`MASKED_SCORE`].
    fn scores_with_dummy(span_logits: &Tensor, span_mask: &Tensor) -> Result<Tensor, ScoringError> {
        let (batch_size, slots) = span_logits.dims2()?;
        let device = span_logits.device();
        let dtype = span_logits.dtype();

        let floor = Tensor::full(MASKED_SCORE, (batch_size, slots), device)?.to_dtype(dtype)?;
        let masked = span_mask.gt(0.0)?.where_cond(span_logits, &floor)?;
        let dummy = Tensor::full(NO_ANSWER_SCORE, (batch_size, 1), device)?.to_dtype(dtype)?;

        Ok(Tensor::cat(&[&dummy, &masked], 1)?)
    }
}

impl AnswerObjective for MultinomialObjective {
    fn kind(&self) -> Objective {
        Objective::Multinomial
    }

    fn predict(
        &self,
        span_logits: &Tensor,
        span_mask: &Tensor,
        _question_hidden: &Tensor,
    ) -> Result<ObjectivePrediction, ScoringError> {
        let (_, slots) = span_logits.dims2()?;
        let scores = Self::scores_with_dummy(span_logits, span_mask)?;
        let probs = candle_nn::ops::softmax(&scores, D::Minus1)?;

        let invalidity_prob = probs.narrow(1, 0, 1)?.squeeze(1)?;
        let span_probs = (probs.narrow(1, 1, slots)? * span_mask)?;

        Ok(ObjectivePrediction {
            span_probs,
            invalidity_prob,
            invalidity_logit: None,
        })
    }

    fn loss(
        &self,
        span_logits: &Tensor,
        span_mask: &Tensor,
        _prediction: &ObjectivePrediction,
        gold: &GoldTargets,
    ) -> Result<Tensor, ScoringError> {
        let (batch_size, slots) = span_logits.dims2()?;
        let device = span_logits.device();

        let scores = Self::scores_with_dummy(span_logits, span_mask)?;
        let log_probs = candle_nn::ops::log_softmax(&scores, D::Minus1)?;

        let present_labels = (&gold.span_labels * span_mask)?;
        let has_answer = present_labels
            .max_keepdim(D::Minus1)?
            .gt(0.0)?
            .to_dtype(span_logits.dtype())?;
        let no_answer = has_answer.affine(-1.0, 1.0)?;

        // Degenerate rows (no present gold span, not judged invalid) put all
        // target mass on the dummy.
        let degenerate = no_answer.sum_all()?.to_dtype(DType::F32)?.to_scalar::<f32>()?;
        if degenerate > 0.0 {
            debug!(
                rows = degenerate,
                batch_size, "No-answer dummy absorbs questions without a gold span"
            );
        }

        let dummy_target = gold.invalidity.unsqueeze(1)?.maximum(&no_answer)?;
        let targets = Tensor::cat(&[&dummy_target, &present_labels], 1)?;

        let floor = Tensor::full(MASKED_SCORE, (batch_size, slots + 1), device)?
            .to_dtype(log_probs.dtype())?;
        let correct_log_probs = targets.gt(0.0)?.where_cond(&log_probs, &floor)?;

        Ok(log_sum_exp(&correct_log_probs, D::Minus1)?.sum_all()?.neg()?)
    }
}
