use candle_core::{D, DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use tracing::{debug, info};

use crate::config::Config;
use crate::consolidation::{GoldLabelConsolidator, GoldLabels, QuestionLabel, QuestionSlots};
use crate::pruning::{PrunedSpanSet, SpanPruner};
use crate::span::span_count;

use super::error::ScoringError;
use super::objective::{AnswerObjective, build_objective};
use super::types::{AnswerInput, GoldTargets, QuestionInput, ScorerOutput};

/// Encodes templated question slots into a fixed-size vector.
///
/// Supplied by the surrounding model; the scorer only checks that every slot
/// it declares is present before calling [`encode`](Self::encode).
pub trait QuestionEncoder: Send + Sync {
    fn slot_names(&self) -> &[String];

    fn output_dim(&self) -> usize;

    /// `predicate_embedding`: `[batch, encoder_dim]` → `[batch, output_dim]`.
    fn encode(
        &self,
        predicate_embedding: &Tensor,
        slots: &[QuestionSlots],
    ) -> candle_core::Result<Tensor>;
}

/// Scores every candidate answer span of a sentence against a question.
pub struct AnswerScorer {
    config: Config,
    encoder_dim: usize,
    question_dim: usize,
    pred_lin: Linear,
    question_lin: Linear,
    span_pred: Linear,
    objective: Box<dyn AnswerObjective>,
    question_encoder: Option<Box<dyn QuestionEncoder>>,
}

impl std::fmt::Debug for AnswerScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerScorer")
            .field("config", &self.config)
            .field("encoder_dim", &self.encoder_dim)
            .field("question_dim", &self.question_dim)
            .field("objective", &self.objective.kind())
            .field("has_question_encoder", &self.question_encoder.is_some())
            .finish()
    }
}

impl AnswerScorer {
    /// Validates `config` and registers all parameters under `vb`.
    ///
    /// `encoder_dim` is the width of the encoded tokens, `question_dim` the
    /// width of question embeddings.
    pub fn new(
        config: Config,
        encoder_dim: usize,
        question_dim: usize,
        vb: VarBuilder,
    ) -> Result<Self, ScoringError> {
        config.validate()?;

        let hidden = config.span_hidden_dim;
        let pred_lin = candle_nn::linear(encoder_dim, hidden, vb.pp("pred_lin"))?;
        let question_lin = candle_nn::linear(question_dim, hidden, vb.pp("question_lin"))?;
        let span_pred = candle_nn::linear(hidden, 1, vb.pp("span_pred"))?;
        let objective = build_objective(config.objective, hidden, vb.pp("objective"))?;

        info!(
            objective = %config.objective,
            policy = %config.span_selection_policy,
            span_hidden_dim = hidden,
            encoder_dim,
            question_dim,
            pruning_ratio = ?config.pruning_ratio,
            "Answer scorer initialized"
        );

        Ok(Self {
            config,
            encoder_dim,
            question_dim,
            pred_lin,
            question_lin,
            span_pred,
            objective,
            question_encoder: None,
        })
    }

    /// Attaches the encoder used for [`QuestionInput::Slots`].
    pub fn with_question_encoder(
        mut self,
        encoder: Box<dyn QuestionEncoder>,
    ) -> Result<Self, ScoringError> {
        if encoder.output_dim() != self.question_dim {
            return Err(ScoringError::invalid(format!(
                "question encoder produces {} dims, scorer expects {}",
                encoder.output_dim(),
                self.question_dim
            )));
        }
        self.question_encoder = Some(encoder);
        Ok(self)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn objective(&self) -> &dyn AnswerObjective {
        self.objective.as_ref()
    }

    /// Scores a batch; with `gold` the output also carries the loss.
    pub fn forward(
        &self,
        input: &AnswerInput,
        gold: Option<&[QuestionLabel]>,
    ) -> Result<ScorerOutput, ScoringError> {
        let predicate_index = input
            .predicate_index
            .as_deref()
            .ok_or_else(|| ScoringError::missing("predicate_index"))?;
        let question = input
            .question
            .as_ref()
            .ok_or_else(|| ScoringError::missing("question"))?;

        let (batch_size, seq_len) = self.check_shapes(input, predicate_index)?;

        let pred_embedding = Self::select_predicates(&input.encoded_text, predicate_index, seq_len)?;
        let question_embedding = self.embed_question(&pred_embedding, question, batch_size)?;

        let pred_hidden = self.pred_lin.forward(&pred_embedding)?.unsqueeze(1)?;
        let question_hidden = self.question_lin.forward(&question_embedding)?.unsqueeze(1)?;

        let consolidated_hidden = input
            .span_hidden
            .broadcast_add(&(pred_hidden + &question_hidden)?)?;
        let span_logits = self
            .span_pred
            .forward(&consolidated_hidden.relu()?)?
            .squeeze(D::Minus1)?;
        let dtype = span_logits.dtype();
        let span_mask = input.span_mask.gt(0.0)?.to_dtype(dtype)?;

        let (span_logits, span_mask, pruned) = match self.config.pruning_ratio {
            Some(ratio) => {
                let (logits, mask, pruned) = Self::prune(&span_logits, &span_mask, seq_len, ratio)?;
                (logits, mask, Some(pruned))
            }
            None => (span_logits, span_mask, None),
        };

        let prediction = self
            .objective
            .predict(&span_logits, &span_mask, &question_hidden)?;

        let loss = match gold {
            Some(labels) => {
                let targets = self.gold_targets(
                    labels,
                    batch_size,
                    seq_len,
                    pruned.as_deref(),
                    span_logits.device(),
                    span_logits.dtype(),
                )?;
                Some(
                    self.objective
                        .loss(&span_logits, &span_mask, &prediction, &targets)?,
                )
            }
            None => None,
        };

        debug!(
            batch_size,
            seq_len,
            slots = span_logits.dims()[1],
            pruned = pruned.is_some(),
            training = loss.is_some(),
            "Scored candidate spans"
        );

        Ok(ScorerOutput {
            span_logits,
            span_probs: prediction.span_probs,
            span_mask,
            invalidity_prob: prediction.invalidity_prob,
            pruned,
            seq_len,
            loss,
        })
    }

    /// Consolidates `labels` against a sentence of `seq_len` tokens.
    pub fn consolidate(
        &self,
        seq_len: usize,
        labels: &[QuestionLabel],
    ) -> Result<Vec<GoldLabels>, ScoringError> {
        let consolidator = GoldLabelConsolidator::new(self.config.span_selection_policy);
        labels
            .iter()
            .map(|label| {
                consolidator
                    .consolidate_question(seq_len, label)
                    .map_err(ScoringError::from)
            })
            .collect()
    }

    fn check_shapes(
        &self,
        input: &AnswerInput,
        predicate_index: &[usize],
    ) -> Result<(usize, usize), ScoringError> {
        let (batch_size, seq_len, encoder_dim) = input.encoded_text.dims3()?;
        let (span_batch, num_spans, span_dim) = input.span_hidden.dims3()?;
        let mask_dims = input.span_mask.dims2()?;

        if seq_len == 0 {
            return Err(ScoringError::invalid("empty sentence"));
        }
        if encoder_dim != self.encoder_dim {
            return Err(ScoringError::invalid(format!(
                "encoded text has {encoder_dim} dims, scorer expects {}",
                self.encoder_dim
            )));
        }
        if span_dim != self.config.span_hidden_dim {
            return Err(ScoringError::invalid(format!(
                "span hidden has {span_dim} dims, scorer expects {}",
                self.config.span_hidden_dim
            )));
        }
        if span_batch != batch_size || predicate_index.len() != batch_size {
            return Err(ScoringError::invalid(format!(
                "batch size mismatch: text {batch_size}, spans {span_batch}, predicates {}",
                predicate_index.len()
            )));
        }
        if num_spans != span_count(seq_len) {
            return Err(ScoringError::invalid(format!(
                "{num_spans} span vectors for sequence length {seq_len} (expected {})",
                span_count(seq_len)
            )));
        }
        if mask_dims != (batch_size, num_spans) {
            return Err(ScoringError::invalid(format!(
                "span mask shape {mask_dims:?}, expected ({batch_size}, {num_spans})"
            )));
        }

        Ok((batch_size, seq_len))
    }

    /// `[batch, encoder_dim]` rows of the encoded text at each predicate.
    fn select_predicates(
        encoded_text: &Tensor,
        predicate_index: &[usize],
        seq_len: usize,
    ) -> Result<Tensor, ScoringError> {
        let rows = predicate_index
            .iter()
            .enumerate()
            .map(|(b, &index)| {
                if index >= seq_len {
                    return Err(ScoringError::PredicateOutOfRange { index, seq_len });
                }
                Ok(encoded_text.i((b, index))?)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Tensor::stack(&rows, 0)?)
    }

    fn embed_question(
        &self,
        pred_embedding: &Tensor,
        question: &QuestionInput,
        batch_size: usize,
    ) -> Result<Tensor, ScoringError> {
        match question {
            QuestionInput::Encoded { embedding } => {
                let dims = embedding.dims2()?;
                if dims != (batch_size, self.question_dim) {
                    return Err(ScoringError::invalid(format!(
                        "question embedding shape {dims:?}, expected ({batch_size}, {})",
                        self.question_dim
                    )));
                }
                Ok(embedding.clone())
            }
            QuestionInput::Slots { slots } => {
                let encoder = self
                    .question_encoder
                    .as_deref()
                    .ok_or_else(|| ScoringError::missing("question_encoder"))?;
                if slots.len() != batch_size {
                    return Err(ScoringError::invalid(format!(
                        "{} question slot sets for a batch of {batch_size}",
                        slots.len()
                    )));
                }

                for (b, example) in slots.iter().enumerate() {
                    if let Some(name) = encoder
                        .slot_names()
                        .iter()
                        .find(|name| !example.contains_key(name.as_str()))
                    {
                        return Err(ScoringError::missing(format!(
                            "question slot '{name}' (example {b})"
                        )));
                    }
                }

                Ok(encoder.encode(pred_embedding, slots)?)
            }
        }
    }

    fn prune(
        span_logits: &Tensor,
        span_mask: &Tensor,
        seq_len: usize,
        ratio: f32,
    ) -> Result<(Tensor, Tensor, Vec<PrunedSpanSet>), ScoringError> {
        let scores = span_logits.to_dtype(DType::F32)?.to_vec2::<f32>()?;
        let masks: Vec<Vec<bool>> = span_mask
            .to_dtype(DType::F32)?
            .to_vec2::<f32>()?
            .into_iter()
            .map(|row| row.into_iter().map(|m| m > 0.0).collect())
            .collect();

        let pruner = SpanPruner::for_sequence(seq_len, ratio);
        let pruned = pruner.prune_batch(&scores, &masks)?;

        let shape = (pruned.len(), pruner.max_spans());
        let device = span_logits.device();
        let indices: Vec<u32> = pruned.iter().flat_map(PrunedSpanSet::indices_u32).collect();
        let mask: Vec<f32> = pruned.iter().flat_map(PrunedSpanSet::mask_f32).collect();

        let indices = Tensor::from_vec(indices, shape, device)?;
        let logits = span_logits.gather(&indices, 1)?;
        let mask = Tensor::from_vec(mask, shape, device)?.to_dtype(span_logits.dtype())?;

        Ok((logits, mask, pruned))
    }

    fn gold_targets(
        &self,
        labels: &[QuestionLabel],
        batch_size: usize,
        seq_len: usize,
        pruned: Option<&[PrunedSpanSet]>,
        device: &Device,
        dtype: DType,
    ) -> Result<GoldTargets, ScoringError> {
        if labels.len() != batch_size {
            return Err(ScoringError::invalid(format!(
                "{} question labels for a batch of {batch_size}",
                labels.len()
            )));
        }

        let gold = self.consolidate(seq_len, labels)?;

        let rows = match pruned {
            Some(pruned) => gold
                .iter()
                .zip(pruned)
                .map(|(g, p)| p.gather(g.labels(), 0.0))
                .collect::<Result<Vec<_>, _>>()?,
            None => gold.iter().map(|g| g.labels().to_vec()).collect(),
        };
        let width = rows.first().map_or(0, Vec::len);
        let span_labels =
            Tensor::from_vec(rows.concat(), (batch_size, width), device)?.to_dtype(dtype)?;

        let invalidity_rate: Vec<f32> = gold.iter().map(GoldLabels::invalidity_rate).collect();
        let invalidity: Vec<f32> = gold.iter().map(GoldLabels::invalidity).collect();

        Ok(GoldTargets {
            span_labels,
            invalidity_rate: Tensor::from_vec(invalidity_rate, batch_size, device)?
                .to_dtype(dtype)?,
            invalidity: Tensor::from_vec(invalidity, batch_size, device)?.to_dtype(dtype)?,
        })
    }
}
