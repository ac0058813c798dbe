use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::span::{Span, SpanError};

/// Slot name → slot value for one templated question.
pub type QuestionSlots = BTreeMap<String, String>;

/// One annotator's answer to a question.
///
/// Spans are stored inclusive. The serialized form follows the QA-SRL
/// convention of half-open `[begin, end)` pairs and is normalized on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAnswerJudgment", into = "RawAnswerJudgment")]
pub struct AnswerJudgment {
    pub source_id: Option<String>,
    pub is_valid: bool,
    pub spans: Vec<Span>,
}

impl AnswerJudgment {
    pub fn valid(spans: Vec<Span>) -> Self {
        Self {
            source_id: None,
            is_valid: true,
            spans,
        }
    }

    pub fn invalid() -> Self {
        Self {
            source_id: None,
            is_valid: false,
            spans: Vec::new(),
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Spans that count toward consolidation (none for an invalid judgment).
    pub fn counted_spans(&self) -> &[Span] {
        if self.is_valid { &self.spans } else { &[] }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnswerJudgment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_id: Option<String>,
    is_valid: bool,
    #[serde(default)]
    spans: Vec<(i64, i64)>,
}

impl TryFrom<RawAnswerJudgment> for AnswerJudgment {
    type Error = SpanError;

    fn try_from(raw: RawAnswerJudgment) -> Result<Self, Self::Error> {
        let spans = raw
            .spans
            .into_iter()
            .map(|(begin, end)| Span::from_exclusive(begin, end))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source_id: raw.source_id,
            is_valid: raw.is_valid,
            spans,
        })
    }
}

impl From<AnswerJudgment> for RawAnswerJudgment {
    fn from(judgment: AnswerJudgment) -> Self {
        Self {
            source_id: judgment.source_id,
            is_valid: judgment.is_valid,
            spans: judgment
                .spans
                .into_iter()
                .map(|span| {
                    let (begin, end) = span.to_exclusive();
                    (begin as i64, end as i64)
                })
                .collect(),
        }
    }
}

/// A question about one predicate together with every judgment it received.
///
/// This is the raw record handed through to answer metrics untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionLabel {
    #[serde(default)]
    pub question_string: String,
    #[serde(default)]
    pub question_slots: QuestionSlots,
    #[serde(default)]
    pub answer_judgments: Vec<AnswerJudgment>,
}

impl QuestionLabel {
    pub fn new(question_string: impl Into<String>, answer_judgments: Vec<AnswerJudgment>) -> Self {
        Self {
            question_string: question_string.into(),
            question_slots: QuestionSlots::new(),
            answer_judgments,
        }
    }

    pub fn with_slots(mut self, question_slots: QuestionSlots) -> Self {
        self.question_slots = question_slots;
        self
    }

    /// Total judgments, valid and invalid.
    pub fn num_answers(&self) -> usize {
        self.answer_judgments.len()
    }

    pub fn num_invalids(&self) -> usize {
        self.answer_judgments.iter().filter(|j| !j.is_valid).count()
    }
}
