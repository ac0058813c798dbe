use super::*;
use crate::span::{SpanError, span_count};

const EPS: f32 = 1e-6;

fn span(start: usize, end: usize) -> Span {
    Span { start, end }
}

/// Two valid judgments ([1,2] and [1,2],[3,3]) and one invalid judgment.
fn scenario_judgments() -> Vec<AnswerJudgment> {
    vec![
        AnswerJudgment::valid(vec![span(1, 2)]),
        AnswerJudgment::valid(vec![span(1, 2), span(3, 3)]),
        AnswerJudgment::invalid(),
    ]
}

fn consolidate(policy: SelectionPolicy, judgments: &[AnswerJudgment]) -> GoldLabels {
    GoldLabelConsolidator::new(policy)
        .consolidate(5, judgments)
        .expect("consolidation should succeed")
}

#[test]
fn test_union_scenario() {
    let gold = consolidate(SelectionPolicy::Union, &scenario_judgments());

    assert_eq!(gold.labels().len(), span_count(5));
    assert_eq!(gold.label(span(1, 2)).unwrap(), 1.0);
    assert_eq!(gold.label(span(3, 3)).unwrap(), 1.0);
    assert_eq!(gold.positive_spans().count(), 2);
    assert!((gold.invalidity_rate() - 1.0 / 3.0).abs() < EPS);
    assert!(gold.is_invalid());
    assert_eq!(gold.invalidity(), 1.0);
}

#[test]
fn test_majority_scenario() {
    let gold = consolidate(SelectionPolicy::Majority, &scenario_judgments());

    assert_eq!(gold.label(span(1, 2)).unwrap(), 1.0);
    assert_eq!(gold.label(span(3, 3)).unwrap(), 0.0);
    assert!(!gold.is_invalid());
    assert_eq!(gold.invalidity(), 0.0);
}

#[test]
fn test_weighted_scenario() {
    let gold = consolidate(SelectionPolicy::Weighted, &scenario_judgments());

    assert!((gold.label(span(1, 2)).unwrap() - 2.0 / 3.0).abs() < EPS);
    assert!((gold.label(span(3, 3)).unwrap() - 1.0 / 3.0).abs() < EPS);
    assert!((gold.invalidity() - 1.0 / 3.0).abs() < EPS);
    assert_eq!(gold.num_answers(), 3);
    assert_eq!(gold.num_invalids(), 1);
}

#[test]
fn test_majority_exact_half_is_positive() {
    let judgments = vec![
        AnswerJudgment::valid(vec![span(0, 1)]),
        AnswerJudgment::valid(vec![span(2, 2)]),
        AnswerJudgment::invalid(),
        AnswerJudgment::invalid(),
    ];
    let gold = consolidate(SelectionPolicy::Majority, &judgments);

    assert_eq!(gold.label(span(0, 1)).unwrap(), 0.0);
    assert!(gold.is_invalid(), "2 of 4 invalid reaches the majority");
}

#[test]
fn test_union_repeated_span_is_stable() {
    let base = scenario_judgments();
    let before = consolidate(SelectionPolicy::Union, &base);

    let mut extended = base.clone();
    extended.push(AnswerJudgment::valid(vec![span(1, 2)]));
    let after = consolidate(SelectionPolicy::Union, &extended);

    assert_eq!(before.labels(), after.labels());
}

#[test]
fn test_weighted_count_increase_never_decreases_label() {
    // hold A = 3 fixed while moving one judgment's answer onto [3,3]
    let before = consolidate(SelectionPolicy::Weighted, &scenario_judgments());

    let judgments = vec![
        AnswerJudgment::valid(vec![span(1, 2), span(3, 3)]),
        AnswerJudgment::valid(vec![span(1, 2), span(3, 3)]),
        AnswerJudgment::invalid(),
    ];
    let after = consolidate(SelectionPolicy::Weighted, &judgments);

    for (b, a) in before.labels().iter().zip(after.labels()) {
        assert!(a >= b);
    }
    assert!(after.label(span(3, 3)).unwrap() > before.label(span(3, 3)).unwrap());
}

#[test]
fn test_labels_within_bounds() {
    let judgments = vec![
        AnswerJudgment::valid(vec![span(0, 0), span(0, 0), span(0, 0)]),
        AnswerJudgment::valid(vec![span(0, 4)]),
    ];

    for policy in [
        SelectionPolicy::Union,
        SelectionPolicy::Majority,
        SelectionPolicy::Weighted,
    ] {
        let gold = consolidate(policy, &judgments);
        for &label in gold.labels() {
            assert!((0.0..=1.0).contains(&label), "{policy}: {label}");
            if policy.is_discrete() {
                assert!(label == 0.0 || label == 1.0);
            }
        }
    }

    let weighted = consolidate(SelectionPolicy::Weighted, &judgments);
    assert_eq!(weighted.label(span(0, 0)).unwrap(), 1.0);
}

#[test]
fn test_invalid_judgment_spans_are_ignored() {
    let mut invalid = AnswerJudgment::invalid();
    invalid.spans.push(span(4, 4));
    let judgments = vec![AnswerJudgment::valid(vec![span(0, 0)]), invalid];

    let gold = consolidate(SelectionPolicy::Union, &judgments);
    assert_eq!(gold.label(span(4, 4)).unwrap(), 0.0);
}

#[test]
fn test_all_invalid() {
    let judgments = vec![AnswerJudgment::invalid(), AnswerJudgment::invalid()];

    let gold = consolidate(SelectionPolicy::Majority, &judgments);
    assert!(!gold.has_positive_span());
    assert_eq!(gold.invalidity_rate(), 1.0);
    assert!(gold.is_invalid());
}

#[test]
fn test_no_judgments_is_an_error() {
    let err = GoldLabelConsolidator::new(SelectionPolicy::Union)
        .consolidate(5, &[])
        .unwrap_err();
    assert_eq!(err, ConsolidationError::NoJudgments);
}

#[test]
fn test_span_outside_sentence_is_an_error() {
    let judgments = vec![AnswerJudgment::valid(vec![span(2, 5)])];
    let err = GoldLabelConsolidator::new(SelectionPolicy::Union)
        .consolidate(5, &judgments)
        .unwrap_err();

    assert_eq!(
        err,
        ConsolidationError::Span(SpanError::OutOfRange {
            start: 2,
            end: 5,
            seq_len: 5
        })
    );
}

#[test]
fn test_consolidation_is_order_independent() {
    let mut reversed = scenario_judgments();
    reversed.reverse();

    for policy in [
        SelectionPolicy::Union,
        SelectionPolicy::Majority,
        SelectionPolicy::Weighted,
    ] {
        assert_eq!(
            consolidate(policy, &scenario_judgments()),
            consolidate(policy, &reversed)
        );
    }
}

#[test]
fn test_question_label_deserialize_normalizes_spans() {
    let json = r#"{
        "questionString": "Who bought something?",
        "questionSlots": {"wh": "who", "aux": "_", "subj": "_", "verb": "past",
                          "obj": "something", "prep": "_", "obj2": "_"},
        "answerJudgments": [
            {"sourceId": "turk-1", "isValid": true, "spans": [[1, 3]]},
            {"sourceId": "turk-2", "isValid": true, "spans": [[1, 3], [3, 4]]},
            {"sourceId": "turk-3", "isValid": false}
        ]
    }"#;

    let label: QuestionLabel = serde_json::from_str(json).unwrap();

    assert_eq!(label.num_answers(), 3);
    assert_eq!(label.num_invalids(), 1);
    assert_eq!(label.question_slots["wh"], "who");
    assert_eq!(label.answer_judgments[1].spans, vec![span(1, 2), span(3, 3)]);
    assert_eq!(label.answer_judgments[0].source_id.as_deref(), Some("turk-1"));

    let gold = GoldLabelConsolidator::new(SelectionPolicy::Weighted)
        .consolidate_question(5, &label)
        .unwrap();
    assert_eq!(gold, consolidate(SelectionPolicy::Weighted, &scenario_judgments()));
}

#[test]
fn test_question_label_rejects_empty_span() {
    let json = r#"{"answerJudgments": [{"isValid": true, "spans": [[2, 2]]}]}"#;
    assert!(serde_json::from_str::<QuestionLabel>(json).is_err());
}

#[test]
fn test_answer_judgment_serializes_exclusive_ends() {
    let judgment = AnswerJudgment::valid(vec![span(1, 2)]).with_source_id("turk-9");
    let value = serde_json::to_value(&judgment).unwrap();

    assert_eq!(
        value,
        serde_json::json!({"sourceId": "turk-9", "isValid": true, "spans": [[1, 3]]})
    );
}
