use super::*;

#[test]
fn test_span_count() {
    assert_eq!(span_count(0), 0);
    assert_eq!(span_count(1), 1);
    assert_eq!(span_count(5), 15);
    assert_eq!(span_count(512), 131_328);
}

#[test]
fn test_enumeration_order_small() {
    let spans = enumerate_spans(3);
    let pairs: Vec<(usize, usize)> = spans.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(
        pairs,
        vec![(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)]
    );
}

#[test]
fn test_enumeration_empty_sequence() {
    assert!(enumerate_spans(0).is_empty());
    assert_eq!(SpanIndex::new(0).count(), 0);
}

#[test]
fn test_enumeration_is_restartable() {
    let index = SpanIndex::new(6);
    let first: Vec<Span> = index.iter().collect();
    let second: Vec<Span> = index.iter().collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), index.count());
}

#[test]
fn test_closed_form_matches_enumeration() {
    for n in 0..=64 {
        let index = SpanIndex::new(n);
        for (i, span) in index.indexed() {
            assert_eq!(index.to_index(span).unwrap(), i, "n={n} span={span}");
        }
    }
}

#[test]
fn test_bijection_up_to_512() {
    for n in 1..=512 {
        let index = SpanIndex::new(n);
        let count = index.count();
        let mut seen = vec![false; count];

        for start in 0..n {
            for end in start..n {
                let span = Span { start, end };
                let i = index.to_index(span).unwrap();
                assert!(i < count);
                assert!(!seen[i], "duplicate index {i} for n={n}");
                seen[i] = true;
                assert_eq!(index.from_index(i).unwrap(), span);
            }
        }

        assert!(seen.iter().all(|&s| s), "indices for n={n} not a permutation");
    }
}

#[test]
fn test_known_indices() {
    let index = SpanIndex::new(5);
    assert_eq!(index.to_index(Span { start: 0, end: 0 }).unwrap(), 0);
    assert_eq!(index.to_index(Span { start: 1, end: 1 }).unwrap(), 5);
    assert_eq!(index.to_index(Span { start: 1, end: 2 }).unwrap(), 6);
    assert_eq!(index.to_index(Span { start: 3, end: 3 }).unwrap(), 12);
    assert_eq!(index.to_index(Span { start: 4, end: 4 }).unwrap(), 14);
}

#[test]
fn test_to_index_out_of_range() {
    let index = SpanIndex::new(4);

    let err = index.to_index(Span { start: 2, end: 4 }).unwrap_err();
    assert_eq!(
        err,
        SpanError::OutOfRange {
            start: 2,
            end: 4,
            seq_len: 4
        }
    );

    assert!(matches!(
        index.to_index(Span { start: 3, end: 1 }),
        Err(SpanError::OutOfRange { .. })
    ));
}

#[test]
fn test_from_index_out_of_range() {
    let index = SpanIndex::new(4);
    assert!(index.from_index(9).is_ok());
    assert_eq!(
        index.from_index(10).unwrap_err(),
        SpanError::IndexOutOfRange {
            index: 10,
            seq_len: 4,
            count: 10
        }
    );
    assert!(SpanIndex::new(0).from_index(0).is_err());
}

#[test]
fn test_sequence_len_for_span_count() {
    for n in 0..=2048 {
        assert_eq!(sequence_len_for_span_count(span_count(n)).unwrap(), n);
    }
    assert_eq!(
        sequence_len_for_span_count(7).unwrap_err(),
        SpanError::NotTriangular { count: 7 }
    );
}

#[test]
fn test_for_span_count() {
    let index = SpanIndex::for_span_count(15).unwrap();
    assert_eq!(index.seq_len(), 5);
    assert!(SpanIndex::for_span_count(14).is_err());
}

#[test]
fn test_span_new_rejects_reversed() {
    assert!(Span::new(2, 2).is_ok());
    assert_eq!(
        Span::new(3, 2).unwrap_err(),
        SpanError::Reversed { start: 3, end: 2 }
    );
}

#[test]
fn test_exclusive_conversion() {
    let span = Span::from_exclusive(1, 3).unwrap();
    assert_eq!(span, Span { start: 1, end: 2 });
    assert_eq!(span.to_exclusive(), (1, 3));
    assert_eq!(span.width(), 2);

    assert!(Span::from_exclusive(2, 2).is_err());
    assert!(Span::from_exclusive(-1, 2).is_err());
}

#[test]
fn test_span_display() {
    assert_eq!(Span { start: 1, end: 2 }.to_string(), "[1, 2]");
}
