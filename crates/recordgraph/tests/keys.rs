//! Key normalization during correlation.

#![allow(clippy::unwrap_used, missing_docs)]

use proptest::prelude::*;
use recordgraph::{KeyPolicy, SqlValue, correlate_keyed};

#[derive(Debug, Default)]
struct Parent {
    id: i32,
    children: Vec<u32>,
}

fn attach(parents: &mut [Parent], child_key: SqlValue, policy: KeyPolicy) -> usize {
    correlate_keyed(
        parents,
        vec![(child_key, 7)],
        |p: &Parent| SqlValue::Int(p.id),
        |p: &mut Parent, children| p.children = children,
        policy,
    )
}

proptest! {
    #[test]
    fn prop_textual_keys_ignore_column_type(id in any::<i32>()) {
        for key in [
            SqlValue::BigInt(i64::from(id)),
            SqlValue::String(id.to_string()),
        ] {
            let mut parents = [Parent { id, ..Parent::default() }];
            prop_assert_eq!(attach(&mut parents, key, KeyPolicy::Textual), 0);
            prop_assert_eq!(&parents[0].children, &vec![7]);
        }
    }

    #[test]
    fn prop_textual_real_keys_match_integer_parents(id in -1_000_000i32..1_000_000) {
        let mut parents = [Parent { id, ..Parent::default() }];
        #[allow(clippy::cast_precision_loss)]
        let real = SqlValue::Float(id as f32);
        prop_assert_eq!(attach(&mut parents, real, KeyPolicy::Textual), 0);
        prop_assert_eq!(&parents[0].children, &vec![7]);
    }

    #[test]
    fn prop_strict_keys_unify_integer_widths_only(id in any::<i32>()) {
        let mut parents = [Parent { id, ..Parent::default() }];
        let wide = SqlValue::BigInt(i64::from(id));
        prop_assert_eq!(attach(&mut parents, wide, KeyPolicy::Strict), 0);

        let mut parents = [Parent { id, ..Parent::default() }];
        let text = SqlValue::String(id.to_string());
        prop_assert_eq!(attach(&mut parents, text, KeyPolicy::Strict), 1);
        prop_assert!(parents[0].children.is_empty());
    }
}

#[test]
fn test_null_never_correlates() {
    let mut parents = [Parent::default()];
    let dropped = correlate_keyed(
        &mut parents,
        vec![(SqlValue::Null, 1), (SqlValue::Int(0), 2)],
        |_: &Parent| SqlValue::Null,
        |p: &mut Parent, children| p.children = children,
        KeyPolicy::Textual,
    );

    assert_eq!(dropped, 2);
    assert!(parents[0].children.is_empty());
}

#[test]
fn test_duplicate_parent_keys_first_parent_wins() {
    let mut parents = [
        Parent { id: 4, ..Parent::default() },
        Parent { id: 4, ..Parent::default() },
    ];
    correlate_keyed(
        &mut parents,
        vec![(SqlValue::Int(4), 1), (SqlValue::Int(4), 2)],
        |p: &Parent| SqlValue::Int(p.id),
        |p: &mut Parent, children| p.children = children,
        KeyPolicy::Textual,
    );

    assert_eq!(parents[0].children, [1, 2]);
    assert!(parents[1].children.is_empty());
}

#[derive(Debug, Default)]
struct Price {
    amount: f64,
    sources: Vec<&'static str>,
}

#[test]
fn test_textual_real_keys_match_double_and_text() {
    let mut prices = [
        Price { amount: 1.1, ..Price::default() },
        Price { amount: -0.0, ..Price::default() },
    ];
    let dropped = correlate_keyed(
        &mut prices,
        vec![
            (SqlValue::Float(1.1), "real"),
            (SqlValue::String("1.1".into()), "text"),
            (SqlValue::Int(0), "zero"),
        ],
        |p: &Price| SqlValue::Double(p.amount),
        |p: &mut Price, sources| p.sources = sources,
        KeyPolicy::Textual,
    );

    assert_eq!(dropped, 0);
    assert_eq!(prices[0].sources, ["real", "text"]);
    assert_eq!(prices[1].sources, ["zero"]);
}
