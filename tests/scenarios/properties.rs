//! Randomized checks over whole databases

use crate::common::TestDb;
use proptest::prelude::*;
use std::collections::BTreeSet;
use termstore::{
    CancellationToken, DynamicDataType, DynamicValue, IndexKind, Nid, Payload, QueryRequest,
};

fn field_set(t: &TestDb, nid: Nid) -> BTreeSet<String> {
    let doc = t.db.index_document(IndexKind::Semantic, nid).unwrap();
    doc.fields.iter().map(|f| format!("{:?}", f)).collect()
}

fn arb_row() -> impl Strategy<Value = (String, i32, f64)> {
    ("[a-z]{1,8}( [a-z]{1,8}){0,2}", any::<i32>(), -1.0e6..1.0e6f64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Rebuilding an unchanged store yields the same documents
    #[test]
    fn prop_reindex_is_idempotent(rows in prop::collection::vec(arb_row(), 1..6), rebuilds in 1usize..4) {
        let t = TestDb::new();
        let a = t.dynamic_assemblage(
            &[DynamicDataType::String, DynamicDataType::Integer, DynamicDataType::Double],
            &[0, 1, 2],
        );
        let s = t.semantic(a, 100, Payload::Dynamic(vec![None, None, None]));
        for (i, (text, int, double)) in rows.iter().enumerate() {
            t.db.commit(
                s,
                t.stamp(200 + i as u64),
                Payload::Dynamic(vec![
                    Some(DynamicValue::String(text.clone())),
                    Some(DynamicValue::Integer(*int)),
                    Some(DynamicValue::Double(*double)),
                ]),
            ).unwrap();
        }

        let before = field_set(&t, s);
        for _ in 0..rebuilds {
            let outcome = t.db.rebuild(IndexKind::Semantic, &CancellationToken::new(), None).unwrap();
            prop_assert!(outcome.complete);
            prop_assert_eq!(field_set(&t, s), before.clone());
        }
        prop_assert_eq!(t.db.stats(IndexKind::Semantic).documents, 1);
    }

    /// Every stored integer is found by a Double point query of itself
    #[test]
    fn prop_integer_found_by_double_point(values in prop::collection::btree_set(-(1i32 << 24)..(1i32 << 24), 1..8)) {
        let t = TestDb::new();
        let a = t.dynamic_assemblage(&[DynamicDataType::Integer], &[0]);
        let written: Vec<(i32, Nid)> = values
            .iter()
            .map(|v| (*v, t.semantic(a, 100, Payload::Dynamic(vec![Some(DynamicValue::Integer(*v))]))))
            .collect();

        for (value, nid) in written {
            let point = DynamicValue::Double(f64::from(value));
            let hits = t.search(QueryRequest::range(
                std::ops::Bound::Included(point.clone()),
                std::ops::Bound::Included(point),
            ));
            prop_assert_eq!(hits, vec![nid]);
        }
    }
}
