//! Text, exact and numeric queries with their restrictions and errors

use crate::common::TestDb;
use std::ops::Bound;
use termstore::{
    DynamicDataType, DynamicValue, Error, IndexKind, NidQueryMode, Payload, QueryRequest,
    TermstoreConfig,
};

fn closed(lower: DynamicValue, upper: DynamicValue) -> QueryRequest {
    QueryRequest::range(Bound::Included(lower), Bound::Included(upper))
}

#[test]
fn test_range_restricted_to_column() {
    let t = TestDb::new();
    let b = t.dynamic_assemblage(
        &[
            DynamicDataType::String,
            DynamicDataType::Integer,
            DynamicDataType::Long,
        ],
        &[0, 1, 2],
    );
    let s = t.semantic(
        b,
        100,
        Payload::Dynamic(vec![
            Some("dose".into()),
            Some(DynamicValue::Integer(42)),
            Some(DynamicValue::Long(1000)),
        ]),
    );

    let range = || closed(DynamicValue::Integer(40), DynamicValue::Integer(45)).in_assemblage(b);
    assert_eq!(t.search(range().columns([1])), vec![s]);
    assert!(t.search(range().columns([0])).is_empty());
    assert!(t.search(range().columns([2])).is_empty());
    // unrestricted searches every indexed column
    assert_eq!(t.search(range()), vec![s]);
}

#[test]
fn test_numeric_kinds_match_across_storage_types() {
    let t = TestDb::new();
    let a = t.dynamic_assemblage(&[DynamicDataType::Integer], &[0]);
    let d = t.dynamic_assemblage(&[DynamicDataType::Double], &[0]);
    let stored_int = t.semantic(a, 100, Payload::Dynamic(vec![Some(DynamicValue::Integer(7))]));
    let stored_double = t.semantic(d, 100, Payload::Dynamic(vec![Some(DynamicValue::Double(7.0))]));

    let as_double = closed(DynamicValue::Double(7.0), DynamicValue::Double(7.0));
    assert_eq!(t.search(as_double.clone().in_assemblage(a)), vec![stored_int]);
    let as_int = closed(DynamicValue::Integer(7), DynamicValue::Integer(7));
    assert_eq!(t.search(as_int.in_assemblage(d)), vec![stored_double]);

    let mut both = t.search(as_double);
    both.sort();
    let mut expected = vec![stored_int, stored_double];
    expected.sort();
    assert_eq!(both, expected);

    // a fractional bound never matches an integral value exactly
    let fractional = closed(DynamicValue::Double(7.5), DynamicValue::Double(7.5));
    assert!(t.search(fractional.in_assemblage(a)).is_empty());
    // but encloses it as part of a wider range
    let wide = closed(DynamicValue::Float(6.5), DynamicValue::Double(7.5));
    assert_eq!(t.search(wide.in_assemblage(a)), vec![stored_int]);
}

#[test]
fn test_exact_numeric_values() {
    let t = TestDb::new();
    let a = t.dynamic_assemblage(&[DynamicDataType::Long], &[0]);
    let s = t.semantic(a, 100, Payload::Dynamic(vec![Some(DynamicValue::Long(5_000_000_000))]));

    assert_eq!(t.search(QueryRequest::exact(DynamicValue::Long(5_000_000_000))), vec![s]);
    assert_eq!(t.search(QueryRequest::exact(DynamicValue::Double(5e9))), vec![s]);
    assert!(t.search(QueryRequest::exact(DynamicValue::Integer(5))).is_empty());
}

#[test]
fn test_column_restriction_needs_one_assemblage() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let b = t.indexed_assemblage();

    let none = QueryRequest::text("x").columns([0]);
    assert!(matches!(
        t.db.query(&none),
        Err(Error::ColumnRestriction { assemblage_count: 0 })
    ));
    let two = QueryRequest::text("x").in_assemblage(a).in_assemblage(b).columns([0]);
    assert!(matches!(
        t.db.query(&two),
        Err(Error::ColumnRestriction { assemblage_count: 2 })
    ));
}

#[test]
fn test_column_restriction_on_single_column_falls_back() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let s = t.semantic(a, 100, Payload::String("riboflavin".into()));

    // one indexed column: only the unqualified field exists
    let restricted = QueryRequest::text("riboflavin").in_assemblage(a).columns([3]);
    assert_eq!(t.search(restricted), vec![s]);
}

#[test]
fn test_exact_strings_and_identifiers() {
    let t = TestDb::new();
    let a = t.dynamic_assemblage(
        &[
            DynamicDataType::String,
            DynamicDataType::Boolean,
            DynamicDataType::Uuid,
        ],
        &[0, 1, 2],
    );
    let id = uuid::Uuid::new_v4();
    let s = t.semantic(
        a,
        100,
        Payload::Dynamic(vec![
            Some("Vitamin B12".into()),
            Some(DynamicValue::Boolean(true)),
            Some(DynamicValue::Uuid(id)),
        ]),
    );

    assert_eq!(t.search(QueryRequest::exact("Vitamin B12")), vec![s]);
    // exact matching is case sensitive
    assert!(t.search(QueryRequest::exact("vitamin b12")).is_empty());
    assert_eq!(t.search(QueryRequest::exact(true).in_assemblage(a).columns([1])), vec![s]);
    assert!(t.search(QueryRequest::exact(false)).is_empty());
    assert_eq!(t.search(QueryRequest::exact(id)), vec![s]);
}

#[test]
fn test_text_with_query_syntax_is_literal() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let s = t.semantic(a, 100, Payload::String("sodium (chloride): NaCl".into()));

    assert_eq!(t.search(QueryRequest::text("(chloride):")), vec![s]);
    // a leading hyphen is part of the word, not a negation
    assert_eq!(t.search(QueryRequest::text("-sodium")), vec![s]);
}

#[test]
fn test_array_values_require_every_element() {
    let t = TestDb::new();
    let a = t.dynamic_assemblage(&[DynamicDataType::Array], &[0]);
    let array = |values: Vec<i32>| {
        DynamicValue::Array(
            termstore::DynamicArray::new(
                DynamicDataType::Integer,
                values.into_iter().map(DynamicValue::Integer).collect(),
            )
            .unwrap(),
        )
    };
    let s = t.semantic(a, 100, Payload::Dynamic(vec![Some(array(vec![1, 2, 3]))]));

    assert_eq!(t.search(QueryRequest::exact(array(vec![1, 3]))), vec![s]);
    assert!(t.search(QueryRequest::exact(array(vec![1, 4]))).is_empty());
}

#[test]
fn test_unsearchable_values_rejected() {
    let t = TestDb::new();
    let bytes = QueryRequest::exact(DynamicValue::ByteArray(vec![1, 2]));
    assert!(matches!(
        t.db.query(&bytes),
        Err(Error::NotIndexable(DynamicDataType::ByteArray))
    ));

    let strings = closed("a".into(), "z".into());
    assert!(matches!(
        t.db.query(&strings),
        Err(Error::NonNumericRange(DynamicDataType::String))
    ));

    let described = QueryRequest::text("x").description_types([t.concept()]);
    assert!(matches!(t.db.query(&described), Err(Error::InvalidQuery(_))));
}

#[test]
fn test_paging_filter_and_restriction() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let written: Vec<_> = (0..10)
        .map(|i| t.semantic(a, 100 + i, Payload::String("pantothenic acid".into())))
        .collect();

    let all = t.search(QueryRequest::text("pantothenic"));
    assert_eq!(all.len(), 10);
    let page = t.search(QueryRequest::text("pantothenic").page(2, 3));
    assert_eq!(page, all[2..5].to_vec());

    let allowed = written[..4].to_vec();
    let restricted = t.search(QueryRequest::text("pantothenic").restrict_to(allowed.clone()));
    assert_eq!(restricted.len(), 4);
    assert!(restricted.iter().all(|n| allowed.contains(n)));

    let skip = written[0];
    let filtered = t.search(QueryRequest::text("pantothenic").filter(move |n| n != skip));
    assert_eq!(filtered.len(), 9);
    assert!(!filtered.contains(&skip));
}

#[test]
fn test_default_page_size_applies() {
    let t = TestDb::with_config(TermstoreConfig {
        default_page_size: 3,
        ..TermstoreConfig::inline()
    });
    let a = t.indexed_assemblage();
    for i in 0..5 {
        t.semantic(a, 100 + i, Payload::String("biotin".into()));
    }
    assert_eq!(t.search(QueryRequest::text("biotin")).len(), 3);
    assert_eq!(t.search(QueryRequest::text("biotin").page(0, 10)).len(), 5);
}

#[test]
fn test_nid_queries_before_and_after_migration() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let target = t.concept();
    let s = t.semantic(a, 100, Payload::ComponentNid(target));
    let as_integer = || QueryRequest::exact(DynamicValue::Integer(target.as_i32()));

    assert_eq!(t.db.nid_query_mode(), NidQueryMode::Dual);
    assert_eq!(t.search(QueryRequest::exact(DynamicValue::Nid(target))), vec![s]);
    assert_eq!(t.search(as_integer()), vec![s]);

    let outcome = t.db.migrate_nid_encoding().unwrap();
    assert!(outcome.complete);
    assert_eq!(t.db.nid_query_mode(), NidQueryMode::Exact);
    assert_eq!(t.search(QueryRequest::exact(DynamicValue::Nid(target))), vec![s]);
    assert!(t.search(as_integer()).is_empty());
}

#[test]
fn test_description_queries() {
    let t = TestDb::new();
    let descriptions = t.concept();
    let concept = t.concept();
    let english = t.concept();
    let fqn = t.concept();
    let synonym = t.concept();
    let describe = |text: &str, description_type| {
        t.db.create_semantic(
            uuid::Uuid::new_v4(),
            descriptions,
            concept,
            t.stamp(100),
            Payload::Description(termstore::DescriptionPayload {
                text: text.into(),
                language: english,
                case_significance: english,
                description_type,
            }),
        )
        .unwrap()
    };
    let name = describe("Pyridoxine (substance)", fqn);
    let alias = describe("Vitamin B6", synonym);

    assert_eq!(t.query(QueryRequest::descriptions("pyrid")), Vec::new());
    let prefix = QueryRequest::prefix("pyrid").on(IndexKind::Description);
    assert_eq!(t.query(prefix), vec![name]);
    assert_eq!(
        t.query(QueryRequest::descriptions("vitamin").description_types([synonym])),
        vec![alias]
    );
    assert!(t
        .query(QueryRequest::descriptions("vitamin").description_types([fqn]))
        .is_empty());
    assert_eq!(
        t.query(QueryRequest::exact("Vitamin B6").on(IndexKind::Description)),
        vec![alias]
    );

    let columns = QueryRequest::descriptions("vitamin").columns([0]);
    assert!(matches!(t.db.query(&columns), Err(Error::InvalidQuery(_))));
}
