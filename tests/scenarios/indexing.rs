//! What the derived index contains, and when

use crate::common::TestDb;
use termstore::{
    DescriptionPayload, DynamicDataType, DynamicValue, IndexKind, IndexingState, LogicGraphBuilder,
    Payload, QueryRequest, TermstoreConfig,
};
use termstore_search::{fields, FieldValue};
use uuid::Uuid;

#[test]
fn test_prefix_query_finds_committed_text() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let c = t.semantic(a, 100, Payload::String("Hello World".into()));

    assert_eq!(t.search(QueryRequest::prefix("hello").in_assemblage(a)), vec![c]);
    assert_eq!(t.search(QueryRequest::text("world").in_assemblage(a)), vec![c]);
    assert!(t.search(QueryRequest::prefix("goodbye").in_assemblage(a)).is_empty());
}

#[test]
fn test_unindexed_assemblage_never_matches() {
    let t = TestDb::new();
    let unindexed = t.concept();
    t.semantic(unindexed, 100, Payload::String("Hidden text".into()));

    assert!(!t.db.registry().is_indexed(unindexed));
    assert_eq!(t.db.indexing_state(unindexed), IndexingState::NotIndexed);
    assert!(t.search(QueryRequest::text("hidden")).is_empty());
    assert!(t.search(QueryRequest::prefix("hid").in_assemblage(unindexed)).is_empty());
    assert_eq!(t.db.stats(IndexKind::Semantic).documents, 0);
}

#[test]
fn test_logic_graph_indexes_parent_only() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let parent = t.concept();

    let mut b = LogicGraphBuilder::new();
    let leaf = b.concept(parent);
    let and = b.and(&[leaf]);
    let necessary = b.necessary(&[and]);
    let graph = b.build(&[necessary]);
    let definition = t.semantic(a, 100, Payload::LogicGraph(graph));

    let doc = t.db.index_document(IndexKind::Semantic, definition).unwrap();
    let data: Vec<&FieldValue> = doc
        .fields
        .iter()
        .filter(|f| f.name.starts_with(fields::COL_DATA))
        .map(|f| &f.value)
        .collect();
    assert_eq!(data.len(), 1);
    match data[0] {
        FieldValue::Text { text, .. } => assert_eq!(text, &parent.to_string()),
        other => panic!("unexpected field {:?}", other),
    }

    let hits = t.search(QueryRequest::exact(DynamicValue::Nid(parent)).in_assemblage(a));
    assert_eq!(hits, vec![definition]);
}

#[test]
fn test_history_remains_searchable() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let c = t.semantic(a, 100, Payload::String("Hello World".into()));
    t.db
        .commit(c, t.stamp(200), Payload::String("Goodbye".into()))
        .unwrap();

    assert_eq!(t.search(QueryRequest::text("hello")), vec![c]);
    assert_eq!(t.search(QueryRequest::text("goodbye")), vec![c]);
    assert_eq!(t.db.stats(IndexKind::Semantic).documents, 1);
}

#[test]
fn test_reconfiguring_columns_reindexes() {
    let t = TestDb::new();
    let a = t.dynamic_assemblage(
        &[DynamicDataType::String, DynamicDataType::String, DynamicDataType::String],
        &[0, 1],
    );
    let s = t.semantic(
        a,
        100,
        Payload::Dynamic(vec![
            Some("alpha".into()),
            Some("beta".into()),
            Some("gamma".into()),
        ]),
    );
    assert_eq!(t.search(QueryRequest::text("beta")), vec![s]);
    assert!(t.search(QueryRequest::text("gamma")).is_empty());

    t.db.configure_index(a, &[1, 2], t.stamp(300)).unwrap();
    assert_eq!(t.db.indexing_state(a), IndexingState::Indexed(vec![1, 2]));
    assert_eq!(t.search(QueryRequest::text("gamma")), vec![s]);
    assert!(t.search(QueryRequest::text("alpha")).is_empty());
}

#[test]
fn test_background_writes_visible_at_generation() {
    let t = TestDb::background();
    let a = t.indexed_assemblage();
    let written: Vec<_> = (0..50)
        .map(|i| t.semantic(a, 100 + i, Payload::Long(i as i64)))
        .collect();

    let hits = t.search(
        QueryRequest::range(
            std::ops::Bound::Included(DynamicValue::Long(0)),
            std::ops::Bound::Excluded(DynamicValue::Long(50)),
        )
        .page(0, 100),
    );
    assert_eq!(hits.len(), written.len());

    t.db.drain();
    let stats = t.db.stats(IndexKind::Semantic);
    assert_eq!(stats.documents, 50);
    assert_eq!(stats.queue_depth, 0);
    assert_eq!(stats.applied_generation, stats.requested_generation);
}

#[test]
fn test_full_queue_delays_writes_without_losing_index_work() {
    let t = TestDb::with_config(TermstoreConfig {
        max_queue_depth: 1,
        ..TermstoreConfig::default()
    });
    let a = t.indexed_assemblage();
    let words: Vec<String> = (0..300).map(|i| format!("ergocalciferol{}", i)).collect();
    let written: Vec<_> = words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let referenced = t.concept();
            t.db.create_semantic(
                Uuid::new_v4(),
                a,
                referenced,
                t.stamp(100 + i as u64),
                Payload::String(word.clone()),
            )
            .expect("committed write reported as failed")
        })
        .collect();

    t.db.drain();
    for (word, nid) in words.iter().zip(&written) {
        assert_eq!(t.search(QueryRequest::text(word)), vec![*nid], "{} not indexed", word);
    }
    let stats = t.db.stats(IndexKind::Semantic);
    assert_eq!(stats.documents, written.len());
    assert_eq!(stats.applied_generation, stats.requested_generation);
}

#[test]
fn test_retire_schedules_every_retired_component_under_load() {
    let t = TestDb::with_config(TermstoreConfig {
        max_queue_depth: 1,
        ..TermstoreConfig::default()
    });
    let a = t.indexed_assemblage();
    let root = t.concept();
    let attached: Vec<_> = (0..20)
        .map(|i| {
            t.db.create_semantic(
                Uuid::new_v4(),
                a,
                root,
                t.stamp(10),
                Payload::String(format!("tocopherol{}", i)),
            )
            .unwrap()
        })
        .collect();

    let before = t.db.requested_generation(IndexKind::Semantic);
    let retired = t.db.retire(root, t.stamp(50)).unwrap();
    assert_eq!(retired.len(), attached.len() + 1);
    // one index task per retired semantic, none for the concept
    assert_eq!(
        t.db.requested_generation(IndexKind::Semantic) - before,
        attached.len() as u64
    );

    t.db.drain();
    let stats = t.db.stats(IndexKind::Semantic);
    assert_eq!(stats.applied_generation, stats.requested_generation);
    assert_eq!(t.search(QueryRequest::text("tocopherol7")), vec![attached[7]]);
}

#[test]
fn test_descriptions_indexed_without_configuration() {
    let t = TestDb::new();
    let descriptions = t.concept();
    let concept = t.concept();
    let english = t.concept();
    let synonym = t.concept();
    let d = t
        .db
        .create_semantic(
            Uuid::new_v4(),
            descriptions,
            concept,
            t.stamp(100),
            Payload::Description(DescriptionPayload {
                text: "Ascorbic acid".into(),
                language: english,
                case_significance: english,
                description_type: synonym,
            }),
        )
        .unwrap();

    assert_eq!(t.query(QueryRequest::descriptions("ascorbic")), vec![d]);
    assert!(t.search(QueryRequest::text("ascorbic")).is_empty());
}

#[test]
fn test_retire_reindexes_attached_semantics() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let concept = t.concept();
    let s = t
        .db
        .create_semantic(
            Uuid::new_v4(),
            a,
            concept,
            t.stamp(100),
            Payload::String("thiamine".into()),
        )
        .unwrap();
    let nested = t
        .db
        .create_semantic(Uuid::new_v4(), a, s, t.stamp(100), Payload::String("B1".into()))
        .unwrap();

    let retired = t.db.retire(concept, t.stamp(200)).unwrap();
    assert_eq!(retired, vec![concept, s, nested]);
    // every version stays indexed, so retired content is still found
    assert_eq!(t.search(QueryRequest::text("thiamine")), vec![s]);
}
