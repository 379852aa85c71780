//! Version visibility through the Database facade

use crate::common::TestDb;
use std::sync::Arc;
use std::thread;
use termstore::{
    Payload, RelativePosition, StampCoordinate, StampPosition, StampTime, Stamped, Status,
    StatusSet,
};

fn text_at(db: &TestDb, nid: termstore::Nid, coordinate: &StampCoordinate) -> Option<String> {
    let latest = db.db.resolve_latest(nid, coordinate).unwrap();
    match latest.value()?.payload() {
        Payload::String(s) => Some(s.clone()),
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn test_time_travel_on_one_path() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let c = t.semantic(a, 100, Payload::String("Hello World".into()));
    t.db
        .commit(c, t.stamp(200), Payload::String("Goodbye".into()))
        .unwrap();

    let at = |time| StampCoordinate::on_path_at(t.path, StampTime::at_micros(time));
    assert_eq!(text_at(&t, c, &at(150)).as_deref(), Some("Hello World"));
    assert_eq!(text_at(&t, c, &at(250)).as_deref(), Some("Goodbye"));
    assert_eq!(text_at(&t, c, &at(50)), None);
    assert_eq!(
        text_at(&t, c, &StampCoordinate::latest_on(t.path)).as_deref(),
        Some("Goodbye")
    );
}

#[test]
fn test_branch_sees_origin_until_branch_point() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let c = t.semantic(a, 100, Payload::String("trunk v1".into()));
    t.db
        .commit(c, t.stamp(200), Payload::String("trunk v2".into()))
        .unwrap();

    let branch = t.concept();
    t.db.add_path_origin(
        branch,
        StampPosition::new(t.path, StampTime::at_micros(150)),
    );
    let on_branch = StampCoordinate::latest_on(branch);
    assert_eq!(text_at(&t, c, &on_branch).as_deref(), Some("trunk v1"));

    t.db
        .commit(c, t.stamp_on(branch, 300), Payload::String("branch v1".into()))
        .unwrap();
    assert_eq!(text_at(&t, c, &on_branch).as_deref(), Some("branch v1"));
    assert_eq!(
        text_at(&t, c, &StampCoordinate::latest_on(t.path)).as_deref(),
        Some("trunk v2")
    );
}

#[test]
fn test_same_instant_on_one_path_is_a_contradiction() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let c = t.semantic(a, 100, Payload::String("first".into()));
    t.db
        .commit(c, t.stamp(100), Payload::String("second".into()))
        .unwrap();

    let latest = t
        .db
        .resolve_latest(c, &StampCoordinate::latest_on(t.path))
        .unwrap();
    assert!(latest.is_present());
    assert!(latest.is_contradicted());
    assert_eq!(latest.contradictions().len(), 1);
}

#[test]
fn test_status_filter_skips_retired_version() {
    let t = TestDb::new();
    let a = t.indexed_assemblage();
    let c = t.semantic(a, 100, Payload::String("kept".into()));
    t.db.retire(c, t.stamp(200)).unwrap();

    let any = StampCoordinate::latest_on(t.path);
    let latest = t.db.resolve_latest(c, &any).unwrap();
    assert_eq!(latest.value().unwrap().stamp().status, Status::Inactive);

    let active = any.with_statuses(StatusSet::ACTIVE_ONLY);
    let latest = t.db.resolve_latest(c, &active).unwrap();
    assert_eq!(latest.value().unwrap().stamp().status, Status::Active);
    assert_eq!(latest.value().unwrap().stamp().time, StampTime::at_micros(100));
}

#[test]
fn test_unknown_component_is_an_error() {
    let t = TestDb::new();
    let missing = termstore::Nid::new(i32::MAX);
    assert!(t
        .db
        .resolve_latest(missing, &StampCoordinate::latest_on(t.path))
        .is_err());
}

#[test]
fn test_relative_position_across_paths() {
    let t = TestDb::new();
    let left = t.concept();
    let right = t.concept();
    let merge = t.concept();
    let fork = StampPosition::new(t.path, StampTime::at_micros(150));
    t.db.add_path_origin(left, fork);
    t.db.add_path_origin(right, fork);
    t.db.add_path_origin(merge, StampPosition::latest(left));
    t.db.add_path_origin(merge, StampPosition::latest(right));

    let trunk = t.stamp(100);
    let on_left = t.stamp_on(left, 300);
    let on_right = t.stamp_on(right, 300);
    let from_merge = StampCoordinate::latest_on(merge);

    assert_eq!(
        t.db.relative_position(&trunk, &on_left, &from_merge),
        RelativePosition::Before
    );
    assert_eq!(
        t.db.relative_position(&on_right, &trunk, &from_merge),
        RelativePosition::After
    );
    assert_eq!(
        t.db.relative_position(&on_left, &on_right, &from_merge),
        RelativePosition::Contradiction
    );
    assert_eq!(
        t.db.relative_position(&on_left, &on_right, &StampCoordinate::latest_on(left)),
        RelativePosition::Unreachable
    );
    assert_eq!(
        t.db.relative_position(&trunk, &trunk, &from_merge),
        RelativePosition::Equal
    );
}

#[test]
fn test_parallel_resolution_agrees() {
    let t = Arc::new(TestDb::new());
    let a = t.indexed_assemblage();
    let c = t.semantic(a, 100, Payload::String("v1".into()));
    for time in [200, 300, 400] {
        t.db
            .commit(c, t.stamp(time), Payload::String(format!("v{}", time)))
            .unwrap();
    }
    let coordinate = StampCoordinate::on_path_at(t.path, StampTime::at_micros(350));
    let expected = text_at(&t, c, &coordinate);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let t = Arc::clone(&t);
            let coordinate = coordinate.clone();
            thread::spawn(move || {
                (0..100)
                    .map(|_| text_at(&t, c, &coordinate))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for handle in handles {
        for seen in handle.join().unwrap() {
            assert_eq!(seen, expected);
        }
    }
    assert_eq!(expected.as_deref(), Some("v300"));
}
