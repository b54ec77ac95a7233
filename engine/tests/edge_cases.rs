//! Edge case tests for sgmock-engine
//!
//! These tests drive the public API the way a test suite using the mock
//! would, covering boundary conditions and unusual inputs.

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use sgmock_engine::{
    Error, ErrorKind, FindOptions, Fixture, ManualClock, Record, Relations, Session, Value,
};
use std::sync::Arc;

const NO_FIELDS: &[&str] = &[];

fn session() -> Session {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    Session::new().with_clock(ManualClock::new(start))
}

fn filters(value: serde_json::Value) -> Value {
    Value::from(value)
}

fn ids(records: &[Record]) -> Vec<u64> {
    records.iter().map(Record::id).collect()
}

// ============================================================================
// Find Scenarios
// ============================================================================

#[test]
fn find_shot_by_code() {
    let mut session = session();
    session.create("Shot", json!({"code": "001"}), &[]).unwrap();

    let found = session
        .find("Shot", &filters(json!([["code", "is", "001"]])), &["code"])
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("code"), Some(&Value::from("001")));

    let missing = session
        .find("Shot", &filters(json!([["code", "is", "002"]])), &["code"])
        .unwrap();
    assert!(missing.is_empty());
}

#[test]
fn task_linked_to_deleted_shot() {
    let mut session = session();
    session.create("Shot", json!({"code": "001"}), &[]).unwrap();
    session
        .create(
            "Task",
            json!({"content": "Anim", "entity": {"type": "Shot", "id": 1}}),
            &[],
        )
        .unwrap();
    assert!(session.delete("Shot", 1));

    let tasks = session
        .find("Task", &filters(json!([])), &["entity"])
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(
        tasks[0].get("entity"),
        Some(&Value::from(json!({"type": "Shot", "id": 1})))
    );
}

#[test]
fn task_linked_to_missing_shot() {
    let mut session = session();
    session
        .create(
            "Task",
            json!({"content": "Anim", "entity": {"type": "Shot", "id": 1}}),
            &["entity"],
        )
        .unwrap();

    let task = session
        .find_one("Task", &filters(json!([])), &["entity", "entity.Shot.code"])
        .unwrap()
        .unwrap();
    assert_eq!(task.get("entity"), Some(&Value::Null));
    assert!(!task.contains("entity.Shot.code"));
}

#[test]
fn legacy_and_structured_in_agree() {
    let mut session = session();
    for status in ["ip", "rdy", "fin", "ip", "wtg"] {
        session
            .create("Shot", json!({ "sg_status": status }), &[])
            .unwrap();
    }

    let legacy = session
        .find("Shot", &filters(json!([["sg_status", "in", "ip", "rdy"]])), NO_FIELDS)
        .unwrap();
    let legacy_list = session
        .find("Shot", &filters(json!([["sg_status", "in", ["ip", "rdy"]]])), NO_FIELDS)
        .unwrap();
    let structured = session
        .find(
            "Shot",
            &filters(json!({
                "logical_operator": "and",
                "conditions": [{"relation": "in", "path": "sg_status", "values": ["ip", "rdy"]}]
            })),
            NO_FIELDS,
        )
        .unwrap();

    assert_eq!(ids(&legacy), vec![1, 2, 4]);
    assert_eq!(legacy, structured);
    assert_eq!(legacy, legacy_list);
}

#[test]
fn nested_groups() {
    let mut session = session();
    for (code, status) in [("010", "ip"), ("020", "fin"), ("030", "ip"), ("110", "wtg")] {
        session
            .create("Shot", json!({"code": code, "sg_status": status}), &[])
            .unwrap();
    }

    let found = session
        .find(
            "Shot",
            &filters(json!({
                "filter_operator": "any",
                "filters": [
                    ["code", "starts_with", "1"],
                    {
                        "filter_operator": "all",
                        "filters": [["sg_status", "is", "ip"], ["code", "is_not", "010"]]
                    }
                ]
            })),
            NO_FIELDS,
        )
        .unwrap();
    assert_eq!(ids(&found), vec![3, 4]);
}

#[test]
fn filters_on_timestamps_accept_strings() {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
    let mut session = Session::new().with_clock(Arc::clone(&clock));
    session.create("Version", json!({"code": "v1"}), &[]).unwrap();
    clock.advance(Duration::days(2));
    session.create("Version", json!({"code": "v2"}), &[]).unwrap();

    let recent = session
        .find(
            "Version",
            &filters(json!([["created_at", "greater_than", "2024-03-02T00:00:00Z"]])),
            &["code"],
        )
        .unwrap();
    assert_eq!(ids(&recent), vec![2]);
}

#[test]
fn invalid_operator_is_an_error() {
    let session = session();
    let err = session
        .find(
            "Shot",
            &filters(json!({"filter_operator": "ANY", "filters": []})),
            NO_FIELDS,
        )
        .unwrap_err();
    assert_eq!(err, Error::InvalidOperator("ANY".into()));
}

#[test]
fn custom_relation_through_session() {
    let mut relations = Relations::standard();
    relations.register("is_even", |field, _values| {
        let field = field.to_string();
        Ok(Box::new(move |record: &Record| {
            record
                .get(&field)
                .and_then(Value::as_i64)
                .is_some_and(|n| n % 2 == 0)
        }) as sgmock_engine::Predicate)
    });

    let mut session = session().with_relations(relations);
    for frames in [10, 11, 12] {
        session
            .create("Version", json!({ "frames": frames }), &[])
            .unwrap();
    }
    let even = session
        .find("Version", &filters(json!([["frames", "is_even"]])), NO_FIELDS)
        .unwrap();
    assert_eq!(ids(&even), vec![1, 3]);
}

// ============================================================================
// Pagination
// ============================================================================

#[test]
fn second_page_of_two() {
    let mut session = session();
    for code in ["a", "b", "c", "d", "e"] {
        session.create("Shot", json!({ "code": code }), &[]).unwrap();
    }
    let page = session
        .find_with(
            "Shot",
            &filters(json!([])),
            NO_FIELDS,
            FindOptions::new().limit(2).page(2),
        )
        .unwrap();
    assert_eq!(ids(&page), vec![3, 4]);
}

#[test]
fn page_past_the_end_is_empty() {
    let mut session = session();
    session.create("Shot", json!({"code": "a"}), &[]).unwrap();
    let page = session
        .find_with(
            "Shot",
            &filters(json!([])),
            NO_FIELDS,
            FindOptions::new().limit(10).page(4),
        )
        .unwrap();
    assert!(page.is_empty());
}

#[test]
fn oversized_limit_is_clamped() {
    let mut session = session();
    for i in 0..510 {
        session.create("Shot", json!({ "index": i }), &[]).unwrap();
    }
    let page = session
        .find_with(
            "Shot",
            &filters(json!([])),
            NO_FIELDS,
            FindOptions::new().limit(10_000),
        )
        .unwrap();
    assert_eq!(page.len(), 500);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn delete_is_idempotent_and_revivable() {
    let mut session = session();
    session.create("Shot", json!({"code": "001"}), &[]).unwrap();

    assert!(session.delete("Shot", 1));
    assert!(!session.delete("Shot", 1));
    assert!(session
        .find("Shot", &filters(json!([])), NO_FIELDS)
        .unwrap()
        .is_empty());

    assert!(session.revive("Shot", 1));
    let found = session
        .find("Shot", &filters(json!([["code", "is", "001"]])), NO_FIELDS)
        .unwrap();
    assert_eq!(ids(&found), vec![1]);
}

#[test]
fn retired_ids_are_not_reused() {
    let mut session = session();
    session.create("Shot", json!({"code": "001"}), &[]).unwrap();
    session.delete("Shot", 1);

    let next = session.create("Shot", json!({"code": "002"}), &[]).unwrap();
    assert_eq!(next.id(), 2);

    let err = session
        .create("Shot", json!({"id": 1, "code": "again"}), &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn update_of_missing_record() {
    let mut session = session();
    let err = session.update("Shot", 42, json!({"code": "x"})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn type_and_id_cannot_be_overwritten() {
    let mut session = session();
    session.create("Shot", json!({"code": "001"}), &[]).unwrap();
    session
        .update("Shot", 1, json!({"type": "Asset", "id": 99, "code": "002"}))
        .unwrap();
    let stored = session.store().get("Shot", 1).unwrap();
    assert_eq!(stored.get("type"), Some(&Value::from("Shot")));
    assert_eq!(stored.get("id"), Some(&Value::from(1u64)));
    assert_eq!(stored.get("code"), Some(&Value::from("002")));
}

#[test]
fn unicode_and_empty_strings() {
    let mut session = session();
    for code in ["", "日本語", "🎉", "line\nbreak"] {
        session.create("Shot", json!({ "code": code }), &[]).unwrap();
        let found = session
            .find("Shot", &filters(json!([["code", "is", code]])), &["code"])
            .unwrap();
        assert_eq!(found.len(), 1, "{code:?}");
    }
}

// ============================================================================
// Snapshot Round Trip
// ============================================================================

#[test]
fn dump_and_load_round_trip() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::microseconds(1234),
    ));
    let mut session = Session::new().with_clock(Arc::clone(&clock));
    session.create("Sequence", json!({"code": "sq010"}), &[]).unwrap();
    session
        .create(
            "Shot",
            json!({
                "code": "010",
                "sg_sequence": {"type": "Sequence", "id": 1},
                "sg_cut_in": 1001
            }),
            &[],
        )
        .unwrap();
    session.create("Shot", json!({"id": 12, "code": "120"}), &[]).unwrap();
    session.create("Shot", json!({"code": "130"}), &[]).unwrap();
    session.delete("Shot", 13);

    let mut buffer = Vec::new();
    session.dump_json(&mut buffer, true).unwrap();

    let mut loaded = Session::new();
    loaded.load_json(buffer.as_slice()).unwrap();

    assert_eq!(loaded.store().get("Shot", 1), session.store().get("Shot", 1));
    assert_eq!(loaded.store().get("Sequence", 1), session.store().get("Sequence", 1));
    assert_eq!(loaded.store().last_id("Shot"), 12);
    assert!(loaded.store().get("Shot", 13).is_none());
    assert!(loaded.store().get_retired("Shot", 13).is_none());

    let shot = loaded
        .find_one("Shot", &filters(json!([["code", "is", "010"]])), &["sg_sequence.Sequence.code"])
        .unwrap()
        .unwrap();
    assert_eq!(shot.get("sg_sequence.Sequence.code"), Some(&Value::from("sq010")));
}

#[test]
fn load_replaces_existing_state() {
    let mut session = session();
    session.create("Asset", json!({"code": "tree"}), &[]).unwrap();
    session
        .load_json(r#"{"Shot": {"5": {"type": "Shot", "id": 5, "code": "050"}}}"#.as_bytes())
        .unwrap();

    assert!(session.store().get("Asset", 1).is_none());
    let next = session.create("Shot", json!({"code": "060"}), &[]).unwrap();
    assert_eq!(next.id(), 6);
}

// ============================================================================
// Fixtures
// ============================================================================

#[test]
fn fixture_hierarchy_is_queryable() {
    let mut fix = Fixture::new(session());
    let project = fix.build("Project").arg("Demo").create().unwrap();
    let sequence = fix
        .build_child(&project, "Sequence")
        .unwrap()
        .arg("sq010")
        .create()
        .unwrap();
    for code in ["010", "020"] {
        fix.build_child(&sequence, "Shot")
            .unwrap()
            .arg(code)
            .create()
            .unwrap();
    }

    let shots = fix
        .session()
        .find(
            "Shot",
            &filters(json!([["project", "is", {"type": "Project", "id": 1}]])),
            &["code", "project.Project.name"],
        )
        .unwrap();
    assert_eq!(ids(&shots), vec![1, 2]);
    assert_eq!(shots[0].get("project.Project.name"), Some(&Value::from("Demo")));

    fix.delete_all().unwrap();
    assert!(fix
        .session()
        .find("Shot", &filters(json!([])), NO_FIELDS)
        .unwrap()
        .is_empty());
}
