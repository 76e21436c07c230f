//! Memento subsystem integration tests: capture, keyed storage, and the
//! privileged force-restore path.

use std::sync::Arc;

use ward_core::{NewRequest, NoopNotifier, RequestStatus};
use ward_engine::{Caretaker, EngineError, LifecycleEngine, Originator};
use ward_storage::MemoryStore;

fn new_request(id: &str) -> NewRequest {
    NewRequest {
        id: id.to_string(),
        category: "sanitation".to_string(),
        title: "missed pickup".to_string(),
        description: "bins not collected tuesday".to_string(),
        location: "birch rd 9".to_string(),
        priority: "normal".to_string(),
    }
}

struct Fixture {
    engine: LifecycleEngine<MemoryStore>,
    originator: Originator<MemoryStore>,
    caretaker: Caretaker<MemoryStore>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    Fixture {
        engine: LifecycleEngine::new(Arc::clone(&store), Arc::new(NoopNotifier)),
        originator: Originator::new(Arc::clone(&store)),
        caretaker: Caretaker::new(store),
    }
}

/// Walk a fresh request through the full legal chain to `completed`.
async fn drive_to_completed(engine: &LifecycleEngine<MemoryStore>, id: &str) {
    for status in [
        RequestStatus::Reviewed,
        RequestStatus::Assigned,
        RequestStatus::InProgress,
        RequestStatus::Completed,
    ] {
        engine.transition(id, status, "admin-1", "").await.unwrap();
    }
}

#[tokio::test]
async fn memento_captures_current_state() {
    let f = fixture();
    f.engine.create(new_request("req-1"), "citizen-1").await.unwrap();

    let memento = f
        .originator
        .create_memento("req-1", "before correction")
        .await
        .unwrap();
    assert_eq!(memento.request_id(), "req-1");
    assert_eq!(memento.label(), "before correction");
    assert!(memento.key().starts_with("req-1_"));
    assert_eq!(memento.captured().status, "pending");
}

#[tokio::test]
async fn memento_of_unknown_request_fails_not_found() {
    let f = fixture();
    let err = f
        .originator
        .create_memento("ghost", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { request_id } if request_id == "ghost"));
}

#[tokio::test]
async fn immediate_restore_is_a_noop_on_fields() {
    let f = fixture();
    f.engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let before = f.engine.get("req-1").await.unwrap();

    let memento = f.originator.create_memento("req-1", "noop").await.unwrap();
    let restored = f.originator.restore(&memento, "admin-1").await.unwrap();

    // Every captured field comes back verbatim; only the version moves.
    assert_eq!(restored.status, before.status);
    assert_eq!(restored.assigned_to, before.assigned_to);
    assert_eq!(restored.title, before.title);
    assert_eq!(restored.created_at, before.created_at);
    assert_eq!(restored.updated_at, before.updated_at);
    assert_eq!(restored.version, before.version + 1);
}

#[tokio::test]
async fn restore_bypasses_the_transition_table() {
    let f = fixture();
    f.engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let memento = f.originator.create_memento("req-1", "fresh").await.unwrap();

    drive_to_completed(&f.engine, "req-1").await;
    assert_eq!(
        f.engine.get("req-1").await.unwrap().status,
        RequestStatus::Completed
    );

    // completed -> pending is not in the table; the restore wins anyway.
    let restored = f.originator.restore(&memento, "admin-1").await.unwrap();
    assert_eq!(restored.status, RequestStatus::Pending);
    assert_eq!(
        f.engine.get("req-1").await.unwrap().status,
        RequestStatus::Pending
    );
}

#[tokio::test]
async fn restore_appends_an_audit_row() {
    let f = fixture();
    f.engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let memento = f.originator.create_memento("req-1", "fresh").await.unwrap();
    drive_to_completed(&f.engine, "req-1").await;

    let rows_before = f.engine.history("req-1").await.unwrap().len();
    f.originator.restore(&memento, "admin-1").await.unwrap();

    let history = f.engine.history("req-1").await.unwrap();
    assert_eq!(history.len(), rows_before + 1);
    let last = history.last().unwrap();
    assert_eq!(last.old_status.as_deref(), Some("completed"));
    assert_eq!(last.new_status, "pending");
    assert!(last.notes.contains(memento.key()));
    assert_eq!(last.actor_id, "admin-1");
}

#[tokio::test]
async fn caretaker_round_trips_and_lists_by_request() {
    let f = fixture();
    f.engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    f.engine.create(new_request("req-2"), "citizen-1").await.unwrap();

    let first = f.originator.create_memento("req-1", "a").await.unwrap();
    let second = f.originator.create_memento("req-1", "b").await.unwrap();
    let other = f.originator.create_memento("req-2", "c").await.unwrap();
    f.caretaker.save(&first).await.unwrap();
    f.caretaker.save(&second).await.unwrap();
    f.caretaker.save(&other).await.unwrap();

    let fetched = f.caretaker.get(first.key()).await.unwrap().unwrap();
    assert_eq!(fetched, first);

    let listed = f.caretaker.list("req-1").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|m| m.request_id == "req-1"));
}

#[tokio::test]
async fn caretaker_remove_reports_presence() {
    let f = fixture();
    f.engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let memento = f.originator.create_memento("req-1", "a").await.unwrap();
    f.caretaker.save(&memento).await.unwrap();

    assert!(f.caretaker.remove(memento.key()).await.unwrap());
    assert!(!f.caretaker.remove(memento.key()).await.unwrap());
    assert!(f.caretaker.get(memento.key()).await.unwrap().is_none());
}

#[tokio::test]
async fn restore_by_key_round_trips_through_the_store() {
    let f = fixture();
    f.engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let memento = f.originator.create_memento("req-1", "fresh").await.unwrap();
    f.caretaker.save(&memento).await.unwrap();
    drive_to_completed(&f.engine, "req-1").await;

    let restored = f
        .originator
        .restore_by_key(memento.key(), "admin-1")
        .await
        .unwrap();
    assert_eq!(restored.status, RequestStatus::Pending);
}

#[tokio::test]
async fn restore_by_unknown_key_fails_snapshot_not_found() {
    let f = fixture();
    let err = f
        .originator
        .restore_by_key("req-1_0", "admin-1")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SnapshotNotFound { key } if key == "req-1_0"));
}
