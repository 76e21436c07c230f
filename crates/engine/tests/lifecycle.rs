//! Lifecycle engine integration tests: creation, the full legality grid,
//! audit coupling, and best-effort hooks.

use std::sync::{Arc, Mutex};

use ward_core::status::ALL_STATUSES;
use ward_core::{
    NewRequest, NoopNotifier, Notifier, NotifyError, RequestStatus, StatusEvent, StatusPhase,
};
use ward_engine::{EngineError, LifecycleEngine};
use ward_storage::{MemoryStore, RequestRecord, RequestStore};

fn new_request(id: &str) -> NewRequest {
    NewRequest {
        id: id.to_string(),
        category: "water".to_string(),
        title: "burst main".to_string(),
        description: "water pooling on the street".to_string(),
        location: "elm st 12".to_string(),
        priority: "high".to_string(),
    }
}

fn engine_with(notifier: Arc<dyn Notifier>) -> (Arc<MemoryStore>, LifecycleEngine<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = LifecycleEngine::new(Arc::clone(&store), notifier);
    (store, engine)
}

fn engine() -> (Arc<MemoryStore>, LifecycleEngine<MemoryStore>) {
    engine_with(Arc::new(NoopNotifier))
}

/// Seed a record directly at an arbitrary status, bypassing the engine.
async fn seed_at(store: &MemoryStore, id: &str, status: &str) {
    let record = RequestRecord {
        id: id.to_string(),
        status: status.to_string(),
        category: "roads".to_string(),
        title: "pothole".to_string(),
        description: "deep pothole".to_string(),
        location: "main st".to_string(),
        priority: "normal".to_string(),
        assigned_to: None,
        version: 0,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    };
    let mut snap = store.begin_snapshot().await.unwrap();
    store.insert_request(&mut snap, record).await.unwrap();
    store.commit_snapshot(snap).await.unwrap();
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<StatusEvent>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &StatusEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Fails every delivery.
struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, event: &StatusEvent) -> Result<(), NotifyError> {
        Err(NotifyError {
            request_id: event.request_id.clone(),
            reason: "smtp unreachable".to_string(),
        })
    }
}

#[tokio::test]
async fn create_starts_pending_with_creation_audit_row() {
    let (_store, engine) = engine();
    let created = engine.create(new_request("req-1"), "citizen-1").await.unwrap();

    assert_eq!(created.status, RequestStatus::Pending);
    assert_eq!(created.version, 0);
    assert_eq!(created.assigned_to, None);

    let history = engine.history("req-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_status, None);
    assert_eq!(history[0].new_status, "pending");
    assert_eq!(history[0].actor_id, "citizen-1");
}

#[tokio::test]
async fn legal_transition_updates_status_and_appends_one_row() {
    let (_store, engine) = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();

    let updated = engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "triage ok")
        .await
        .unwrap();
    assert_eq!(updated.status, RequestStatus::Reviewed);
    assert_eq!(updated.version, 1);

    let history = engine.history("req-1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].old_status.as_deref(), Some("pending"));
    assert_eq!(history[1].new_status, "reviewed");
    assert_eq!(history[1].notes, "triage ok");
}

#[tokio::test]
async fn every_legal_pair_succeeds() {
    for from in ALL_STATUSES {
        for to in from.allowed_targets() {
            let (store, engine) = engine();
            seed_at(&store, "req-1", from.as_str()).await;

            let updated = engine
                .transition("req-1", *to, "admin-1", "grid")
                .await
                .unwrap();
            assert_eq!(updated.status, *to, "{from} -> {to}");

            let history = engine.history("req-1").await.unwrap();
            assert_eq!(history.len(), 1, "{from} -> {to}");
            assert_eq!(history[0].old_status.as_deref(), Some(from.as_str()));
            assert_eq!(history[0].new_status, to.as_str());
        }
    }
}

#[tokio::test]
async fn every_illegal_pair_fails_without_mutation() {
    for from in ALL_STATUSES {
        for to in ALL_STATUSES {
            if from.can_transition_to(to) {
                continue;
            }
            let (store, engine) = engine();
            seed_at(&store, "req-1", from.as_str()).await;

            let err = engine
                .transition("req-1", to, "admin-1", "grid")
                .await
                .unwrap_err();
            assert!(
                matches!(err, EngineError::IllegalTransition { .. }),
                "{from} -> {to}: got {err}"
            );

            let record = store.get_request("req-1").await.unwrap();
            assert_eq!(record.status, from.as_str(), "{from} -> {to}: status mutated");
            assert_eq!(record.version, 0, "{from} -> {to}: version bumped");
            assert!(
                engine.history("req-1").await.unwrap().is_empty(),
                "{from} -> {to}: audit row appended"
            );
        }
    }
}

#[tokio::test]
async fn transition_on_unknown_request_fails_not_found() {
    let (_store, engine) = engine();
    let err = engine
        .transition("ghost", RequestStatus::Reviewed, "admin-1", "")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { request_id } if request_id == "ghost"));
}

#[tokio::test]
async fn corrupt_stored_status_surfaces_unknown_state() {
    let (store, engine) = engine();
    seed_at(&store, "req-1", "on_hold").await;

    let err = engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownState { value, .. } if value == "on_hold"));
}

#[tokio::test]
async fn failing_notifier_does_not_poison_transitions() {
    let (_store, engine) = engine_with(Arc::new(FailingNotifier));
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();

    let updated = engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "")
        .await
        .unwrap();
    assert_eq!(updated.status, RequestStatus::Reviewed);
    assert_eq!(engine.history("req-1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn hooks_fire_in_exit_then_enter_order() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (_store, engine) = engine_with(notifier.clone() as Arc<dyn Notifier>);

    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "")
        .await
        .unwrap();

    let events = notifier.events.lock().unwrap();
    let shape: Vec<(RequestStatus, StatusPhase)> =
        events.iter().map(|e| (e.status, e.phase)).collect();
    assert_eq!(
        shape,
        vec![
            (RequestStatus::Pending, StatusPhase::Entered),
            (RequestStatus::Pending, StatusPhase::Exited),
            (RequestStatus::Reviewed, StatusPhase::Entered),
        ]
    );
}

#[tokio::test]
async fn assign_sets_technician_and_drives_status() {
    let (_store, engine) = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "")
        .await
        .unwrap();

    let updated = engine.assign("req-1", "tech-7", "admin-1").await.unwrap();
    assert_eq!(updated.status, RequestStatus::Assigned);
    assert_eq!(updated.assigned_to.as_deref(), Some("tech-7"));

    let history = engine.history("req-1").await.unwrap();
    assert_eq!(history.last().unwrap().new_status, "assigned");
}

#[tokio::test]
async fn assign_past_assigned_keeps_status() {
    let (store, engine) = engine();
    seed_at(&store, "req-1", "in_progress").await;

    let updated = engine.assign("req-1", "tech-7", "admin-1").await.unwrap();
    assert_eq!(updated.status, RequestStatus::InProgress);
    assert_eq!(updated.assigned_to.as_deref(), Some("tech-7"));
    // No status change, no audit row.
    assert!(engine.history("req-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn assign_on_pending_fails_and_mutates_nothing() {
    let (store, engine) = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();

    let err = engine.assign("req-1", "tech-7", "admin-1").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::IllegalTransition {
            from: RequestStatus::Pending,
            to: RequestStatus::Assigned,
            ..
        }
    ));
    let record = store.get_request("req-1").await.unwrap();
    assert_eq!(record.status, "pending");
    assert_eq!(record.assigned_to, None);
}

#[tokio::test]
async fn history_read_is_idempotent() {
    let (_store, engine) = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "")
        .await
        .unwrap();

    let first = engine.history("req-1").await.unwrap();
    let second = engine.history("req-1").await.unwrap();
    assert_eq!(first, second);
}
