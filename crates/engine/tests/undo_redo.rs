//! Command invoker integration tests: undo/redo discipline, persistence
//! across invoker reloads, and the end-to-end correction scenario.

use std::sync::Arc;

use ward_core::{NewRequest, NoopNotifier, RequestStatus};
use ward_engine::{CommandInvoker, CommandRequest, EngineError, LifecycleEngine};
use ward_storage::MemoryStore;

fn new_request(id: &str) -> NewRequest {
    NewRequest {
        id: id.to_string(),
        category: "lighting".to_string(),
        title: "street light out".to_string(),
        description: "lamp post dark for a week".to_string(),
        location: "oak ave 3".to_string(),
        priority: "low".to_string(),
    }
}

fn engine() -> LifecycleEngine<MemoryStore> {
    LifecycleEngine::new(Arc::new(MemoryStore::new()), Arc::new(NoopNotifier))
}

async fn invoker(engine: &LifecycleEngine<MemoryStore>, actor: &str) -> CommandInvoker<MemoryStore> {
    CommandInvoker::load(engine.clone(), actor).await.unwrap()
}

fn update_status(id: &str, status: RequestStatus) -> CommandRequest {
    CommandRequest::UpdateStatus {
        request_id: id.to_string(),
        new_status: status,
        notes: "correction".to_string(),
    }
}

fn assign(id: &str, tech: &str) -> CommandRequest {
    CommandRequest::AssignTechnician {
        request_id: id.to_string(),
        technician_id: tech.to_string(),
    }
}

#[tokio::test]
async fn execute_pushes_undo_and_reports_flags() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    let outcome = invoker
        .execute(update_status("req-1", RequestStatus::Reviewed))
        .await
        .unwrap();
    assert_eq!(outcome.request.status, RequestStatus::Reviewed);
    assert!(outcome.can_undo);
    assert!(!outcome.can_redo);
    assert_eq!(invoker.history().len(), 1);
}

#[tokio::test]
async fn undo_restores_previous_status_and_moves_to_redo() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "")
        .await
        .unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    invoker
        .execute(update_status("req-1", RequestStatus::Assigned))
        .await
        .unwrap();
    assert_eq!(
        engine.get("req-1").await.unwrap().status,
        RequestStatus::Assigned
    );

    let outcome = invoker.undo().await.unwrap();
    assert_eq!(outcome.request.status, RequestStatus::Reviewed);
    assert!(!outcome.can_undo);
    assert!(outcome.can_redo);
}

#[tokio::test]
async fn redo_reapplies_and_returns_to_undo_stack() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    invoker
        .execute(update_status("req-1", RequestStatus::Reviewed))
        .await
        .unwrap();
    invoker.undo().await.unwrap();

    let outcome = invoker.redo().await.unwrap();
    assert_eq!(outcome.request.status, RequestStatus::Reviewed);
    assert!(outcome.can_undo);
    assert!(!outcome.can_redo);
}

#[tokio::test]
async fn n_undos_then_n_redos_round_trip() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    invoker
        .execute(update_status("req-1", RequestStatus::Reviewed))
        .await
        .unwrap();
    invoker.execute(assign("req-1", "tech-7")).await.unwrap();
    invoker
        .execute(update_status("req-1", RequestStatus::InProgress))
        .await
        .unwrap();

    let after = engine.get("req-1").await.unwrap();
    assert_eq!(after.status, RequestStatus::InProgress);
    assert_eq!(after.assigned_to.as_deref(), Some("tech-7"));

    for _ in 0..3 {
        invoker.undo().await.unwrap();
    }
    let restored = engine.get("req-1").await.unwrap();
    assert_eq!(restored.status, RequestStatus::Pending);
    assert_eq!(restored.assigned_to, None);
    assert!(!invoker.can_undo());

    for _ in 0..3 {
        invoker.redo().await.unwrap();
    }
    let replayed = engine.get("req-1").await.unwrap();
    assert_eq!(replayed.status, RequestStatus::InProgress);
    assert_eq!(replayed.assigned_to.as_deref(), Some("tech-7"));
    assert!(!invoker.can_redo());
}

#[tokio::test]
async fn fresh_execute_clears_redo() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    invoker
        .execute(update_status("req-1", RequestStatus::Reviewed))
        .await
        .unwrap();
    invoker.undo().await.unwrap();
    assert!(invoker.can_redo());

    invoker
        .execute(update_status("req-1", RequestStatus::Cancelled))
        .await
        .unwrap();
    let err = invoker.redo().await.unwrap_err();
    assert!(matches!(err, EngineError::NothingToRedo));
}

#[tokio::test]
async fn empty_stacks_fail_with_dedicated_errors() {
    let engine = engine();
    let mut invoker = invoker(&engine, "admin-1").await;

    assert!(matches!(
        invoker.undo().await.unwrap_err(),
        EngineError::NothingToUndo
    ));
    assert!(matches!(
        invoker.redo().await.unwrap_err(),
        EngineError::NothingToRedo
    ));
}

#[tokio::test]
async fn undo_fails_once_the_request_moved_on() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    invoker
        .execute(update_status("req-1", RequestStatus::Reviewed))
        .await
        .unwrap();
    // Another path moves the request before the undo lands.
    engine
        .transition("req-1", RequestStatus::Cancelled, "admin-2", "dup report")
        .await
        .unwrap();

    let err = invoker.undo().await.unwrap_err();
    assert!(matches!(err, EngineError::UndoNotPossible { .. }));
    // The failed undo left the stacks untouched.
    assert!(invoker.can_undo());
    assert!(!invoker.can_redo());
    assert_eq!(
        engine.get("req-1").await.unwrap().status,
        RequestStatus::Cancelled
    );
}

#[tokio::test]
async fn assign_undo_restores_assignee_and_status_drive() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "")
        .await
        .unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    invoker.execute(assign("req-1", "tech-7")).await.unwrap();
    let assigned = engine.get("req-1").await.unwrap();
    assert_eq!(assigned.status, RequestStatus::Assigned);
    assert_eq!(assigned.assigned_to.as_deref(), Some("tech-7"));

    invoker.undo().await.unwrap();
    let restored = engine.get("req-1").await.unwrap();
    assert_eq!(restored.status, RequestStatus::Reviewed);
    assert_eq!(restored.assigned_to, None);
}

#[tokio::test]
async fn reassign_undo_keeps_status_and_restores_previous_technician() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "")
        .await
        .unwrap();
    engine.assign("req-1", "tech-7", "admin-1").await.unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    // Already assigned: this execution replaces the technician only.
    invoker.execute(assign("req-1", "tech-9")).await.unwrap();
    let reassigned = engine.get("req-1").await.unwrap();
    assert_eq!(reassigned.status, RequestStatus::Assigned);
    assert_eq!(reassigned.assigned_to.as_deref(), Some("tech-9"));

    invoker.undo().await.unwrap();
    let restored = engine.get("req-1").await.unwrap();
    assert_eq!(restored.status, RequestStatus::Assigned);
    assert_eq!(restored.assigned_to.as_deref(), Some("tech-7"));
}

#[tokio::test]
async fn failed_execute_leaves_stacks_unchanged() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    let err = invoker
        .execute(update_status("req-1", RequestStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalTransition { .. }));
    assert!(!invoker.can_undo());
    assert!(!invoker.can_redo());
}

#[tokio::test]
async fn history_is_ordered_and_stable() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();
    let mut invoker = invoker(&engine, "admin-1").await;

    invoker
        .execute(update_status("req-1", RequestStatus::Reviewed))
        .await
        .unwrap();
    invoker.execute(assign("req-1", "tech-7")).await.unwrap();

    let first: Vec<String> = invoker
        .history()
        .iter()
        .map(|c| c.request_id().to_string())
        .collect();
    let second: Vec<String> = invoker
        .history()
        .iter()
        .map(|c| c.request_id().to_string())
        .collect();
    assert_eq!(first, second);
    assert_eq!(invoker.history().len(), 2);
}

#[tokio::test]
async fn stacks_survive_invoker_reload() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();

    {
        let mut invoker = invoker(&engine, "admin-1").await;
        invoker
            .execute(update_status("req-1", RequestStatus::Reviewed))
            .await
            .unwrap();
    }

    // A fresh invoker for the same actor sees the history.
    let mut reloaded = invoker(&engine, "admin-1").await;
    assert!(reloaded.can_undo());
    let outcome = reloaded.undo().await.unwrap();
    assert_eq!(outcome.request.status, RequestStatus::Pending);

    // A different actor starts empty.
    let other = invoker(&engine, "admin-2").await;
    assert!(!other.can_undo());
}

/// End-to-end correction scenario: triage, command-driven assignment,
/// undo, cancellation, and a rejected late assignment.
#[tokio::test]
async fn correction_scenario_end_to_end() {
    let engine = engine();
    engine.create(new_request("req-1"), "citizen-1").await.unwrap();

    let reviewed = engine
        .transition("req-1", RequestStatus::Reviewed, "admin-1", "ok")
        .await
        .unwrap();
    assert_eq!(reviewed.status, RequestStatus::Reviewed);
    assert_eq!(engine.history("req-1").await.unwrap().len(), 2);

    let mut invoker = invoker(&engine, "admin-1").await;
    invoker
        .execute(update_status("req-1", RequestStatus::Assigned))
        .await
        .unwrap();
    assert_eq!(
        engine.get("req-1").await.unwrap().status,
        RequestStatus::Assigned
    );
    assert_eq!(invoker.history().len(), 1);

    invoker.undo().await.unwrap();
    assert_eq!(
        engine.get("req-1").await.unwrap().status,
        RequestStatus::Reviewed
    );
    assert!(!invoker.can_undo());
    assert!(invoker.can_redo());

    let cancelled = engine
        .transition("req-1", RequestStatus::Cancelled, "admin-1", "never mind")
        .await
        .unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);

    let err = engine
        .transition("req-1", RequestStatus::Assigned, "admin-1", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalTransition { .. }));
}
