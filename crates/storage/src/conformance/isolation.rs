use std::future::Future;

use super::{make_request, make_update, seed_request, TestResult};
use crate::{RequestStore, StorageError};

pub(super) async fn run_isolation_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "isolation",
        "insert_not_visible_before_commit",
        insert_not_visible_before_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "isolation",
        "insert_visible_after_commit",
        insert_visible_after_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "isolation",
        "update_not_visible_before_commit",
        update_not_visible_before_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "isolation",
        "abort_rolls_back_all_writes",
        abort_rolls_back_all_writes(factory).await,
    ));
    results.push(TestResult::from_result(
        "isolation",
        "snapshot_reads_its_own_writes",
        snapshot_reads_its_own_writes(factory).await,
    ));
    results.push(TestResult::from_result(
        "isolation",
        "commit_is_all_or_nothing",
        commit_is_all_or_nothing(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn insert_not_visible_before_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_request(&mut snap, make_request("req-1", "pending"))
        .await
        .map_err(|e| e.to_string())?;

    let outcome = match s.get_request("req-1").await {
        Err(StorageError::RequestNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected RequestNotFound, got {e}")),
        Ok(_) => Err("uncommitted insert visible outside snapshot".to_string()),
    };
    let _ = s.abort_snapshot(snap).await;
    outcome
}

async fn insert_visible_after_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;
    s.get_request("req-1")
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

async fn update_not_visible_before_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_request_status(&mut snap, "req-1", 0, "reviewed", "2026-01-01T00:01:00Z")
        .await
        .map_err(|e| e.to_string())?;

    let committed = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    let outcome = if committed.status == "pending" && committed.version == 0 {
        Ok(())
    } else {
        Err(format!(
            "uncommitted update visible: status={} version={}",
            committed.status, committed.version
        ))
    };
    let _ = s.abort_snapshot(snap).await;
    outcome
}

async fn abort_rolls_back_all_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_request_status(&mut snap, "req-1", 0, "reviewed", "2026-01-01T00:01:00Z")
        .await
        .map_err(|e| e.to_string())?;
    s.append_request_update(
        &mut snap,
        make_update("upd-1", "req-1", Some("pending"), "reviewed"),
    )
    .await
    .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    if rec.status != "pending" {
        return Err(format!("aborted status update applied: {}", rec.status));
    }
    let updates = s
        .list_request_updates("req-1")
        .await
        .map_err(|e| e.to_string())?;
    if !updates.is_empty() {
        return Err(format!("aborted audit append applied: {} rows", updates.len()));
    }
    Ok(())
}

async fn snapshot_reads_its_own_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_request_status(&mut snap, "req-1", 0, "reviewed", "2026-01-01T00:01:00Z")
        .await
        .map_err(|e| e.to_string())?;
    let rec = s
        .get_request_for_update(&mut snap, "req-1")
        .await
        .map_err(|e| e.to_string())?;
    let outcome = if rec.status == "reviewed" && rec.version == 1 {
        Ok(())
    } else {
        Err(format!(
            "snapshot did not see its own write: status={} version={}",
            rec.status, rec.version
        ))
    };
    let _ = s.abort_snapshot(snap).await;
    outcome
}

/// A commit that fails must not apply any of the snapshot's writes.
async fn commit_is_all_or_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;
    seed_request(&s, make_request("req-2", "pending")).await?;

    // Stage updates to both requests, then invalidate req-1's base version
    // by committing a competing snapshot first.
    let mut loser = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_request_status(&mut loser, "req-1", 0, "reviewed", "2026-01-01T00:01:00Z")
        .await
        .map_err(|e| e.to_string())?;
    s.update_request_status(&mut loser, "req-2", 0, "reviewed", "2026-01-01T00:01:00Z")
        .await
        .map_err(|e| e.to_string())?;

    let mut winner = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_request_status(&mut winner, "req-1", 0, "cancelled", "2026-01-01T00:01:10Z")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(winner).await.map_err(|e| e.to_string())?;

    match s.commit_snapshot(loser).await {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Err(e) => return Err(format!("expected ConcurrentConflict, got {e}")),
        Ok(()) => return Err("conflicting commit succeeded".to_string()),
    }

    // req-2 must be untouched even though its staged write was valid.
    let rec = s.get_request("req-2").await.map_err(|e| e.to_string())?;
    if rec.status != "pending" || rec.version != 0 {
        return Err(format!(
            "partial commit applied to req-2: status={} version={}",
            rec.status, rec.version
        ));
    }
    Ok(())
}
