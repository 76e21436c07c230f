use std::future::Future;

use super::{make_request, seed_request, TestResult};
use crate::{RequestStore, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "version",
        "status_update_bumps_version",
        status_update_bumps_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "stale_expected_version_conflicts",
        stale_expected_version_conflicts(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "assignee_update_bumps_version",
        assignee_update_bumps_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "overwrite_bumps_version_without_expected",
        overwrite_bumps_version_without_expected(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "competing_snapshots_one_wins",
        competing_snapshots_one_wins(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn status_update_bumps_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let v = s
        .update_request_status(&mut snap, "req-1", 0, "reviewed", "2026-01-01T00:01:00Z")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if v != 1 {
        return Err(format!("expected new version 1, got {v}"));
    }
    let rec = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    if rec.version != 1 || rec.status != "reviewed" {
        return Err(format!(
            "committed record wrong: status={} version={}",
            rec.status, rec.version
        ));
    }
    Ok(())
}

async fn stale_expected_version_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let outcome = match s
        .update_request_status(&mut snap, "req-1", 7, "reviewed", "2026-01-01T00:01:00Z")
        .await
    {
        Err(StorageError::ConcurrentConflict {
            request_id,
            expected_version,
        }) if request_id == "req-1" && expected_version == 7 => Ok(()),
        Err(e) => Err(format!("expected ConcurrentConflict, got {e}")),
        Ok(v) => Err(format!("stale update succeeded with version {v}")),
    };
    let _ = s.abort_snapshot(snap).await;
    outcome
}

async fn assignee_update_bumps_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "reviewed")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let v = s
        .update_request_assignee(
            &mut snap,
            "req-1",
            0,
            Some("tech-9"),
            "2026-01-01T00:01:00Z",
        )
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if v != 1 {
        return Err(format!("expected new version 1, got {v}"));
    }
    let rec = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    if rec.assigned_to.as_deref() != Some("tech-9") {
        return Err(format!("assignee not stored: {:?}", rec.assigned_to));
    }
    Ok(())
}

async fn overwrite_bumps_version_without_expected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "completed")).await?;

    // Overwrite with a stale captured copy; the write must win regardless
    // of the captured version.
    let mut captured = make_request("req-1", "pending");
    captured.version = 0;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let v = s
        .overwrite_request(&mut snap, captured)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if v != 1 {
        return Err(format!("expected new version 1, got {v}"));
    }
    let rec = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    if rec.status != "pending" || rec.version != 1 {
        return Err(format!(
            "overwrite not applied: status={} version={}",
            rec.status, rec.version
        ));
    }
    Ok(())
}

/// Two snapshots race on the same request: exactly one commits.
async fn competing_snapshots_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    let mut a = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut b = s.begin_snapshot().await.map_err(|e| e.to_string())?;

    s.update_request_status(&mut a, "req-1", 0, "reviewed", "2026-01-01T00:01:00Z")
        .await
        .map_err(|e| e.to_string())?;
    s.update_request_status(&mut b, "req-1", 0, "cancelled", "2026-01-01T00:01:05Z")
        .await
        .map_err(|e| e.to_string())?;

    s.commit_snapshot(a).await.map_err(|e| e.to_string())?;
    match s.commit_snapshot(b).await {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Err(e) => return Err(format!("expected ConcurrentConflict, got {e}")),
        Ok(()) => return Err("both competing snapshots committed".to_string()),
    }

    let rec = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    if rec.status != "reviewed" || rec.version != 1 {
        return Err(format!(
            "winner not applied cleanly: status={} version={}",
            rec.status, rec.version
        ));
    }
    Ok(())
}
