use std::future::Future;

use super::{make_request, seed_request, TestResult};
use crate::{RequestStore, StorageError};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "init",
        "insert_creates_request_at_version_0",
        insert_creates_request_at_version_0(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "insert_preserves_all_fields",
        insert_preserves_all_fields(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "double_insert_returns_already_exists",
        double_insert_returns_already_exists(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "double_insert_across_snapshots",
        double_insert_across_snapshots(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "different_requests_are_independent",
        different_requests_are_independent(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "list_requests_filters_by_status",
        list_requests_filters_by_status(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// After insert + commit, the request version must be 0.
async fn insert_creates_request_at_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    let rec = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    if rec.version != 0 {
        return Err(format!("expected version 0, got {}", rec.version));
    }
    Ok(())
}

/// Inserted fields must round-trip unchanged.
async fn insert_preserves_all_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_request("req-1", "pending");
    seed_request(&s, record.clone()).await?;

    let rec = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    if rec != record {
        return Err(format!("stored record differs: {rec:?} vs {record:?}"));
    }
    Ok(())
}

/// Inserting the same id twice within one snapshot must fail.
async fn double_insert_returns_already_exists<S, F, Fut>(factory: &F) -> Result<(), String>
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
    match s
        .insert_request(&mut snap, make_request("req-1", "pending"))
        .await
    {
        Err(StorageError::AlreadyExists { request_id }) if request_id == "req-1" => Ok(()),
        Err(e) => Err(format!("expected AlreadyExists, got {e}")),
        Ok(()) => Err("expected AlreadyExists, got Ok".to_string()),
    }
}

/// Inserting an id that was committed by an earlier snapshot must fail.
async fn double_insert_across_snapshots<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    match s
        .insert_request(&mut snap, make_request("req-1", "pending"))
        .await
    {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(format!("expected AlreadyExists, got {e}")),
        Ok(()) => Err("expected AlreadyExists, got Ok".to_string()),
    }
}

/// Updating one request must not affect another.
async fn different_requests_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;
    seed_request(&s, make_request("req-2", "pending")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.update_request_status(&mut snap, "req-1", 0, "reviewed", "2026-01-01T00:01:00Z")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let other = s.get_request("req-2").await.map_err(|e| e.to_string())?;
    if other.status != "pending" || other.version != 0 {
        return Err(format!(
            "req-2 changed unexpectedly: status={} version={}",
            other.status, other.version
        ));
    }
    Ok(())
}

/// The status filter must restrict the listing.
async fn list_requests_filters_by_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;
    seed_request(&s, make_request("req-2", "reviewed")).await?;
    seed_request(&s, make_request("req-3", "pending")).await?;

    let pending = s
        .list_requests(Some("pending"))
        .await
        .map_err(|e| e.to_string())?;
    if pending.len() != 2 {
        return Err(format!("expected 2 pending requests, got {}", pending.len()));
    }
    let all = s.list_requests(None).await.map_err(|e| e.to_string())?;
    if all.len() != 3 {
        return Err(format!("expected 3 requests, got {}", all.len()));
    }
    Ok(())
}
