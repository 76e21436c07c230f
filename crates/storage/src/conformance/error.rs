use std::future::Future;

use super::{make_request, seed_request, TestResult};
use crate::{RequestStore, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "error",
        "get_unknown_request_returns_not_found",
        get_unknown_request_returns_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "get_for_update_unknown_request_returns_not_found",
        get_for_update_unknown_request_returns_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "update_unknown_request_returns_not_found",
        update_unknown_request_returns_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "overwrite_unknown_request_returns_not_found",
        overwrite_unknown_request_returns_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "not_found_error_carries_request_id",
        not_found_error_carries_request_id(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn get_unknown_request_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_request("ghost").await {
        Err(StorageError::RequestNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected RequestNotFound, got {e}")),
        Ok(_) => Err("expected RequestNotFound, got Ok".to_string()),
    }
}

async fn get_for_update_unknown_request_returns_not_found<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let outcome = match s.get_request_for_update(&mut snap, "ghost").await {
        Err(StorageError::RequestNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected RequestNotFound, got {e}")),
        Ok(_) => Err("expected RequestNotFound, got Ok".to_string()),
    };
    let _ = s.abort_snapshot(snap).await;
    outcome
}

async fn update_unknown_request_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let outcome = match s
        .update_request_status(&mut snap, "ghost", 0, "reviewed", "2026-01-01T00:01:00Z")
        .await
    {
        Err(StorageError::RequestNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected RequestNotFound, got {e}")),
        Ok(_) => Err("expected RequestNotFound, got Ok".to_string()),
    };
    let _ = s.abort_snapshot(snap).await;
    outcome
}

async fn overwrite_unknown_request_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let outcome = match s
        .overwrite_request(&mut snap, make_request("ghost", "pending"))
        .await
    {
        Err(StorageError::RequestNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected RequestNotFound, got {e}")),
        Ok(_) => Err("expected RequestNotFound, got Ok".to_string()),
    };
    let _ = s.abort_snapshot(snap).await;
    outcome
}

async fn not_found_error_carries_request_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;
    match s.get_request("req-2").await {
        Err(StorageError::RequestNotFound { request_id }) if request_id == "req-2" => Ok(()),
        Err(e) => Err(format!("expected RequestNotFound for req-2, got {e}")),
        Ok(_) => Err("expected RequestNotFound, got Ok".to_string()),
    }
}
