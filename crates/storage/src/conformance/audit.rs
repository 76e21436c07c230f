use std::future::Future;

use super::{make_request, make_update, seed_request, TestResult};
use crate::RequestStore;

pub(super) async fn run_audit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "audit",
        "append_visible_after_commit",
        append_visible_after_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "audit",
        "appends_preserve_order",
        appends_preserve_order(factory).await,
    ));
    results.push(TestResult::from_result(
        "audit",
        "listing_is_scoped_to_request",
        listing_is_scoped_to_request(factory).await,
    ));
    results.push(TestResult::from_result(
        "audit",
        "status_update_and_audit_commit_together",
        status_update_and_audit_commit_together(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn append_visible_after_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.append_request_update(&mut snap, make_update("upd-1", "req-1", None, "pending"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let updates = s
        .list_request_updates("req-1")
        .await
        .map_err(|e| e.to_string())?;
    if updates.len() != 1 {
        return Err(format!("expected 1 audit row, got {}", updates.len()));
    }
    if updates[0].old_status.is_some() || updates[0].new_status != "pending" {
        return Err(format!("audit row content wrong: {:?}", updates[0]));
    }
    Ok(())
}

async fn appends_preserve_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;

    for (i, (old, new)) in [(None, "pending"), (Some("pending"), "reviewed")]
        .into_iter()
        .enumerate()
    {
        let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
        s.append_request_update(&mut snap, make_update(&format!("upd-{i}"), "req-1", old, new))
            .await
            .map_err(|e| e.to_string())?;
        s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    }

    let updates = s
        .list_request_updates("req-1")
        .await
        .map_err(|e| e.to_string())?;
    let ids: Vec<&str> = updates.iter().map(|u| u.id.as_str()).collect();
    if ids != ["upd-0", "upd-1"] {
        return Err(format!("append order not preserved: {ids:?}"));
    }
    Ok(())
}

async fn listing_is_scoped_to_request<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_request(&s, make_request("req-1", "pending")).await?;
    seed_request(&s, make_request("req-2", "pending")).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.append_request_update(&mut snap, make_update("upd-1", "req-1", None, "pending"))
        .await
        .map_err(|e| e.to_string())?;
    s.append_request_update(&mut snap, make_update("upd-2", "req-2", None, "pending"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let updates = s
        .list_request_updates("req-1")
        .await
        .map_err(|e| e.to_string())?;
    if updates.len() != 1 || updates[0].request_id != "req-1" {
        return Err(format!("scoping failed: {updates:?}"));
    }
    Ok(())
}

/// The audit row and the status mutation land atomically or not at all.
async fn status_update_and_audit_commit_together<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let rec = s.get_request("req-1").await.map_err(|e| e.to_string())?;
    let updates = s
        .list_request_updates("req-1")
        .await
        .map_err(|e| e.to_string())?;
    if rec.status != "reviewed" || updates.len() != 1 {
        return Err(format!(
            "status and audit inconsistent: status={} rows={}",
            rec.status,
            updates.len()
        ));
    }
    Ok(())
}
