use std::future::Future;

use super::{make_request, TestResult};
use crate::record::MementoRecord;
use crate::RequestStore;

pub(super) async fn run_memento_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "mementos",
        "put_get_round_trips",
        put_get_round_trips(factory).await,
    ));
    results.push(TestResult::from_result(
        "mementos",
        "get_unknown_key_is_none",
        get_unknown_key_is_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "mementos",
        "list_is_scoped_and_ordered",
        list_is_scoped_and_ordered(factory).await,
    ));
    results.push(TestResult::from_result(
        "mementos",
        "remove_reports_presence",
        remove_reports_presence(factory).await,
    ));
    results.push(TestResult::from_result(
        "mementos",
        "removed_key_no_longer_listed",
        removed_key_no_longer_listed(factory).await,
    ));

    results
}

fn make_memento(key: &str, request_id: &str, created_at: &str) -> MementoRecord {
    MementoRecord {
        key: key.to_string(),
        request_id: request_id.to_string(),
        label: "before correction".to_string(),
        created_at: created_at.to_string(),
        captured: make_request(request_id, "reviewed"),
    }
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn put_get_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let memento = make_memento("req-1_100", "req-1", "2026-01-01T00:00:10Z");
    s.put_memento(memento.clone())
        .await
        .map_err(|e| e.to_string())?;

    match s.get_memento("req-1_100").await.map_err(|e| e.to_string())? {
        Some(stored) if stored == memento => Ok(()),
        Some(stored) => Err(format!("stored memento differs: {stored:?}")),
        None => Err("memento missing after put".to_string()),
    }
}

async fn get_unknown_key_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_memento("ghost_0").await.map_err(|e| e.to_string())? {
        None => Ok(()),
        Some(m) => Err(format!("unexpected memento for unknown key: {m:?}")),
    }
}

async fn list_is_scoped_and_ordered<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put_memento(make_memento("req-1_200", "req-1", "2026-01-01T00:00:20Z"))
        .await
        .map_err(|e| e.to_string())?;
    s.put_memento(make_memento("req-1_100", "req-1", "2026-01-01T00:00:10Z"))
        .await
        .map_err(|e| e.to_string())?;
    s.put_memento(make_memento("req-2_150", "req-2", "2026-01-01T00:00:15Z"))
        .await
        .map_err(|e| e.to_string())?;

    let metas = s.list_mementos("req-1").await.map_err(|e| e.to_string())?;
    let keys: Vec<&str> = metas.iter().map(|m| m.key.as_str()).collect();
    if keys != ["req-1_100", "req-1_200"] {
        return Err(format!("listing wrong: {keys:?}"));
    }
    Ok(())
}

async fn remove_reports_presence<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put_memento(make_memento("req-1_100", "req-1", "2026-01-01T00:00:10Z"))
        .await
        .map_err(|e| e.to_string())?;

    let removed = s.remove_memento("req-1_100").await.map_err(|e| e.to_string())?;
    if !removed {
        return Err("remove returned false for existing key".to_string());
    }
    let removed_again = s.remove_memento("req-1_100").await.map_err(|e| e.to_string())?;
    if removed_again {
        return Err("remove returned true for already-removed key".to_string());
    }
    Ok(())
}

async fn removed_key_no_longer_listed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.put_memento(make_memento("req-1_100", "req-1", "2026-01-01T00:00:10Z"))
        .await
        .map_err(|e| e.to_string())?;
    s.remove_memento("req-1_100")
        .await
        .map_err(|e| e.to_string())?;

    let metas = s.list_mementos("req-1").await.map_err(|e| e.to_string())?;
    if !metas.is_empty() {
        return Err(format!("removed memento still listed: {metas:?}"));
    }
    match s.get_memento("req-1_100").await.map_err(|e| e.to_string())? {
        None => Ok(()),
        Some(_) => Err("removed memento still retrievable".to_string()),
    }
}
