use std::future::Future;

use super::TestResult;
use crate::record::CommandLogRecord;
use crate::RequestStore;

pub(super) async fn run_command_log_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "command_log",
        "load_unknown_actor_is_none",
        load_unknown_actor_is_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "command_log",
        "save_load_round_trips",
        save_load_round_trips(factory).await,
    ));
    results.push(TestResult::from_result(
        "command_log",
        "save_replaces_previous_value",
        save_replaces_previous_value(factory).await,
    ));
    results.push(TestResult::from_result(
        "command_log",
        "actors_are_independent",
        actors_are_independent(factory).await,
    ));

    results
}

fn make_log(actor_id: &str, undo: serde_json::Value) -> CommandLogRecord {
    CommandLogRecord {
        actor_id: actor_id.to_string(),
        undo,
        redo: serde_json::json!([]),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn load_unknown_actor_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.load_command_log("ghost").await.map_err(|e| e.to_string())? {
        None => Ok(()),
        Some(log) => Err(format!("unexpected log for unknown actor: {log:?}")),
    }
}

async fn save_load_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let log = make_log("admin-1", serde_json::json!([{"kind": "update_status"}]));
    s.save_command_log(log.clone())
        .await
        .map_err(|e| e.to_string())?;

    match s
        .load_command_log("admin-1")
        .await
        .map_err(|e| e.to_string())?
    {
        Some(stored) if stored == log => Ok(()),
        Some(stored) => Err(format!("stored log differs: {stored:?}")),
        None => Err("log missing after save".to_string()),
    }
}

async fn save_replaces_previous_value<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.save_command_log(make_log("admin-1", serde_json::json!([1])))
        .await
        .map_err(|e| e.to_string())?;
    s.save_command_log(make_log("admin-1", serde_json::json!([1, 2])))
        .await
        .map_err(|e| e.to_string())?;

    let stored = s
        .load_command_log("admin-1")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("log missing after save")?;
    if stored.undo != serde_json::json!([1, 2]) {
        return Err(format!("old value survived: {:?}", stored.undo));
    }
    Ok(())
}

async fn actors_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.save_command_log(make_log("admin-1", serde_json::json!(["a"])))
        .await
        .map_err(|e| e.to_string())?;
    s.save_command_log(make_log("admin-2", serde_json::json!(["b"])))
        .await
        .map_err(|e| e.to_string())?;

    let one = s
        .load_command_log("admin-1")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("admin-1 log missing")?;
    let two = s
        .load_command_log("admin-2")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("admin-2 log missing")?;
    if one.undo == two.undo {
        return Err("actor logs collided".to_string());
    }
    Ok(())
}
