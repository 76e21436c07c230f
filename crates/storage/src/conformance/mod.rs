//! Conformance test suite for `RequestStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `RequestStore` implementation can run to verify correctness. The suite
//! covers:
//!
//! - **Initialization**: request creation, duplicate detection
//! - **Error handling**: correct error variants for invalid operations
//! - **Snapshot isolation**: uncommitted writes invisible, abort rolls back
//! - **Version validation / OCC**: optimistic concurrency conflict detection
//! - **Audit log**: append-only coupling with status mutations
//! - **Mementos**: keyed put/get/list/remove semantics
//! - **Command log**: per-actor round-trip and replacement
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function
//! that creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use ward_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_postgres_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod audit;
mod command_log;
mod error;
mod init;
mod isolation;
mod mementos;
mod version;

use std::fmt;
use std::future::Future;

use crate::record::{RequestRecord, RequestUpdateRecord};
use crate::RequestStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "isolation", "version").
    pub category: String,
    /// Test name (e.g. "insert_creates_request_at_version_0").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: RequestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(isolation::run_isolation_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(audit::run_audit_tests(&factory).await);
    results.extend(mementos::run_memento_tests(&factory).await);
    results.extend(command_log::run_command_log_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_request(id: &str, status: &str) -> RequestRecord {
    RequestRecord {
        id: id.to_string(),
        status: status.to_string(),
        category: "roads".to_string(),
        title: "pothole".to_string(),
        description: "deep pothole near the crosswalk".to_string(),
        location: "main st / 4th ave".to_string(),
        priority: "normal".to_string(),
        assigned_to: None,
        version: 0,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn make_update(id: &str, request_id: &str, old: Option<&str>, new: &str) -> RequestUpdateRecord {
    RequestUpdateRecord {
        id: id.to_string(),
        request_id: request_id.to_string(),
        actor_id: "admin-1".to_string(),
        old_status: old.map(str::to_owned),
        new_status: new.to_string(),
        notes: "conformance".to_string(),
        created_at: "2026-01-01T00:00:30Z".to_string(),
    }
}

/// Insert `record` and commit, for tests that need a seeded store.
async fn seed_request<S: RequestStore>(store: &S, record: RequestRecord) -> Result<(), String> {
    let mut snap = store.begin_snapshot().await.map_err(|e| e.to_string())?;
    store
        .insert_request(&mut snap, record)
        .await
        .map_err(|e| e.to_string())?;
    store.commit_snapshot(snap).await.map_err(|e| e.to_string())
}
