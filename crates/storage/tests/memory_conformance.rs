//! Runs the backend-agnostic conformance suite against `MemoryStore`.

use ward_storage::conformance::run_conformance_suite;
use ward_storage::MemoryStore;

#[tokio::test]
async fn memory_store_passes_conformance() {
    let report = run_conformance_suite(|| async { MemoryStore::new() }).await;
    assert_eq!(report.failed, 0, "{report}");
}
