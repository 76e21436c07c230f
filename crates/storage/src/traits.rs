use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{
    CommandLogRecord, MementoMeta, MementoRecord, RequestRecord, RequestUpdateRecord,
};

/// The storage trait for service-request backends.
///
/// A `RequestStore` implementation provides durable, transactional storage
/// for request records, the append-only audit log, keyed mementos, and
/// per-actor command logs.
///
/// ## Snapshot Semantics
///
/// All mutating request operations take `&mut Self::Snapshot`, a type
/// representing an in-progress transaction. The lifecycle is:
///
/// 1. `begin_snapshot()` — start a transaction, returns a `Snapshot`
/// 2. Call mutating methods with `&mut snapshot`
/// 3. `commit_snapshot(snapshot)` — commit and consume the transaction
///    OR `abort_snapshot(snapshot)` — roll back and consume the transaction
///
/// If a `Snapshot` is dropped without committing, the underlying transaction
/// MUST be rolled back. Coupling the status update with its audit append in
/// one snapshot is what keeps the two from ever being observed inconsistent.
///
/// ## OCC Conflict Detection
///
/// `update_request_status` and `update_request_assignee` perform an
/// optimistic concurrency check: `UPDATE WHERE version = expected_version`.
/// If zero rows are affected, the method returns
/// `Err(StorageError::ConcurrentConflict { ... })`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared across
/// async task boundaries.
#[async_trait]
pub trait RequestStore: Send + Sync + 'static {
    /// The snapshot (transaction) type used by this storage backend.
    ///
    /// Must be `Send` to allow passing across async task boundaries.
    type Snapshot: Send;

    // ── Snapshot lifecycle ────────────────────────────────────────────────────

    /// Begin a new snapshot (transaction).
    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    /// Commit a snapshot, making all mutations durable.
    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// Abort (roll back) a snapshot, discarding all mutations.
    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    // ── Request operations (within snapshot) ─────────────────────────────────

    /// Insert a new request record.
    ///
    /// Returns `Err(StorageError::AlreadyExists)` if a record with this id
    /// exists.
    async fn insert_request(
        &self,
        snapshot: &mut Self::Snapshot,
        record: RequestRecord,
    ) -> Result<(), StorageError>;

    /// Read a request's current record for update.
    ///
    /// Backends with row locks use `SELECT ... FOR UPDATE` semantics;
    /// OCC-only backends may return the current committed view and rely on
    /// the version check at write/commit time.
    ///
    /// Returns `Err(StorageError::RequestNotFound)` if the record is absent.
    async fn get_request_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        request_id: &str,
    ) -> Result<RequestRecord, StorageError>;

    /// Apply a version-validated status UPDATE (OCC).
    ///
    /// Conditional on `version = expected_version`; zero rows affected
    /// returns `Err(StorageError::ConcurrentConflict)`.
    ///
    /// Returns the new version number on success.
    async fn update_request_status(
        &self,
        snapshot: &mut Self::Snapshot,
        request_id: &str,
        expected_version: i64,
        new_status: &str,
        updated_at: &str,
    ) -> Result<i64, StorageError>;

    /// Apply a version-validated assignment UPDATE (OCC).
    ///
    /// Returns the new version number on success.
    async fn update_request_assignee(
        &self,
        snapshot: &mut Self::Snapshot,
        request_id: &str,
        expected_version: i64,
        assigned_to: Option<&str>,
        updated_at: &str,
    ) -> Result<i64, StorageError>;

    /// Overwrite every caller-visible field of a request with the given
    /// record. The restore path for mementos: no expected-version argument,
    /// the administrative override wins. The version counter still bumps.
    ///
    /// Returns the new version number, or
    /// `Err(StorageError::RequestNotFound)` if the record is absent.
    async fn overwrite_request(
        &self,
        snapshot: &mut Self::Snapshot,
        record: RequestRecord,
    ) -> Result<i64, StorageError>;

    /// Append an audit row.
    ///
    /// CRITICAL: must be called in the SAME snapshot as the status mutation
    /// it records, so the audit log and the status field can never be
    /// observed inconsistent.
    async fn append_request_update(
        &self,
        snapshot: &mut Self::Snapshot,
        record: RequestUpdateRecord,
    ) -> Result<(), StorageError>;

    // ── Query operations (outside snapshot, against pool/connection) ──────────

    /// Read a request's current record without locking.
    ///
    /// Returns `Err(StorageError::RequestNotFound)` if the record is absent.
    async fn get_request(&self, request_id: &str) -> Result<RequestRecord, StorageError>;

    /// List all requests, optionally filtered by status name.
    async fn list_requests(
        &self,
        status_filter: Option<&str>,
    ) -> Result<Vec<RequestRecord>, StorageError>;

    /// List a request's audit rows in append order.
    async fn list_request_updates(
        &self,
        request_id: &str,
    ) -> Result<Vec<RequestUpdateRecord>, StorageError>;

    // ── Memento keyed store ───────────────────────────────────────────────────

    /// Store a memento under its key, replacing any previous value.
    async fn put_memento(&self, record: MementoRecord) -> Result<(), StorageError>;

    /// Fetch a memento by key. `None` if the key is unknown.
    async fn get_memento(&self, key: &str) -> Result<Option<MementoRecord>, StorageError>;

    /// List memento metadata for one request, in creation order.
    async fn list_mementos(&self, request_id: &str) -> Result<Vec<MementoMeta>, StorageError>;

    /// Delete a memento by key. Returns whether a record was removed.
    async fn remove_memento(&self, key: &str) -> Result<bool, StorageError>;

    // ── Command log persistence (per actor) ───────────────────────────────────

    /// Load an actor's persisted undo/redo stacks. `None` if the actor has
    /// no history yet.
    async fn load_command_log(
        &self,
        actor_id: &str,
    ) -> Result<Option<CommandLogRecord>, StorageError>;

    /// Persist an actor's undo/redo stacks, replacing the previous value.
    async fn save_command_log(&self, record: CommandLogRecord) -> Result<(), StorageError>;
}
