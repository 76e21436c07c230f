/// All errors that can be returned by a RequestStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency control conflict -- another transaction
    /// modified the request concurrently. The expected version was not found.
    #[error("concurrent conflict on request {request_id}: expected version {expected_version}")]
    ConcurrentConflict {
        request_id: String,
        expected_version: i64,
    },

    /// No request record with the given id.
    #[error("request not found: {request_id}")]
    RequestNotFound { request_id: String },

    /// A record with this id already exists.
    #[error("request already exists: {request_id}")]
    AlreadyExists { request_id: String },

    /// A backend-specific storage error (DB connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
