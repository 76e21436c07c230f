use ward_core::RequestStatus;
use ward_storage::StorageError;

/// All errors surfaced by the engine's mutation paths.
///
/// Every variant is a local, recoverable condition returned to the caller
/// as a structured result; none are used for internal control flow.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No request with this id.
    #[error("service request not found: {request_id}")]
    NotFound { request_id: String },

    /// The target status is not reachable from the current one.
    #[error("illegal transition from '{from}' to '{to}' for request {request_id}")]
    IllegalTransition {
        request_id: String,
        from: RequestStatus,
        to: RequestStatus,
    },

    /// A stored status value outside the closed set.
    #[error("unknown status '{value}' on request {request_id}")]
    UnknownState { request_id: String, value: String },

    /// Undo stack empty.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Redo stack empty.
    #[error("nothing to redo")]
    NothingToRedo,

    /// The inverse operation is not legal from the current state.
    #[error("undo not possible: {reason}")]
    UndoNotPossible { reason: String },

    /// No stored snapshot under this key.
    #[error("snapshot not found: {key}")]
    SnapshotNotFound { key: String },

    /// Persistence failure, surfaced unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
