use serde::{Deserialize, Serialize};

/// Stored form of a service request.
///
/// `status` is kept as a plain string so a corrupt value surfaces as a
/// structured error at the engine boundary instead of failing
/// deserialization here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: String,
    pub status: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub priority: String,
    pub assigned_to: Option<String>,
    /// Monotonic version counter used for the OCC check on updates.
    pub version: i64,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
}

/// Append-only audit entry: one row per successful status change,
/// including the initial creation into `pending` and memento restores.
/// Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestUpdateRecord {
    pub id: String,
    pub request_id: String,
    pub actor_id: String,
    /// None for the creation row.
    pub old_status: Option<String>,
    pub new_status: String,
    pub notes: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
}

/// A keyed full-record snapshot row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MementoRecord {
    /// Composite key, `{request_id}_{timestamp}` in the reference layout.
    /// Any unique composite is acceptable for a backend.
    pub key: String,
    pub request_id: String,
    pub label: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// Full immutable copy of the request's fields at capture time.
    pub captured: RequestRecord,
}

/// Listing projection for a stored memento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MementoMeta {
    pub key: String,
    pub request_id: String,
    pub label: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
}

impl From<&MementoRecord> for MementoMeta {
    fn from(record: &MementoRecord) -> Self {
        MementoMeta {
            key: record.key.clone(),
            request_id: record.request_id.clone(),
            label: record.label.clone(),
            created_at: record.created_at.clone(),
        }
    }
}

/// Persisted undo/redo stacks for one actor.
///
/// The stacks are opaque JSON arrays; the engine owns the command schema
/// and the store only round-trips it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLogRecord {
    pub actor_id: String,
    /// Executed commands, most-recent-last.
    pub undo: serde_json::Value,
    /// Undone commands, most-recent-last.
    pub redo: serde_json::Value,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
}
