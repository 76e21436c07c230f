use serde::{Deserialize, Serialize};

use crate::status::RequestStatus;

/// A service request as seen by callers of the lifecycle engine.
///
/// The stored form keeps `status` as a plain string so a corrupt value is
/// surfaced as an [`UnknownStateError`](crate::UnknownStateError) at the
/// engine boundary; this type is only constructed from a record whose
/// status already parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: String,
    pub status: RequestStatus,
    pub category: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub priority: String,
    /// Technician reference, set once the request is assigned.
    pub assigned_to: Option<String>,
    /// Monotonic version counter, bumped on every write.
    pub version: i64,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
}

/// Caller-supplied fields for creating a request. Requests always start
/// in `pending`; status and timestamps are assigned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    pub id: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub priority: String,
}
