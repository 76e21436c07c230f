//! The closed request status set and its transition table.
//!
//! Key invariant: the table below is the single source of truth for which
//! status changes are legal. Every mutation path except memento restore
//! consults it before writing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UnknownStateError;

/// Lifecycle status of a service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Submitted by a citizen, not yet looked at.
    Pending,
    /// Triaged by an administrator.
    Reviewed,
    /// A technician has been assigned.
    Assigned,
    /// The technician is on site / working.
    InProgress,
    /// Work finished. Terminal.
    Completed,
    /// Withdrawn or rejected. Terminal.
    Cancelled,
}

/// All statuses, in lifecycle order.
pub const ALL_STATUSES: [RequestStatus; 6] = [
    RequestStatus::Pending,
    RequestStatus::Reviewed,
    RequestStatus::Assigned,
    RequestStatus::InProgress,
    RequestStatus::Completed,
    RequestStatus::Cancelled,
];

impl RequestStatus {
    /// Snake_case wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Reviewed => "reviewed",
            RequestStatus::Assigned => "assigned",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a wire name. Anything outside the closed set is an error,
    /// surfaced when a stored record carries a corrupt status value.
    pub fn parse(value: &str) -> Result<Self, UnknownStateError> {
        match value {
            "pending" => Ok(RequestStatus::Pending),
            "reviewed" => Ok(RequestStatus::Reviewed),
            "assigned" => Ok(RequestStatus::Assigned),
            "in_progress" => Ok(RequestStatus::InProgress),
            "completed" => Ok(RequestStatus::Completed),
            "cancelled" => Ok(RequestStatus::Cancelled),
            other => Err(UnknownStateError::new(other)),
        }
    }

    /// Statuses this one may legally transition to.
    pub fn allowed_targets(&self) -> &'static [RequestStatus] {
        match self {
            RequestStatus::Pending => &[RequestStatus::Reviewed, RequestStatus::Cancelled],
            RequestStatus::Reviewed => &[RequestStatus::Assigned, RequestStatus::Cancelled],
            RequestStatus::Assigned => &[RequestStatus::InProgress, RequestStatus::Cancelled],
            RequestStatus::InProgress => &[RequestStatus::Completed, RequestStatus::Cancelled],
            RequestStatus::Completed => &[],
            RequestStatus::Cancelled => &[],
        }
    }

    /// Pure predicate over the transition table.
    pub fn can_transition_to(&self, target: RequestStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::parse(s)
    }
}
