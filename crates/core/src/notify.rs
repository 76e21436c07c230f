//! Side-effect capability for transition hooks.
//!
//! Delivery channels (email, SMS, in-app) live outside this crate. The
//! engine invokes [`Notifier::notify`] from state entry/exit hooks and
//! treats failures as non-fatal: a notification that cannot be delivered
//! never unwinds a status mutation that already committed.

use crate::status::RequestStatus;

/// Whether the event was raised on entering or leaving a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPhase {
    Entered,
    Exited,
}

/// A status-change side-effect event handed to the [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub request_id: String,
    pub status: RequestStatus,
    pub phase: StatusPhase,
    /// Technician on the request at event time, when one is set.
    pub assigned_to: Option<String>,
    /// Human-readable summary, e.g. "request is under review".
    pub message: String,
}

/// Notification delivery failed. Carried back to the engine, which logs
/// it and continues.
#[derive(Debug, Clone, thiserror::Error)]
#[error("notification failed for request {request_id}: {reason}")]
pub struct NotifyError {
    pub request_id: String,
    pub reason: String,
}

/// Capability trait for dispatching status events to collaborators.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &StatusEvent) -> Result<(), NotifyError>;
}

/// Discards every event. Default wiring for tests and callers that
/// observe the audit trail instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &StatusEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}
