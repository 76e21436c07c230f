//! State registry: status-name lookup, legality checks, entry/exit hooks.
//!
//! The registry is a fixed map from status name to a [`State`] descriptor.
//! Descriptors are pure data plus two side-effecting hooks; the hooks emit
//! a [`StatusEvent`] through the injected [`Notifier`] and report delivery
//! failure as a `Result` rather than panicking, so the caller can treat
//! them as best-effort.

use crate::error::UnknownStateError;
use crate::notify::{Notifier, NotifyError, StatusEvent, StatusPhase};
use crate::request::ServiceRequest;
use crate::status::{RequestStatus, ALL_STATUSES};

/// Descriptor for one status: its legal outgoing transitions and its
/// entry/exit side effects.
#[derive(Debug, Clone, Copy)]
pub struct State {
    status: RequestStatus,
}

impl State {
    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// Pure predicate over the transition table.
    pub fn can_transition_to(&self, target: RequestStatus) -> bool {
        self.status.can_transition_to(target)
    }

    /// Statuses this state may legally transition to.
    pub fn allowed_targets(&self) -> &'static [RequestStatus] {
        self.status.allowed_targets()
    }

    /// Entry hook: announce the new status to collaborators.
    pub fn on_enter(
        &self,
        record: &ServiceRequest,
        notifier: &dyn Notifier,
    ) -> Result<(), NotifyError> {
        notifier.notify(&self.event(record, StatusPhase::Entered))
    }

    /// Exit hook: announce that the request left this status.
    pub fn on_exit(
        &self,
        record: &ServiceRequest,
        notifier: &dyn Notifier,
    ) -> Result<(), NotifyError> {
        notifier.notify(&self.event(record, StatusPhase::Exited))
    }

    fn event(&self, record: &ServiceRequest, phase: StatusPhase) -> StatusEvent {
        let message = match (phase, self.status) {
            (StatusPhase::Entered, RequestStatus::Pending) => "request received",
            (StatusPhase::Entered, RequestStatus::Reviewed) => "request is under review",
            (StatusPhase::Entered, RequestStatus::Assigned) => "technician assigned",
            (StatusPhase::Entered, RequestStatus::InProgress) => "work has started",
            (StatusPhase::Entered, RequestStatus::Completed) => "work completed",
            (StatusPhase::Entered, RequestStatus::Cancelled) => "request cancelled",
            (StatusPhase::Exited, _) => "request moved on",
        };
        StatusEvent {
            request_id: record.id.clone(),
            status: self.status,
            phase,
            assigned_to: record.assigned_to.clone(),
            message: message.to_string(),
        }
    }
}

/// Fixed registry mapping each status name to its [`State`] descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateRegistry;

impl StateRegistry {
    pub fn new() -> Self {
        StateRegistry
    }

    /// Resolve a status name. Names outside the closed set fail, which is
    /// how a corrupt stored status value surfaces.
    pub fn get(&self, name: &str) -> Result<State, UnknownStateError> {
        RequestStatus::parse(name).map(|status| State { status })
    }

    /// Infallible lookup for an already-typed status.
    pub fn get_for(&self, status: RequestStatus) -> State {
        State { status }
    }

    /// All states in lifecycle order.
    pub fn states(&self) -> impl Iterator<Item = State> {
        ALL_STATUSES.into_iter().map(|status| State { status })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::request::ServiceRequest;

    fn request(status: RequestStatus) -> ServiceRequest {
        ServiceRequest {
            id: "req-1".to_string(),
            status,
            category: "roads".to_string(),
            title: "pothole".to_string(),
            description: "deep pothole on main st".to_string(),
            location: "main st / 4th ave".to_string(),
            priority: "high".to_string(),
            assigned_to: None,
            version: 0,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    /// Captures every event it is handed.
    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<StatusEvent>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, event: &StatusEvent) -> Result<(), NotifyError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn get_resolves_every_known_name() {
        let registry = StateRegistry::new();
        for status in ALL_STATUSES {
            let state = registry.get(status.as_str()).unwrap();
            assert_eq!(state.status(), status);
        }
    }

    #[test]
    fn get_fails_on_unknown_name() {
        let registry = StateRegistry::new();
        let err = registry.get("on_hold").unwrap_err();
        assert_eq!(err.value, "on_hold");
    }

    #[test]
    fn state_legality_mirrors_the_table() {
        let registry = StateRegistry::new();
        let reviewed = registry.get_for(RequestStatus::Reviewed);
        assert!(reviewed.can_transition_to(RequestStatus::Assigned));
        assert!(reviewed.can_transition_to(RequestStatus::Cancelled));
        assert!(!reviewed.can_transition_to(RequestStatus::Completed));
    }

    #[test]
    fn hooks_emit_phase_tagged_events() {
        let registry = StateRegistry::new();
        let notifier = RecordingNotifier::default();
        let rec = request(RequestStatus::Assigned);

        let assigned = registry.get_for(RequestStatus::Assigned);
        assigned.on_enter(&rec, &notifier).unwrap();
        assigned.on_exit(&rec, &notifier).unwrap();

        let events = notifier.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].phase, StatusPhase::Entered);
        assert_eq!(events[0].message, "technician assigned");
        assert_eq!(events[1].phase, StatusPhase::Exited);
        assert_eq!(events[0].request_id, "req-1");
    }
}
