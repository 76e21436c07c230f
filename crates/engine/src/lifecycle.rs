//! Lifecycle engine: the single validated mutation path for status changes.
//!
//! `transition` drives one status change end to end: read the record for
//! update, check the move against the registry's table, fire the exit hook,
//! apply the version-checked update together with its audit row in one
//! storage snapshot, commit, then fire the entry hook on the updated
//! record.
//!
//! Key invariant: the status field and the audit log move atomically --
//! both land on commit or neither does. Entry/exit hooks are best-effort:
//! a failed notification is logged and never unwinds a committed mutation.

use std::sync::Arc;

use ward_core::{
    NewRequest, Notifier, RequestStatus, ServiceRequest, StateRegistry, UnknownStateError,
};
use ward_storage::{RequestRecord, RequestStore, RequestUpdateRecord, StorageError};

use crate::error::EngineError;

/// Generate a simple ISO 8601 timestamp.
pub(crate) fn now_iso8601() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

/// Audit row id, unique per request version.
pub(crate) fn update_id(request_id: &str, version: i64) -> String {
    format!("upd-{request_id}-{version}")
}

/// Convert a stored record into the typed domain model. A corrupt status
/// value surfaces here as `UnknownState`.
pub(crate) fn to_domain(record: RequestRecord) -> Result<ServiceRequest, EngineError> {
    let status = RequestStatus::parse(&record.status).map_err(|UnknownStateError { value }| {
        EngineError::UnknownState {
            request_id: record.id.clone(),
            value,
        }
    })?;
    Ok(ServiceRequest {
        id: record.id,
        status,
        category: record.category,
        title: record.title,
        description: record.description,
        location: record.location,
        priority: record.priority,
        assigned_to: record.assigned_to,
        version: record.version,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

fn map_not_found(e: StorageError, request_id: &str) -> EngineError {
    match e {
        StorageError::RequestNotFound { .. } => EngineError::NotFound {
            request_id: request_id.to_string(),
        },
        other => EngineError::Storage(other),
    }
}

/// The validated mutation path. Collaborators are injected: the store for
/// persistence, the registry for legality, the notifier for side effects.
pub struct LifecycleEngine<S> {
    store: Arc<S>,
    registry: StateRegistry,
    notifier: Arc<dyn Notifier>,
}

impl<S> Clone for LifecycleEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: self.registry,
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: RequestStore> LifecycleEngine<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            registry: StateRegistry::new(),
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a request in `pending` and append its creation audit row
    /// (old status None) in the same snapshot.
    pub async fn create(
        &self,
        new: NewRequest,
        actor_id: &str,
    ) -> Result<ServiceRequest, EngineError> {
        let now = now_iso8601();
        let record = RequestRecord {
            id: new.id.clone(),
            status: RequestStatus::Pending.as_str().to_string(),
            category: new.category,
            title: new.title,
            description: new.description,
            location: new.location,
            priority: new.priority,
            assigned_to: None,
            version: 0,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        let mut snapshot = self.store.begin_snapshot().await?;
        if let Err(e) = self.store.insert_request(&mut snapshot, record.clone()).await {
            let _ = self.store.abort_snapshot(snapshot).await;
            return Err(e.into());
        }
        let audit = RequestUpdateRecord {
            id: update_id(&new.id, 0),
            request_id: new.id.clone(),
            actor_id: actor_id.to_string(),
            old_status: None,
            new_status: RequestStatus::Pending.as_str().to_string(),
            notes: "created".to_string(),
            created_at: now,
        };
        if let Err(e) = self.store.append_request_update(&mut snapshot, audit).await {
            let _ = self.store.abort_snapshot(snapshot).await;
            return Err(e.into());
        }
        self.store.commit_snapshot(snapshot).await?;

        let created = to_domain(record)?;
        self.enter_hook(&created);
        Ok(created)
    }

    /// Perform one validated status transition.
    ///
    /// Fails with `NotFound` for an unknown id, `UnknownState` for a
    /// corrupt stored status, and `IllegalTransition` when the target is
    /// not in the current state's outgoing set -- in the latter cases
    /// nothing is mutated and no audit row is appended.
    pub async fn transition(
        &self,
        request_id: &str,
        new_status: RequestStatus,
        actor_id: &str,
        notes: &str,
    ) -> Result<ServiceRequest, EngineError> {
        let mut snapshot = self.store.begin_snapshot().await?;

        let current = match self.store.get_request_for_update(&mut snapshot, request_id).await {
            Ok(rec) => rec,
            Err(e) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(map_not_found(e, request_id));
            }
        };
        let state = match self.registry.get(&current.status) {
            Ok(state) => state,
            Err(UnknownStateError { value }) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(EngineError::UnknownState {
                    request_id: request_id.to_string(),
                    value,
                });
            }
        };
        if !state.can_transition_to(new_status) {
            let _ = self.store.abort_snapshot(snapshot).await;
            return Err(EngineError::IllegalTransition {
                request_id: request_id.to_string(),
                from: state.status(),
                to: new_status,
            });
        }

        // Exit hook fires once the move is known to be legal. Best-effort.
        let current_domain = to_domain(current.clone())?;
        if let Err(err) = state.on_exit(&current_domain, self.notifier.as_ref()) {
            tracing::warn!(request_id, error = %err, "exit hook failed");
        }

        let now = now_iso8601();
        let new_version = match self
            .store
            .update_request_status(
                &mut snapshot,
                request_id,
                current.version,
                new_status.as_str(),
                &now,
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(e.into());
            }
        };
        let audit = RequestUpdateRecord {
            id: update_id(request_id, new_version),
            request_id: request_id.to_string(),
            actor_id: actor_id.to_string(),
            old_status: Some(current.status.clone()),
            new_status: new_status.as_str().to_string(),
            notes: notes.to_string(),
            created_at: now.clone(),
        };
        if let Err(e) = self.store.append_request_update(&mut snapshot, audit).await {
            let _ = self.store.abort_snapshot(snapshot).await;
            return Err(e.into());
        }
        self.store.commit_snapshot(snapshot).await?;

        let updated = ServiceRequest {
            status: new_status,
            version: new_version,
            updated_at: now,
            ..current_domain
        };
        self.enter_hook(&updated);
        Ok(updated)
    }

    /// Set the technician on a request, driving the status to `assigned`
    /// when the request is not already at or past it. Assignment and the
    /// status move land in one snapshot; if the drive is needed but not
    /// legal from the current status, nothing is applied.
    pub async fn assign(
        &self,
        request_id: &str,
        technician_id: &str,
        actor_id: &str,
    ) -> Result<ServiceRequest, EngineError> {
        let mut snapshot = self.store.begin_snapshot().await?;

        let current = match self.store.get_request_for_update(&mut snapshot, request_id).await {
            Ok(rec) => rec,
            Err(e) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(map_not_found(e, request_id));
            }
        };
        let state = match self.registry.get(&current.status) {
            Ok(state) => state,
            Err(UnknownStateError { value }) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(EngineError::UnknownState {
                    request_id: request_id.to_string(),
                    value,
                });
            }
        };

        let drive = !matches!(
            state.status(),
            RequestStatus::Assigned | RequestStatus::InProgress | RequestStatus::Completed
        );
        if drive && !state.can_transition_to(RequestStatus::Assigned) {
            let _ = self.store.abort_snapshot(snapshot).await;
            return Err(EngineError::IllegalTransition {
                request_id: request_id.to_string(),
                from: state.status(),
                to: RequestStatus::Assigned,
            });
        }

        let current_domain = to_domain(current.clone())?;
        if drive {
            if let Err(err) = state.on_exit(&current_domain, self.notifier.as_ref()) {
                tracing::warn!(request_id, error = %err, "exit hook failed");
            }
        }

        let now = now_iso8601();
        let mut version = match self
            .store
            .update_request_assignee(
                &mut snapshot,
                request_id,
                current.version,
                Some(technician_id),
                &now,
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(e.into());
            }
        };
        if drive {
            version = match self
                .store
                .update_request_status(
                    &mut snapshot,
                    request_id,
                    version,
                    RequestStatus::Assigned.as_str(),
                    &now,
                )
                .await
            {
                Ok(v) => v,
                Err(e) => {
                    let _ = self.store.abort_snapshot(snapshot).await;
                    return Err(e.into());
                }
            };
            let audit = RequestUpdateRecord {
                id: update_id(request_id, version),
                request_id: request_id.to_string(),
                actor_id: actor_id.to_string(),
                old_status: Some(current.status.clone()),
                new_status: RequestStatus::Assigned.as_str().to_string(),
                notes: format!("assigned to {technician_id}"),
                created_at: now.clone(),
            };
            if let Err(e) = self.store.append_request_update(&mut snapshot, audit).await {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(e.into());
            }
        }
        self.store.commit_snapshot(snapshot).await?;

        let updated = ServiceRequest {
            status: if drive {
                RequestStatus::Assigned
            } else {
                current_domain.status
            },
            assigned_to: Some(technician_id.to_string()),
            version,
            updated_at: now,
            ..current_domain
        };
        if drive {
            self.enter_hook(&updated);
        }
        Ok(updated)
    }

    /// Inversion path for the command log: move a request back to the
    /// status it held before a command ran.
    ///
    /// The move is NOT checked against the forward transition table -- it
    /// inverts a transition that was legal when executed. The guard is
    /// `expected_current`: if the request has since moved to some other
    /// status, the inverse no longer applies and the call fails with
    /// `UndoNotPossible`, leaving nothing mutated.
    pub async fn revert_status(
        &self,
        request_id: &str,
        expected_current: RequestStatus,
        target: RequestStatus,
        actor_id: &str,
        notes: &str,
    ) -> Result<ServiceRequest, EngineError> {
        let mut snapshot = self.store.begin_snapshot().await?;

        let current = match self.store.get_request_for_update(&mut snapshot, request_id).await {
            Ok(rec) => rec,
            Err(e) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(map_not_found(e, request_id));
            }
        };
        let state = match self.registry.get(&current.status) {
            Ok(state) => state,
            Err(UnknownStateError { value }) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(EngineError::UnknownState {
                    request_id: request_id.to_string(),
                    value,
                });
            }
        };
        if state.status() != expected_current {
            let _ = self.store.abort_snapshot(snapshot).await;
            return Err(EngineError::UndoNotPossible {
                reason: format!(
                    "request {request_id} is now '{}', expected '{expected_current}'",
                    state.status()
                ),
            });
        }

        let current_domain = to_domain(current.clone())?;
        if let Err(err) = state.on_exit(&current_domain, self.notifier.as_ref()) {
            tracing::warn!(request_id, error = %err, "exit hook failed");
        }

        let now = now_iso8601();
        let new_version = match self
            .store
            .update_request_status(&mut snapshot, request_id, current.version, target.as_str(), &now)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(e.into());
            }
        };
        let audit = RequestUpdateRecord {
            id: update_id(request_id, new_version),
            request_id: request_id.to_string(),
            actor_id: actor_id.to_string(),
            old_status: Some(current.status.clone()),
            new_status: target.as_str().to_string(),
            notes: notes.to_string(),
            created_at: now.clone(),
        };
        if let Err(e) = self.store.append_request_update(&mut snapshot, audit).await {
            let _ = self.store.abort_snapshot(snapshot).await;
            return Err(e.into());
        }
        self.store.commit_snapshot(snapshot).await?;

        let reverted = ServiceRequest {
            status: target,
            version: new_version,
            updated_at: now,
            ..current_domain
        };
        self.enter_hook(&reverted);
        Ok(reverted)
    }

    /// Restore the assignment field to a prior value, without touching the
    /// status. The inverse of `assign`; no audit row because the status
    /// did not change.
    pub async fn set_assignee(
        &self,
        request_id: &str,
        assigned_to: Option<&str>,
    ) -> Result<ServiceRequest, EngineError> {
        let mut snapshot = self.store.begin_snapshot().await?;
        let current = match self.store.get_request_for_update(&mut snapshot, request_id).await {
            Ok(rec) => rec,
            Err(e) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(map_not_found(e, request_id));
            }
        };
        let now = now_iso8601();
        let version = match self
            .store
            .update_request_assignee(&mut snapshot, request_id, current.version, assigned_to, &now)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(e.into());
            }
        };
        self.store.commit_snapshot(snapshot).await?;

        let mut updated = to_domain(current)?;
        updated.assigned_to = assigned_to.map(str::to_owned);
        updated.version = version;
        updated.updated_at = now;
        Ok(updated)
    }

    /// Read a request.
    pub async fn get(&self, request_id: &str) -> Result<ServiceRequest, EngineError> {
        let record = self
            .store
            .get_request(request_id)
            .await
            .map_err(|e| map_not_found(e, request_id))?;
        to_domain(record)
    }

    /// Read a request's audit trail in append order.
    pub async fn history(
        &self,
        request_id: &str,
    ) -> Result<Vec<RequestUpdateRecord>, EngineError> {
        Ok(self.store.list_request_updates(request_id).await?)
    }

    fn enter_hook(&self, record: &ServiceRequest) {
        let state = self.registry.get_for(record.status);
        if let Err(err) = state.on_enter(record, self.notifier.as_ref()) {
            tracing::warn!(request_id = %record.id, error = %err, "entry hook failed");
        }
    }
}
