//! Memento subsystem: capture and force-restore full request state.
//!
//! Restore overwrites the record with the captured fields WITHOUT a
//! legality check against the transition table. This is a deliberate,
//! privileged administrative escape hatch -- a restore can move a request
//! from `completed` straight back to `pending` -- and callers are expected
//! to gate it behind elevated authorization. The restore still appends an
//! audit row, so the trail records the override.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ward_core::ServiceRequest;
use ward_storage::{MementoMeta, MementoRecord, RequestStore, RequestUpdateRecord, StorageError};

use crate::error::EngineError;
use crate::lifecycle::{now_iso8601, to_domain, update_id};

/// An immutable full-state snapshot of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memento {
    record: MementoRecord,
}

impl Memento {
    pub fn key(&self) -> &str {
        &self.record.key
    }

    pub fn request_id(&self) -> &str {
        &self.record.request_id
    }

    pub fn label(&self) -> &str {
        &self.record.label
    }

    pub fn created_at(&self) -> &str {
        &self.record.created_at
    }

    /// The captured record, frozen at capture time.
    pub fn captured(&self) -> &ward_storage::RequestRecord {
        &self.record.captured
    }
}

/// Creates mementos from live records and restores records from mementos.
pub struct Originator<S> {
    store: Arc<S>,
}

impl<S: RequestStore> Originator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Capture the request's current full state under a fresh composite
    /// key (`{request_id}_{nanosecond timestamp}.{sequence}`). The
    /// sequence keeps keys unique when two captures land on one clock
    /// tick.
    pub async fn create_memento(
        &self,
        request_id: &str,
        label: &str,
    ) -> Result<Memento, EngineError> {
        static SEQ: AtomicU64 = AtomicU64::new(0);

        let captured = self
            .store
            .get_request(request_id)
            .await
            .map_err(|e| match e {
                StorageError::RequestNotFound { .. } => EngineError::NotFound {
                    request_id: request_id.to_string(),
                },
                other => EngineError::Storage(other),
            })?;
        let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        Ok(Memento {
            record: MementoRecord {
                key: format!("{request_id}_{nanos}.{seq}"),
                request_id: request_id.to_string(),
                label: label.to_string(),
                created_at: now_iso8601(),
                captured,
            },
        })
    }

    /// Overwrite the request with the memento's captured state,
    /// unconditionally. Only the version counter moves forward; every
    /// captured field, timestamps included, is written back verbatim.
    pub async fn restore(
        &self,
        memento: &Memento,
        actor_id: &str,
    ) -> Result<ServiceRequest, EngineError> {
        let request_id = memento.request_id();
        let mut snapshot = self.store.begin_snapshot().await?;

        let current = match self.store.get_request_for_update(&mut snapshot, request_id).await {
            Ok(rec) => rec,
            Err(StorageError::RequestNotFound { .. }) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(EngineError::NotFound {
                    request_id: request_id.to_string(),
                });
            }
            Err(e) => {
                let _ = self.store.abort_snapshot(snapshot).await;
                return Err(e.into());
            }
        };

        let new_version = match self
            .store
            .overwrite_request(&mut snapshot, memento.record.captured.clone())
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
            new_status: memento.record.captured.status.clone(),
            notes: format!("restored from snapshot {}", memento.key()),
            created_at: now_iso8601(),
        };
        if let Err(e) = self.store.append_request_update(&mut snapshot, audit).await {
            let _ = self.store.abort_snapshot(snapshot).await;
            return Err(e.into());
        }
        self.store.commit_snapshot(snapshot).await?;

        let mut restored = memento.record.captured.clone();
        restored.version = new_version;
        to_domain(restored)
    }

    /// Look a memento up by key and restore it. `SnapshotNotFound` if the
    /// key is unknown.
    pub async fn restore_by_key(
        &self,
        key: &str,
        actor_id: &str,
    ) -> Result<ServiceRequest, EngineError> {
        let record = self
            .store
            .get_memento(key)
            .await?
            .ok_or_else(|| EngineError::SnapshotNotFound {
                key: key.to_string(),
            })?;
        self.restore(&Memento { record }, actor_id).await
    }
}

/// Owns stored mementos: save, fetch, list, delete by key. No automatic
/// eviction; snapshots accumulate until explicitly removed.
pub struct Caretaker<S> {
    store: Arc<S>,
}

impl<S: RequestStore> Caretaker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn save(&self, memento: &Memento) -> Result<(), EngineError> {
        Ok(self.store.put_memento(memento.record.clone()).await?)
    }

    pub async fn get(&self, key: &str) -> Result<Option<Memento>, EngineError> {
        Ok(self
            .store
            .get_memento(key)
            .await?
            .map(|record| Memento { record }))
    }

    pub async fn list(&self, request_id: &str) -> Result<Vec<MementoMeta>, EngineError> {
        Ok(self.store.list_mementos(request_id).await?)
    }

    pub async fn remove(&self, key: &str) -> Result<bool, EngineError> {
        Ok(self.store.remove_memento(key).await?)
    }
}
