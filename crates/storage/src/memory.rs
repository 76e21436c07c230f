//! In-memory `RequestStore` backend.
//!
//! Reference implementation used by the engine's tests and validated by the
//! conformance suite. Snapshot writes are staged inside the `Snapshot`
//! value and invisible until commit; abort (or drop) discards them.
//!
//! Concurrency control is optimistic: every staged request row remembers
//! the committed version it was derived from, and `commit_snapshot`
//! re-validates those base versions under the store lock. If another
//! snapshot committed first, the commit fails with `ConcurrentConflict`
//! and nothing is applied.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{
    CommandLogRecord, MementoMeta, MementoRecord, RequestRecord, RequestUpdateRecord,
};
use crate::traits::RequestStore;

#[derive(Default)]
struct Inner {
    requests: BTreeMap<String, RequestRecord>,
    updates: Vec<RequestUpdateRecord>,
    mementos: BTreeMap<String, MementoRecord>,
    command_logs: BTreeMap<String, CommandLogRecord>,
}

/// A staged request row plus the committed version it was derived from
/// (`None` for inserts).
struct StagedRequest {
    base_version: Option<i64>,
    record: RequestRecord,
}

/// In-progress transaction for [`MemoryStore`]. All writes live here until
/// commit; dropping the snapshot rolls back.
pub struct MemorySnapshot {
    staged_requests: BTreeMap<String, StagedRequest>,
    staged_updates: Vec<RequestUpdateRecord>,
}

/// Shared-state in-memory backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock still holds consistent data; recover it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current view of a request within a snapshot: staged copy first,
    /// committed row otherwise.
    fn view(
        &self,
        snapshot: &MemorySnapshot,
        request_id: &str,
    ) -> Result<(Option<i64>, RequestRecord), StorageError> {
        if let Some(staged) = snapshot.staged_requests.get(request_id) {
            return Ok((staged.base_version, staged.record.clone()));
        }
        let inner = self.lock();
        match inner.requests.get(request_id) {
            Some(record) => Ok((Some(record.version), record.clone())),
            None => Err(StorageError::RequestNotFound {
                request_id: request_id.to_string(),
            }),
        }
    }

    fn stage(
        &self,
        snapshot: &mut MemorySnapshot,
        base_version: Option<i64>,
        record: RequestRecord,
    ) {
        snapshot.staged_requests.insert(
            record.id.clone(),
            StagedRequest {
                base_version,
                record,
            },
        );
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        Ok(MemorySnapshot {
            staged_requests: BTreeMap::new(),
            staged_updates: Vec::new(),
        })
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        let mut inner = self.lock();

        // Validate every staged row against the committed state before
        // applying anything: commit is all-or-nothing.
        for (request_id, staged) in &snapshot.staged_requests {
            match staged.base_version {
                None => {
                    if inner.requests.contains_key(request_id) {
                        return Err(StorageError::AlreadyExists {
                            request_id: request_id.clone(),
                        });
                    }
                }
                Some(base) => match inner.requests.get(request_id) {
                    Some(committed) if committed.version == base => {}
                    Some(_) => {
                        return Err(StorageError::ConcurrentConflict {
                            request_id: request_id.clone(),
                            expected_version: base,
                        });
                    }
                    None => {
                        return Err(StorageError::RequestNotFound {
                            request_id: request_id.clone(),
                        });
                    }
                },
            }
        }

        for (request_id, staged) in snapshot.staged_requests {
            inner.requests.insert(request_id, staged.record);
        }
        inner.updates.extend(snapshot.staged_updates);
        Ok(())
    }

    async fn abort_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        drop(snapshot);
        Ok(())
    }

    async fn insert_request(
        &self,
        snapshot: &mut MemorySnapshot,
        record: RequestRecord,
    ) -> Result<(), StorageError> {
        let exists_staged = snapshot.staged_requests.contains_key(&record.id);
        let exists_committed = self.lock().requests.contains_key(&record.id);
        if exists_staged || exists_committed {
            return Err(StorageError::AlreadyExists {
                request_id: record.id.clone(),
            });
        }
        self.stage(snapshot, None, record);
        Ok(())
    }

    async fn get_request_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
        request_id: &str,
    ) -> Result<RequestRecord, StorageError> {
        self.view(snapshot, request_id).map(|(_, record)| record)
    }

    async fn update_request_status(
        &self,
        snapshot: &mut MemorySnapshot,
        request_id: &str,
        expected_version: i64,
        new_status: &str,
        updated_at: &str,
    ) -> Result<i64, StorageError> {
        let (base_version, mut record) = self.view(snapshot, request_id)?;
        if record.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                request_id: request_id.to_string(),
                expected_version,
            });
        }
        record.status = new_status.to_string();
        record.updated_at = updated_at.to_string();
        record.version += 1;
        let new_version = record.version;
        self.stage(snapshot, base_version, record);
        Ok(new_version)
    }

    async fn update_request_assignee(
        &self,
        snapshot: &mut MemorySnapshot,
        request_id: &str,
        expected_version: i64,
        assigned_to: Option<&str>,
        updated_at: &str,
    ) -> Result<i64, StorageError> {
        let (base_version, mut record) = self.view(snapshot, request_id)?;
        if record.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                request_id: request_id.to_string(),
                expected_version,
            });
        }
        record.assigned_to = assigned_to.map(str::to_owned);
        record.updated_at = updated_at.to_string();
        record.version += 1;
        let new_version = record.version;
        self.stage(snapshot, base_version, record);
        Ok(new_version)
    }

    async fn overwrite_request(
        &self,
        snapshot: &mut MemorySnapshot,
        record: RequestRecord,
    ) -> Result<i64, StorageError> {
        let (base_version, current) = self.view(snapshot, &record.id)?;
        let mut restored = record;
        restored.version = current.version + 1;
        let new_version = restored.version;
        self.stage(snapshot, base_version, restored);
        Ok(new_version)
    }

    async fn append_request_update(
        &self,
        snapshot: &mut MemorySnapshot,
        record: RequestUpdateRecord,
    ) -> Result<(), StorageError> {
        snapshot.staged_updates.push(record);
        Ok(())
    }

    async fn get_request(&self, request_id: &str) -> Result<RequestRecord, StorageError> {
        self.lock()
            .requests
            .get(request_id)
            .cloned()
            .ok_or_else(|| StorageError::RequestNotFound {
                request_id: request_id.to_string(),
            })
    }

    async fn list_requests(
        &self,
        status_filter: Option<&str>,
    ) -> Result<Vec<RequestRecord>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .requests
            .values()
            .filter(|r| status_filter.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn list_request_updates(
        &self,
        request_id: &str,
    ) -> Result<Vec<RequestUpdateRecord>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .updates
            .iter()
            .filter(|u| u.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn put_memento(&self, record: MementoRecord) -> Result<(), StorageError> {
        self.lock().mementos.insert(record.key.clone(), record);
        Ok(())
    }

    async fn get_memento(&self, key: &str) -> Result<Option<MementoRecord>, StorageError> {
        Ok(self.lock().mementos.get(key).cloned())
    }

    async fn list_mementos(&self, request_id: &str) -> Result<Vec<MementoMeta>, StorageError> {
        let inner = self.lock();
        let mut metas: Vec<MementoMeta> = inner
            .mementos
            .values()
            .filter(|m| m.request_id == request_id)
            .map(MementoMeta::from)
            .collect();
        metas.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.key.cmp(&b.key)));
        Ok(metas)
    }

    async fn remove_memento(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.lock().mementos.remove(key).is_some())
    }

    async fn load_command_log(
        &self,
        actor_id: &str,
    ) -> Result<Option<CommandLogRecord>, StorageError> {
        Ok(self.lock().command_logs.get(actor_id).cloned())
    }

    async fn save_command_log(&self, record: CommandLogRecord) -> Result<(), StorageError> {
        self.lock()
            .command_logs
            .insert(record.actor_id.clone(), record);
        Ok(())
    }
}
