//! Reversible admin operations (command log).
//!
//! A [`Command`] is a reified mutating operation carrying everything needed
//! to perform and invert it; the previous value is captured at execution
//! time and inversion always uses the capture, never a re-derivation. The
//! [`CommandInvoker`] owns one actor's undo/redo stacks and persists them
//! through the store after every mutation, so undo stays meaningful across
//! process restarts.

use serde::{Deserialize, Serialize};
use ward_core::{RequestStatus, ServiceRequest};
use ward_storage::{CommandLogRecord, RequestStore, StorageError};

use crate::error::EngineError;
use crate::lifecycle::{now_iso8601, LifecycleEngine};

/// Stack depth cap; the oldest command is dropped when a push exceeds it.
pub const MAX_UNDO_DEPTH: usize = 50;

/// An executed, reversible operation. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// A status change routed through the lifecycle engine. Undo inverts
    /// it via the engine's guarded revert path: it only applies while the
    /// request still holds the status this command produced, and fails
    /// with `UndoNotPossible` once the request has moved on.
    UpdateStatus {
        request_id: String,
        new_status: RequestStatus,
        previous_status: RequestStatus,
        actor_id: String,
        notes: String,
        /// ISO 8601 / RFC 3339 timestamp string.
        executed_at: String,
    },
    /// A technician assignment, driving the status to `assigned` when the
    /// request is not already at or past it. Undo restores the captured
    /// previous assignee, and reverts the status drive when this command
    /// performed one.
    AssignTechnician {
        request_id: String,
        technician_id: String,
        previous_assignee: Option<String>,
        previous_status: RequestStatus,
        /// Whether executing this command moved the status to `assigned`.
        drove_status: bool,
        actor_id: String,
        /// ISO 8601 / RFC 3339 timestamp string.
        executed_at: String,
    },
}

impl Command {
    pub fn request_id(&self) -> &str {
        match self {
            Command::UpdateStatus { request_id, .. } => request_id,
            Command::AssignTechnician { request_id, .. } => request_id,
        }
    }
}

/// Caller intent for one command; previous values are captured by the
/// invoker just before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRequest {
    UpdateStatus {
        request_id: String,
        new_status: RequestStatus,
        notes: String,
    },
    AssignTechnician {
        request_id: String,
        technician_id: String,
    },
}

/// Result of an execute/undo/redo, with the stack flags callers display.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub request: ServiceRequest,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// One actor's command invoker. Stacks are loaded from and persisted to
/// the store; a fresh forward execution clears the redo stack.
pub struct CommandInvoker<S: RequestStore> {
    engine: LifecycleEngine<S>,
    actor_id: String,
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
}

impl<S: RequestStore> CommandInvoker<S> {
    /// Restore the actor's stacks from the store; empty stacks for an
    /// actor with no history yet.
    pub async fn load(
        engine: LifecycleEngine<S>,
        actor_id: impl Into<String>,
    ) -> Result<Self, EngineError> {
        let actor_id = actor_id.into();
        let (undo_stack, redo_stack) = match engine.store().load_command_log(&actor_id).await? {
            Some(record) => (
                decode_stack(record.undo)?,
                decode_stack(record.redo)?,
            ),
            None => (Vec::new(), Vec::new()),
        };
        Ok(Self {
            engine,
            actor_id,
            undo_stack,
            redo_stack,
        })
    }

    /// Execute a command: run it through the engine, push it on the undo
    /// stack, clear the redo stack, persist.
    pub async fn execute(
        &mut self,
        request: CommandRequest,
    ) -> Result<CommandOutcome, EngineError> {
        let (command, updated) = match request {
            CommandRequest::UpdateStatus {
                request_id,
                new_status,
                notes,
            } => {
                let before = self.engine.get(&request_id).await?;
                let updated = self
                    .engine
                    .transition(&request_id, new_status, &self.actor_id, &notes)
                    .await?;
                (
                    Command::UpdateStatus {
                        request_id,
                        new_status,
                        previous_status: before.status,
                        actor_id: self.actor_id.clone(),
                        notes,
                        executed_at: now_iso8601(),
                    },
                    updated,
                )
            }
            CommandRequest::AssignTechnician {
                request_id,
                technician_id,
            } => {
                let before = self.engine.get(&request_id).await?;
                let updated = self
                    .engine
                    .assign(&request_id, &technician_id, &self.actor_id)
                    .await?;
                let drove_status = before.status != updated.status;
                (
                    Command::AssignTechnician {
                        request_id,
                        technician_id,
                        previous_assignee: before.assigned_to,
                        previous_status: before.status,
                        drove_status,
                        actor_id: self.actor_id.clone(),
                        executed_at: now_iso8601(),
                    },
                    updated,
                )
            }
        };

        self.push_undo(command);
        self.redo_stack.clear();
        self.persist().await?;
        Ok(self.outcome(updated))
    }

    /// Invert the most recent command and move it to the redo stack.
    ///
    /// A failed inverse (reverse transition not legal, storage failure)
    /// leaves both stacks unchanged.
    pub async fn undo(&mut self) -> Result<CommandOutcome, EngineError> {
        let command = self
            .undo_stack
            .last()
            .cloned()
            .ok_or(EngineError::NothingToUndo)?;

        let restored = match &command {
            Command::UpdateStatus {
                request_id,
                new_status,
                previous_status,
                ..
            } => {
                let notes = format!("undo: revert to {previous_status}");
                self.engine
                    .revert_status(
                        request_id,
                        *new_status,
                        *previous_status,
                        &self.actor_id,
                        &notes,
                    )
                    .await?
            }
            Command::AssignTechnician {
                request_id,
                previous_assignee,
                previous_status,
                drove_status,
                ..
            } => {
                // Revert the status drive first: it carries the guard, so a
                // stale undo fails before anything is touched.
                if *drove_status {
                    let notes = format!("undo: revert to {previous_status}");
                    self.engine
                        .revert_status(
                            request_id,
                            RequestStatus::Assigned,
                            *previous_status,
                            &self.actor_id,
                            &notes,
                        )
                        .await?;
                }
                self.engine
                    .set_assignee(request_id, previous_assignee.as_deref())
                    .await?
            }
        };

        let command = self.undo_stack.pop().ok_or(EngineError::NothingToUndo)?;
        self.redo_stack.push(command);
        self.persist().await?;
        Ok(self.outcome(restored))
    }

    /// Re-execute the most recently undone command and move it back to the
    /// undo stack. A failed re-execution leaves both stacks unchanged.
    pub async fn redo(&mut self) -> Result<CommandOutcome, EngineError> {
        let command = self
            .redo_stack
            .last()
            .cloned()
            .ok_or(EngineError::NothingToRedo)?;

        let updated = match &command {
            Command::UpdateStatus {
                request_id,
                new_status,
                notes,
                ..
            } => {
                self.engine
                    .transition(request_id, *new_status, &self.actor_id, notes)
                    .await?
            }
            Command::AssignTechnician {
                request_id,
                technician_id,
                ..
            } => {
                self.engine
                    .assign(request_id, technician_id, &self.actor_id)
                    .await?
            }
        };

        let command = self.redo_stack.pop().ok_or(EngineError::NothingToRedo)?;
        self.push_undo(command);
        self.persist().await?;
        Ok(self.outcome(updated))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Executed commands in execution order. Read-only; does not touch the
    /// stacks.
    pub fn history(&self) -> &[Command] {
        &self.undo_stack
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    fn push_undo(&mut self, command: Command) {
        self.undo_stack.push(command);
        if self.undo_stack.len() > MAX_UNDO_DEPTH {
            self.undo_stack.remove(0);
        }
    }

    fn outcome(&self, request: ServiceRequest) -> CommandOutcome {
        CommandOutcome {
            request,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    async fn persist(&self) -> Result<(), EngineError> {
        let record = CommandLogRecord {
            actor_id: self.actor_id.clone(),
            undo: encode_stack(&self.undo_stack)?,
            redo: encode_stack(&self.redo_stack)?,
            updated_at: now_iso8601(),
        };
        self.engine.store().save_command_log(record).await?;
        Ok(())
    }
}

fn encode_stack(stack: &[Command]) -> Result<serde_json::Value, EngineError> {
    serde_json::to_value(stack)
        .map_err(|e| StorageError::Backend(format!("command log encode: {e}")).into())
}

fn decode_stack(value: serde_json::Value) -> Result<Vec<Command>, EngineError> {
    serde_json::from_value(value)
        .map_err(|e| StorageError::Backend(format!("corrupt command log: {e}")).into())
}
