//! ward-engine: mutation paths for service requests.
//!
//! Three ways a request changes, with sharply different guarantees:
//!
//! - [`LifecycleEngine::transition`] -- the validated path. Every change is
//!   checked against the transition table and coupled atomically with an
//!   audit row.
//! - [`CommandInvoker`] -- the reversible path. Operations are reified as
//!   [`Command`]s with captured previous values; undo/redo stacks are
//!   persisted per actor.
//! - [`Originator::restore`] -- the privileged path. A [`Memento`] restore
//!   overwrites state unconditionally, bypassing the transition table.

pub mod command;
pub mod error;
pub mod lifecycle;
pub mod memento;

// ── Convenience re-exports: key types ────────────────────────────────

pub use command::{Command, CommandInvoker, CommandOutcome, CommandRequest, MAX_UNDO_DEPTH};
pub use error::EngineError;
pub use lifecycle::LifecycleEngine;
pub use memento::{Caretaker, Memento, Originator};
