//! ward-core: service-request domain model.
//!
//! Provides the closed status set and its authoritative transition table,
//! the state registry with entry/exit hooks, the typed [`ServiceRequest`]
//! model, and the [`Notifier`] capability seam used for transition side
//! effects.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`RequestStatus`] -- the closed status enumeration + transition table
//! - [`StateRegistry`] / [`State`] -- status-name lookup and legality checks
//! - [`ServiceRequest`] / [`NewRequest`] -- the typed request model
//! - [`Notifier`] / [`StatusEvent`] -- side-effect capability for hooks
//! - [`UnknownStateError`] -- unknown/corrupt status name error

pub mod error;
pub mod notify;
pub mod registry;
pub mod request;
pub mod status;

// ── Convenience re-exports: key types ────────────────────────────────

pub use error::UnknownStateError;
pub use notify::{NoopNotifier, Notifier, NotifyError, StatusEvent, StatusPhase};
pub use registry::{State, StateRegistry};
pub use request::{NewRequest, ServiceRequest};
pub use status::RequestStatus;
