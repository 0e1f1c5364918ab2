//! Errors surfaced by the engine API.
//!
//! Nothing here ever reaches the user as a dialog: validation failures are
//! data on the rows, and transient model inconsistencies are retried by the
//! worker. These variants cover the few structural failures callers can hit.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A writer panicked while holding the character lock. The model can no
    /// longer be trusted; the owning view should be torn down.
    #[error("character model lock poisoned by a panicked writer")]
    LockPoisoned,

    #[error("validation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}
