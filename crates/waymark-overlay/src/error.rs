//! Error types for the overlay engine.

use thiserror::Error;

/// Host-facing faults. Annotation misses are not errors; they degrade to
/// "no badge" silently.
#[derive(Error, Debug)]
pub enum Error {
    /// The reconciliation task is no longer running.
    #[error("Reconciler is not running")]
    ReconcilerStopped,

    /// The reconciliation task did not shut down cleanly.
    #[error("Reconciler task join error: {0}")]
    Join(String),
}

/// Result alias for overlay operations.
pub type Result<T> = std::result::Result<T, Error>;
