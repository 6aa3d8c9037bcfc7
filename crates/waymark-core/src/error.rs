//! Error types for the waymark core model.

use thiserror::Error;

/// Errors surfaced to the host by the core model.
///
/// The overlay itself is best-effort (a failed lookup means "no badge", never
/// an error); this enum only covers faults the host must act on.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
