//! Crate error types

use crate::checkpoint::Checkpoint;
use thiserror::Error;

/// Errors surfaced by checkpoint persistence and model construction.
///
/// Metric computation never produces errors: degenerate inputs (empty
/// masks, all-background images) score 0 so that unattended aggregation
/// over many images stays total.
#[derive(Debug, Error)]
pub enum Error {
    /// No artifact exists for the requested checkpoint identity.
    #[error("no checkpoint stored for {0}")]
    CheckpointNotFound(Checkpoint),

    /// I/O failure during a save or load. Fatal; not retried, since a
    /// silent retry could mask a corrupted partial write.
    #[error("checkpoint storage failed: {0}")]
    Storage(#[from] std::io::Error),

    /// Encoding or decoding of a persisted artifact failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A stored parameter disagrees structurally with the target model.
    ///
    /// Raised only by strict loads. `found` empty means the parameter is
    /// absent from the checkpoint; `expected` empty means the checkpoint
    /// carries a parameter the target model does not declare.
    #[error("shape mismatch for parameter '{name}': checkpoint has {found:?}, model expects {expected:?}")]
    ShapeMismatch {
        /// Parameter name as stored in the checkpoint.
        name: String,
        /// Shape the target model expects.
        expected: Vec<usize>,
        /// Shape found in the stored state.
        found: Vec<usize>,
    },
}

/// Result type for checkpoint and model operations.
pub type Result<T> = std::result::Result<T, Error>;
