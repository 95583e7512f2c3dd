//! Checkpoint identity key

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identity of a persisted model snapshot: architecture name, training
/// version, and random seed.
///
/// Immutable once constructed; two checkpoints are equal iff all three
/// fields match. Used solely as a lookup key into persisted storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Architecture name, e.g. `Resnet34UnetLocalizer`.
    pub architecture: String,
    /// Training version label, e.g. `v1` or `tuned`.
    pub version: String,
    /// Random seed the run was trained with.
    pub seed: u64,
}

impl Checkpoint {
    /// Create a checkpoint identity.
    pub fn new(architecture: impl Into<String>, version: impl Into<String>, seed: u64) -> Self {
        Self {
            architecture: architecture.into(),
            version: version.into(),
            seed,
        }
    }

    /// Storage key relative to the manager root:
    /// `{architecture}/{version}/{seed}`.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.architecture)
            .join(&self.version)
            .join(self.seed.to_string())
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.architecture, self.version, self.seed)
    }
}
