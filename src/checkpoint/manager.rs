//! Storage-backed checkpoint save/load

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::key::Checkpoint;
use super::metadata::Metadata;
use super::state::{ModelState, ShapeSpec, StateFile};

const STATE_FILE: &str = "state.json";
const MANIFEST_FILE: &str = "manifest.json";

/// Manifest written next to the state payload: metadata, save time, and
/// a digest of the state bytes verified on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    metadata: Metadata,
    saved_at: DateTime<Utc>,
    state_sha256: String,
}

/// Save/load service for `(state, metadata)` pairs keyed by
/// [`Checkpoint`] identity.
///
/// Explicitly constructed against a storage root and passed by
/// reference; writes are synchronous and an existing artifact at the
/// same key is overwritten. Concurrent saves to the same key are a
/// last-writer-wins race — serialize them by letting one training
/// process own a given `(architecture, version, seed)` triple at a time.
#[derive(Clone, Debug)]
pub struct CheckpointManager {
    root: PathBuf,
}

impl CheckpointManager {
    /// Bind a manager to a storage root directory. The directory is
    /// created lazily on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, checkpoint: &Checkpoint) -> PathBuf {
        self.root.join(checkpoint.relative_path())
    }

    /// Whether an artifact exists for this exact identity.
    pub fn exists(&self, checkpoint: &Checkpoint) -> bool {
        let dir = self.dir(checkpoint);
        dir.join(STATE_FILE).is_file() && dir.join(MANIFEST_FILE).is_file()
    }

    /// Persist `state` and `metadata` under the checkpoint's identity
    /// key, overwriting any prior artifact at that exact key.
    pub fn save(
        &self,
        checkpoint: &Checkpoint,
        state: &ModelState,
        metadata: &Metadata,
    ) -> Result<()> {
        let dir = self.dir(checkpoint);
        fs::create_dir_all(&dir)?;

        let state_json = serde_json::to_string_pretty(&state.to_file())
            .map_err(|e| Error::Serialization(format!("state encoding failed: {e}")))?;
        debug!(checkpoint = %checkpoint, parameters = state.len(), "writing checkpoint state");
        fs::write(dir.join(STATE_FILE), &state_json)?;

        let manifest = Manifest {
            metadata: metadata.clone(),
            saved_at: Utc::now(),
            state_sha256: format!("{:x}", Sha256::digest(state_json.as_bytes())),
        };
        let manifest_json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| Error::Serialization(format!("manifest encoding failed: {e}")))?;
        fs::write(dir.join(MANIFEST_FILE), manifest_json)?;

        info!(
            checkpoint = %checkpoint,
            best_score = ?metadata.best_score,
            epoch = metadata.epoch,
            "checkpoint saved"
        );
        Ok(())
    }

    /// Load the exact persisted state and metadata for this identity.
    ///
    /// Fails with [`Error::CheckpointNotFound`] if no artifact exists at
    /// that exact key, and with [`Error::Storage`] if the stored payload
    /// does not match its recorded digest.
    pub fn load(&self, checkpoint: &Checkpoint) -> Result<(ModelState, Metadata)> {
        if !self.exists(checkpoint) {
            return Err(Error::CheckpointNotFound(checkpoint.clone()));
        }
        let dir = self.dir(checkpoint);

        let state_json = fs::read_to_string(dir.join(STATE_FILE))?;
        let manifest_json = fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let manifest: Manifest = serde_json::from_str(&manifest_json)
            .map_err(|e| Error::Serialization(format!("manifest decoding failed: {e}")))?;

        let digest = format!("{:x}", Sha256::digest(state_json.as_bytes()));
        if digest != manifest.state_sha256 {
            return Err(Error::Storage(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("state digest mismatch for {checkpoint}"),
            )));
        }

        let file: StateFile = serde_json::from_str(&state_json)
            .map_err(|e| Error::Serialization(format!("state decoding failed: {e}")))?;
        let state = ModelState::from_file(file)?;
        debug!(checkpoint = %checkpoint, parameters = state.len(), "checkpoint loaded");
        Ok((state, manifest.metadata))
    }

    /// Best-effort load for warm-starting a structurally similar
    /// architecture: the returned state keeps only entries whose stored
    /// shape exactly matches `target`'s expectation for the same name.
    /// Mismatched, extra, and missing entries are dropped silently —
    /// this never fails merely because shapes differ, only when the
    /// artifact itself is absent or corrupt.
    pub fn load_compatible(
        &self,
        checkpoint: &Checkpoint,
        target: &ShapeSpec,
    ) -> Result<(ModelState, Metadata)> {
        let (state, metadata) = self.load(checkpoint)?;
        let filtered = state.retain_matching(target);
        if filtered.len() < state.len() {
            debug!(
                checkpoint = %checkpoint,
                kept = filtered.len(),
                dropped = state.len() - filtered.len(),
                "partial compatibility load"
            );
        }
        Ok((filtered, metadata))
    }

    /// Strict load for resuming training: every parameter `target`
    /// declares must be present with an exactly matching shape and the
    /// stored state must carry nothing extra, otherwise
    /// [`Error::ShapeMismatch`].
    pub fn load_strict(
        &self,
        checkpoint: &Checkpoint,
        target: &ShapeSpec,
    ) -> Result<(ModelState, Metadata)> {
        let (state, metadata) = self.load(checkpoint)?;
        state.check_strict(target)?;
        Ok((state, metadata))
    }

    /// Whether `new_score` beats the recorded best. Strict inequality:
    /// ties do not trigger a new best.
    pub fn is_better(new_score: f64, metadata: &Metadata) -> bool {
        match metadata.best_score {
            None => true,
            Some(best) => new_score > best,
        }
    }

    /// Enumerate stored checkpoints for one architecture, sorted by
    /// version then seed. Unknown architectures yield an empty list.
    pub fn list(&self, architecture: &str) -> Result<Vec<Checkpoint>> {
        let dir = self.root.join(architecture);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for version_entry in fs::read_dir(&dir)? {
            let version_entry = version_entry?;
            if !version_entry.file_type()?.is_dir() {
                continue;
            }
            let version = version_entry.file_name().to_string_lossy().into_owned();
            for seed_entry in fs::read_dir(version_entry.path())? {
                let seed_entry = seed_entry?;
                let Ok(seed) = seed_entry.file_name().to_string_lossy().parse::<u64>() else {
                    continue;
                };
                let checkpoint = Checkpoint::new(architecture, version.clone(), seed);
                if self.exists(&checkpoint) {
                    found.push(checkpoint);
                }
            }
        }
        found.sort();
        Ok(found)
    }
}
