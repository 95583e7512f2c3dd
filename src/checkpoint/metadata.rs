//! Best-score and epoch record accompanying a checkpoint

use serde::{Deserialize, Serialize};

/// Training progress persisted alongside model state so a resumed run
/// retains its best-score/epoch history.
///
/// Created empty for a fresh model; the training loop updates it after
/// each evaluation round when a strictly higher score is observed. Owned
/// by the artifact it accompanies, never shared across checkpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Best score achieved so far, `None` until the first evaluation.
    pub best_score: Option<f64>,
    /// Last completed epoch.
    pub epoch: usize,
}

impl Metadata {
    /// Fresh metadata: no best score, epoch 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new best score.
    pub fn record_best(&mut self, score: f64) {
        self.best_score = Some(score);
    }

    /// Record the last completed epoch.
    pub fn record_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
    }
}
