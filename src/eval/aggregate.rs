//! Dataset-level aggregation of per-image scores
//!
//! Two aggregation modes exist and are not interchangeable: averaging
//! per-image scores (this module), or accumulating one pass-level
//! [`ConfusionAccumulator`](super::ConfusionAccumulator) across the
//! whole dataset for macro statistics. Per-image scoring is
//! embarrassingly parallel — give each worker its own metric instances
//! and combine the returned scores here after all workers complete.

use super::weighted::WeightedScore;

/// Running arithmetic mean of per-image scores.
#[derive(Clone, Debug, Default)]
pub struct ScoreAverage {
    sum: f64,
    count: usize,
}

impl ScoreAverage {
    /// Empty average.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one per-image score.
    pub fn push(&mut self, score: f64) {
        self.sum += score;
        self.count += 1;
    }

    /// Mean of recorded scores, 0 when none were recorded.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Number of recorded scores.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether any score was recorded.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fold another worker's partial average into this one.
    pub fn merge(&mut self, other: &ScoreAverage) {
        self.sum += other.sum;
        self.count += other.count;
    }
}

/// Running mean of weighted composite results, tracking the headline
/// total and each named sub-score.
#[derive(Clone, Debug, Default)]
pub struct WeightedScoreAverage {
    total: ScoreAverage,
    parts: Vec<(String, ScoreAverage)>,
}

impl WeightedScoreAverage {
    /// Empty average.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one image's composite result.
    pub fn push(&mut self, score: &WeightedScore) {
        self.total.push(score.total);
        for (label, value) in &score.parts {
            match self.parts.iter_mut().find(|(l, _)| l == label) {
                Some((_, avg)) => avg.push(*value),
                None => {
                    let mut avg = ScoreAverage::new();
                    avg.push(*value);
                    self.parts.push((label.clone(), avg));
                }
            }
        }
    }

    /// Mean composite total.
    pub fn mean(&self) -> f64 {
        self.total.mean()
    }

    /// Mean of one named sub-score.
    pub fn part_mean(&self, label: &str) -> Option<f64> {
        self.parts.iter().find(|(l, _)| l == label).map(|(_, avg)| avg.mean())
    }

    /// Number of recorded images.
    pub fn count(&self) -> usize {
        self.total.count()
    }
}
