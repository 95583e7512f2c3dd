//! Per-image metric contract and its variants
//!
//! A prediction is a `(channels, height, width)` tensor of per-class
//! probabilities in `[0, 1]`; ground truth is `(height, width)` integer
//! class ids with 0 conventionally the background/undamaged class.
//! Every [`ImageMetric::score`] call accumulates over exactly one image
//! with a fresh accumulator — dataset-level results come from
//! aggregating the returned scores externally.

use ndarray::{Array2, ArrayView2, ArrayView3, ArrayView4, Axis};
use std::ops::Range;

use super::confusion::ConfusionAccumulator;
use super::score::{dice, f_score};

/// Number of damage classes in the xView2 scheme: background/no-building
/// plus four damage levels.
pub const DAMAGE_CLASSES: usize = 5;

/// Scores one image's prediction against its ground truth.
///
/// Implementations return a value in `[0, 1]` and never fail: degenerate
/// inputs (all-background images, empty masks) score 0.
pub trait ImageMetric {
    /// Score a single image.
    fn score(&self, prediction: &ArrayView3<f32>, ground_truth: &ArrayView2<u8>) -> f64;

    /// Score a `(batch, channels, height, width)` prediction batch
    /// against `(batch, height, width)` ground truth: the arithmetic
    /// mean of the per-image scores, 0 for an empty batch.
    ///
    /// # Panics
    ///
    /// Panics if the batch sizes disagree.
    fn score_batch(&self, predictions: &ArrayView4<f32>, ground_truths: &ArrayView3<u8>) -> f64 {
        let batch = predictions.dim().0;
        assert_eq!(
            batch,
            ground_truths.dim().0,
            "Prediction and ground-truth batch sizes must match"
        );
        if batch == 0 {
            return 0.0;
        }
        let sum: f64 = (0..batch)
            .map(|i| {
                self.score(
                    &predictions.index_axis(Axis(0), i),
                    &ground_truths.index_axis(Axis(0), i),
                )
            })
            .sum();
        sum / batch as f64
    }

    /// Metric name for diagnostics.
    fn name(&self) -> &str;
}

/// Hard class label per pixel: argmax over the channel axis.
fn argmax_labels(prediction: &ArrayView3<f32>) -> Array2<u8> {
    let (channels, height, width) = prediction.dim();
    let mut labels = Array2::<u8>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut best = 0usize;
            let mut best_p = prediction[[0, y, x]];
            for c in 1..channels {
                let p = prediction[[c, y, x]];
                if p > best_p {
                    best = c;
                    best_p = p;
                }
            }
            labels[[y, x]] = best as u8;
        }
    }
    labels
}

/// F1 of the single building/not-building foreground class.
///
/// Binarizes one prediction channel at a threshold and scores it against
/// the foreground ground-truth mask (`ground_truth > 0`).
#[derive(Clone, Debug)]
pub struct LocalizationF1Score {
    channel: usize,
    threshold: f32,
    inverse: bool,
}

impl Default for LocalizationF1Score {
    fn default() -> Self {
        Self {
            channel: 0,
            threshold: 0.5,
            inverse: false,
        }
    }
}

impl LocalizationF1Score {
    /// Localization F1 on channel 0 at threshold 0.5.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the prediction channel to binarize.
    #[must_use]
    pub fn channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// Set the binarization threshold.
    #[must_use]
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Complement the binarized mask before scoring. Used when the chosen
    /// channel carries background probability, e.g. channel 0 of a damage
    /// classifier's softmax output.
    #[must_use]
    pub fn inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }
}

impl ImageMetric for LocalizationF1Score {
    fn score(&self, prediction: &ArrayView3<f32>, ground_truth: &ArrayView2<u8>) -> f64 {
        let probs = prediction.index_axis(Axis(0), self.channel);
        let predicted = probs.mapv(|p| u8::from((p >= self.threshold) != self.inverse));
        let truth = ground_truth.mapv(|t| u8::from(t > 0));

        let mut acc = ConfusionAccumulator::new(2);
        acc.update(&predicted.view(), &truth.view(), None);
        let (tp, fp, fn_) = acc.counts(1);
        f_score(tp, fp, fn_, 1.0)
    }

    fn name(&self) -> &str {
        "LocalizationF1"
    }
}

/// Macro-averaged per-class F1 over damage classes.
///
/// Classifies each pixel by argmax over the per-class probabilities,
/// accumulates confusion per damage class, and returns the unweighted
/// mean of per-class F1 scores over `included_classes` (default `1..5`,
/// excluding the background/no-building class — the excluded set is
/// explicit configuration, not a hardcoded assumption).
#[derive(Clone, Debug)]
pub struct DamageF1Score {
    n_classes: usize,
    included_classes: Range<usize>,
    clip_localization_mask: bool,
    localization_threshold: f32,
}

impl Default for DamageF1Score {
    fn default() -> Self {
        Self {
            n_classes: DAMAGE_CLASSES,
            included_classes: 1..DAMAGE_CLASSES,
            clip_localization_mask: false,
            localization_threshold: 0.5,
        }
    }
}

impl DamageF1Score {
    /// Damage F1 over the standard 5-class scheme, background excluded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the class count and the classes entering the macro average.
    #[must_use]
    pub fn included_classes(mut self, n_classes: usize, included: Range<usize>) -> Self {
        self.n_classes = n_classes;
        self.included_classes = included;
        self
    }

    /// When enabled, pixels the prediction itself localizes as
    /// non-building (channel 0 probability at or above the localization
    /// threshold) are excluded from accumulation entirely, so
    /// damage-class errors never get credit or blame on pixels predicted
    /// as non-building. This decouples the localization and damage error
    /// budgets.
    #[must_use]
    pub fn clip_localization_mask(mut self, clip: bool) -> Self {
        self.clip_localization_mask = clip;
        self
    }

    /// Threshold on the background channel used by mask clipping.
    #[must_use]
    pub fn localization_threshold(mut self, threshold: f32) -> Self {
        self.localization_threshold = threshold;
        self
    }

    /// Score with the localization mask taken from a companion
    /// localization prediction instead of this prediction's own
    /// background channel: pixels whose building probability (channel 0
    /// of `localization`) falls below the localization threshold are
    /// excluded from accumulation entirely. For evaluating a damage
    /// classifier next to a separately trained localizer; applies
    /// regardless of the `clip_localization_mask` flag, which only
    /// governs [`score`](ImageMetric::score).
    ///
    /// Note the channel conventions differ: a localizer's channel 0
    /// carries building probability, a classifier's channel 0 carries
    /// background probability.
    pub fn score_clipped(
        &self,
        prediction: &ArrayView3<f32>,
        localization: &ArrayView3<f32>,
        ground_truth: &ArrayView2<u8>,
    ) -> f64 {
        let building = localization
            .index_axis(Axis(0), 0)
            .mapv(|p| p >= self.localization_threshold);
        let mut acc = ConfusionAccumulator::new(self.n_classes);
        acc.update(
            &argmax_labels(prediction).view(),
            ground_truth,
            Some(&building.view()),
        );
        self.macro_f1(&acc)
    }

    fn macro_f1(&self, acc: &ConfusionAccumulator) -> f64 {
        let included = self.included_classes.clone();
        if included.is_empty() {
            return 0.0;
        }
        let count = included.len();
        let sum: f64 = included
            .map(|class| {
                let (tp, fp, fn_) = acc.counts(class);
                f_score(tp, fp, fn_, 1.0)
            })
            .sum();
        sum / count as f64
    }
}

impl ImageMetric for DamageF1Score {
    fn score(&self, prediction: &ArrayView3<f32>, ground_truth: &ArrayView2<u8>) -> f64 {
        let predicted = argmax_labels(prediction);
        let mut acc = ConfusionAccumulator::new(self.n_classes);

        if self.clip_localization_mask {
            let background = prediction.index_axis(Axis(0), 0);
            let building = background.mapv(|p| p < self.localization_threshold);
            acc.update(&predicted.view(), ground_truth, Some(&building.view()));
        } else {
            acc.update(&predicted.view(), ground_truth, None);
        }

        self.macro_f1(&acc)
    }

    fn name(&self) -> &str {
        "DamageF1"
    }
}

/// Dice score of one binarized channel against a ground-truth mask.
///
/// The truth mask defaults to the whole foreground (`ground_truth > 0`);
/// [`truth_class`](Dice::truth_class) narrows it to a single class for
/// per-class overlap. `inverse` complements the binarized prediction
/// before comparison, for channels that carry background/no-damage
/// probability.
#[derive(Clone, Debug)]
pub struct Dice {
    channel: usize,
    threshold: f32,
    inverse: bool,
    truth_class: Option<u8>,
}

impl Dice {
    /// Dice over `channel`, binarized at `threshold`, against the
    /// foreground mask.
    pub fn new(channel: usize, threshold: f32) -> Self {
        Self {
            channel,
            threshold,
            inverse: false,
            truth_class: None,
        }
    }

    /// Complement the binarized prediction mask before scoring.
    #[must_use]
    pub fn inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    /// Compare against a single ground-truth class instead of the whole
    /// foreground.
    #[must_use]
    pub fn truth_class(mut self, class: u8) -> Self {
        self.truth_class = Some(class);
        self
    }
}

impl ImageMetric for Dice {
    fn score(&self, prediction: &ArrayView3<f32>, ground_truth: &ArrayView2<u8>) -> f64 {
        let probs = prediction.index_axis(Axis(0), self.channel);
        let predicted = probs.mapv(|p| u8::from((p >= self.threshold) != self.inverse));
        let truth = match self.truth_class {
            Some(class) => ground_truth.mapv(|t| u8::from(t == class)),
            None => ground_truth.mapv(|t| u8::from(t > 0)),
        };

        let mut acc = ConfusionAccumulator::new(2);
        acc.update(&predicted.view(), &truth.view(), None);
        let (tp, fp, fn_) = acc.counts(1);
        dice(tp, fp, fn_)
    }

    fn name(&self) -> &str {
        "Dice"
    }
}
