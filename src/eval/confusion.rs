//! Per-class confusion accumulation over label arrays

use ndarray::ArrayView2;

/// Accumulates true-positive / false-positive / false-negative counts per
/// class across batches or images.
///
/// Counts never decrease within an evaluation pass; call [`reset`] at the
/// start of each pass. One accumulator per evaluation worker — this type
/// is deliberately not synchronized.
///
/// [`reset`]: ConfusionAccumulator::reset
#[derive(Clone, Debug)]
pub struct ConfusionAccumulator {
    tp: Vec<u64>,
    fp: Vec<u64>,
    fn_: Vec<u64>,
    n_classes: usize,
    selected: u64,
}

impl ConfusionAccumulator {
    /// Create an accumulator for a fixed, known class index set `[0, n_classes)`.
    pub fn new(n_classes: usize) -> Self {
        Self {
            tp: vec![0; n_classes],
            fp: vec![0; n_classes],
            fn_: vec![0; n_classes],
            n_classes,
            selected: 0,
        }
    }

    /// Clear all per-class counts to zero.
    pub fn reset(&mut self) {
        self.tp.fill(0);
        self.fp.fill(0);
        self.fn_.fill(0);
        self.selected = 0;
    }

    /// Number of classes tracked.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of elements that participated in accumulation so far.
    pub fn total_selected(&self) -> u64 {
        self.selected
    }

    /// Accumulate one pair of same-shaped label arrays.
    ///
    /// `mask` selects which elements participate; `None` selects all.
    /// Used to exclude undefined ground truth, e.g. pixels the companion
    /// localization prediction calls non-building. Elements whose labels
    /// both fall outside `[0, n_classes)` are ignored, matching the
    /// bounds behavior of [`from_labels`].
    ///
    /// # Panics
    ///
    /// Panics if the arrays (or the mask) differ in shape.
    ///
    /// [`from_labels`]: ConfusionAccumulator::from_labels
    pub fn update(
        &mut self,
        predicted: &ArrayView2<u8>,
        ground_truth: &ArrayView2<u8>,
        mask: Option<&ArrayView2<bool>>,
    ) {
        assert_eq!(
            predicted.dim(),
            ground_truth.dim(),
            "Predicted and ground-truth labels must have same shape"
        );
        match mask {
            Some(m) => {
                assert_eq!(m.dim(), predicted.dim(), "Mask must match label shape");
                for ((&p, &t), &keep) in predicted.iter().zip(ground_truth.iter()).zip(m.iter()) {
                    if keep {
                        self.record(p, t);
                    }
                }
            }
            None => {
                for (&p, &t) in predicted.iter().zip(ground_truth.iter()) {
                    self.record(p, t);
                }
            }
        }
    }

    /// Convenience: accumulate a single pair into a fresh accumulator.
    pub fn from_labels(
        n_classes: usize,
        predicted: &ArrayView2<u8>,
        ground_truth: &ArrayView2<u8>,
    ) -> Self {
        let mut acc = Self::new(n_classes);
        acc.update(predicted, ground_truth, None);
        acc
    }

    fn record(&mut self, predicted: u8, truth: u8) {
        let (p, t) = (predicted as usize, truth as usize);
        if p >= self.n_classes && t >= self.n_classes {
            return;
        }
        self.selected += 1;
        if p == t {
            self.tp[p] += 1;
        } else {
            if p < self.n_classes {
                self.fp[p] += 1;
            }
            if t < self.n_classes {
                self.fn_[t] += 1;
            }
        }
    }

    /// Current `(tp, fp, fn)` triple for a class.
    ///
    /// # Panics
    ///
    /// Panics if `class >= n_classes`.
    pub fn counts(&self, class: usize) -> (u64, u64, u64) {
        (self.tp[class], self.fp[class], self.fn_[class])
    }
}
