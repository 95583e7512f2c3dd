//! Weighted composition of named image metrics

use ndarray::{ArrayView2, ArrayView3};

use super::image::{DamageF1Score, ImageMetric, LocalizationF1Score};

/// Result of a weighted composite evaluation: the headline weighted sum
/// plus the individual named sub-scores for diagnostics.
#[derive(Clone, Debug)]
pub struct WeightedScore {
    /// `Σ weightᵢ · scoreᵢ` over the composed metrics.
    pub total: f64,
    /// `(label, score)` per sub-metric, in composition order.
    pub parts: Vec<(String, f64)>,
}

impl WeightedScore {
    /// Sub-score by label.
    pub fn part(&self, label: &str) -> Option<f64> {
        self.parts.iter().find(|(l, _)| l == label).map(|&(_, s)| s)
    }
}

/// Composes named `(label, metric, weight)` triples into a single score.
///
/// The composite is the literal weighted sum of the sub-scores — weights
/// are not required to sum to 1 and no normalization is performed, so
/// callers pick arbitrary emphasis (weights summing to 1 yield a convex
/// combination).
#[derive(Default)]
pub struct WeightedImageMetric {
    parts: Vec<(String, Box<dyn ImageMetric>, f64)>,
}

impl WeightedImageMetric {
    /// Empty composite; add parts with [`with`](WeightedImageMetric::with).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named, weighted sub-metric.
    #[must_use]
    pub fn with(
        mut self,
        label: impl Into<String>,
        metric: impl ImageMetric + 'static,
        weight: f64,
    ) -> Self {
        self.parts.push((label.into(), Box::new(metric), weight));
        self
    }

    /// The xView2 classification composite: 0.3 localization F1 (from the
    /// inverse of the background channel) + 0.7 damage F1 with the
    /// localization mask clipped.
    pub fn xview2_classification() -> Self {
        Self::new()
            .with("F1Loc", LocalizationF1Score::new().inverse(true), 0.3)
            .with("F1Damage", DamageF1Score::new().clip_localization_mask(true), 0.7)
    }

    /// The xView2 localization score: plain localization F1.
    pub fn xview2_localization() -> Self {
        Self::new().with("F1Loc", LocalizationF1Score::new(), 1.0)
    }

    /// Number of composed sub-metrics.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the composite is empty.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Labels in composition order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(l, _, _)| l.as_str())
    }

    /// Score each sub-metric independently on the same image and return
    /// the weighted sum alongside the named sub-scores.
    pub fn score_detailed(
        &self,
        prediction: &ArrayView3<f32>,
        ground_truth: &ArrayView2<u8>,
    ) -> WeightedScore {
        let mut total = 0.0;
        let mut parts = Vec::with_capacity(self.parts.len());
        for (label, metric, weight) in &self.parts {
            let score = metric.score(prediction, ground_truth);
            total += weight * score;
            parts.push((label.clone(), score));
        }
        WeightedScore { total, parts }
    }
}

impl ImageMetric for WeightedImageMetric {
    fn score(&self, prediction: &ArrayView3<f32>, ground_truth: &ArrayView2<u8>) -> f64 {
        self.score_detailed(prediction, ground_truth).total
    }

    fn name(&self) -> &str {
        "Weighted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, Array3};

    /// Metric returning a fixed score, for composition arithmetic.
    struct Constant(f64);

    impl ImageMetric for Constant {
        fn score(&self, _: &ArrayView3<f32>, _: &ArrayView2<u8>) -> f64 {
            self.0
        }

        fn name(&self) -> &str {
            "Constant"
        }
    }

    fn empty_image() -> (Array3<f32>, Array2<u8>) {
        (Array3::zeros((1, 2, 2)), Array2::zeros((2, 2)))
    }

    #[test]
    fn test_composite_is_literal_weighted_sum() {
        let metric = WeightedImageMetric::new()
            .with("a", Constant(1.0), 0.3)
            .with("b", Constant(0.0), 0.7);
        let (pred, truth) = empty_image();
        let result = metric.score_detailed(&pred.view(), &truth.view());
        assert_relative_eq!(result.total, 0.3);
        assert_relative_eq!(result.part("a").unwrap(), 1.0);
        assert_relative_eq!(result.part("b").unwrap(), 0.0);
    }

    #[test]
    fn test_weights_need_not_sum_to_one() {
        let metric = WeightedImageMetric::new()
            .with("a", Constant(0.5), 2.0)
            .with("b", Constant(0.5), 2.0);
        let (pred, truth) = empty_image();
        assert_relative_eq!(metric.score(&pred.view(), &truth.view()), 2.0);
    }

    #[test]
    fn test_empty_composite_scores_zero() {
        let metric = WeightedImageMetric::new();
        let (pred, truth) = empty_image();
        assert!(metric.is_empty());
        assert_eq!(metric.score(&pred.view(), &truth.view()), 0.0);
    }

    #[test]
    fn test_parts_preserve_order_and_labels() {
        let metric = WeightedImageMetric::new()
            .with("first", Constant(0.1), 1.0)
            .with("second", Constant(0.2), 1.0);
        assert_eq!(metric.labels().collect::<Vec<_>>(), vec!["first", "second"]);
        let (pred, truth) = empty_image();
        let result = metric.score_detailed(&pred.view(), &truth.view());
        assert_eq!(result.parts[0].0, "first");
        assert_eq!(result.parts[1].0, "second");
        assert!(result.part("missing").is_none());
    }

    #[test]
    fn test_xview2_classification_composite_shape() {
        let metric = WeightedImageMetric::xview2_classification();
        assert_eq!(metric.len(), 2);
        assert_eq!(metric.labels().collect::<Vec<_>>(), vec!["F1Loc", "F1Damage"]);
    }

    #[test]
    fn test_xview2_classification_perfect_prediction() {
        // One-hot classifier output exactly matching ground truth scores
        // 1.0 on both components, so the composite is 0.3 + 0.7 = 1.0.
        let truth = ndarray::array![[0u8, 1, 2], [3, 4, 4]];
        let mut pred = Array3::<f32>::zeros((5, 2, 3));
        for y in 0..2 {
            for x in 0..3 {
                pred[[truth[[y, x]] as usize, y, x]] = 1.0;
            }
        }
        let metric = WeightedImageMetric::xview2_classification();
        let result = metric.score_detailed(&pred.view(), &truth.view());
        assert_relative_eq!(result.part("F1Loc").unwrap(), 1.0);
        assert_relative_eq!(result.part("F1Damage").unwrap(), 1.0);
        assert_relative_eq!(result.total, 1.0);
    }
}
