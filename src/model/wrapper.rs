//! Model construction from backbone, prior model, or checkpoint

use ndarray::{Array4, ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::checkpoint::{Checkpoint, CheckpointManager, Metadata, ModelState, ShapeSpec};
use crate::error::Result;
use crate::eval::image::DAMAGE_CLASSES;

use super::backbone::Backbone;
use super::init::kaiming_normal;

const HEAD_WEIGHT: &str = "head.weight";
const HEAD_BIAS: &str = "head.bias";

/// Task head attached to a U-Net decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Head {
    /// Single-channel building mask, sigmoid activation.
    Localizer,
    /// Per-pixel damage classes over doubled (pre/post-disaster) decoder
    /// features, softmax activation across the class axis.
    Classifier,
}

impl Head {
    /// Output channels of the head convolution.
    pub fn out_channels(&self) -> usize {
        match self {
            Head::Localizer => 1,
            Head::Classifier => DAMAGE_CLASSES,
        }
    }

    fn name_suffix(&self) -> &'static str {
        match self {
            Head::Localizer => "Localizer",
            Head::Classifier => "Classifier",
        }
    }
}

/// Fixed architecture (backbone family + task head) exposing
/// model-agnostic construction.
///
/// The wrapper holds the encoder's expected parameter shapes so that
/// checkpoint restores can be validated without consulting the
/// model-definition collaborator; the head shapes it derives itself.
#[derive(Clone, Debug)]
pub struct ModelWrapper {
    backbone: Backbone,
    head: Head,
    encoder_spec: ShapeSpec,
    data_parallel: bool,
}

impl ModelWrapper {
    /// Localization wrapper for a backbone family.
    pub fn localizer(backbone: Backbone, encoder_spec: ShapeSpec) -> Self {
        Self {
            backbone,
            head: Head::Localizer,
            encoder_spec,
            data_parallel: false,
        }
    }

    /// Damage-classification wrapper for a backbone family.
    pub fn classifier(backbone: Backbone, encoder_spec: ShapeSpec) -> Self {
        Self {
            backbone,
            head: Head::Classifier,
            encoder_spec,
            data_parallel: false,
        }
    }

    /// Hint for the training collaborator to replicate the model across
    /// devices. Configuration only; does not change parameter structure.
    #[must_use]
    pub fn data_parallel(mut self, enabled: bool) -> Self {
        self.data_parallel = enabled;
        self
    }

    /// The backbone family.
    pub fn backbone(&self) -> Backbone {
        self.backbone
    }

    /// The task head.
    pub fn head(&self) -> Head {
        self.head
    }

    /// Whether multi-device replication is requested.
    pub fn is_data_parallel(&self) -> bool {
        self.data_parallel
    }

    /// Architecture identity used for checkpoint keys, e.g.
    /// `Resnet34UnetLocalizer`.
    pub fn architecture_name(&self) -> String {
        format!("{}{}", self.backbone.name(), self.head.name_suffix())
    }

    /// Default `(height, width)` evaluation resolution for this variant.
    pub fn input_size(&self) -> (usize, usize) {
        match self.head {
            Head::Localizer => (736, 736),
            Head::Classifier => (608, 608),
        }
    }

    fn head_in_channels(&self) -> usize {
        match self.head {
            Head::Localizer => self.backbone.unet_out_channels(),
            // Pre- and post-disaster decoder features are concatenated.
            Head::Classifier => self.backbone.unet_out_channels() * 2,
        }
    }

    /// Expected shapes of the head parameters alone.
    pub fn head_shape_spec(&self) -> ShapeSpec {
        let out = self.head.out_channels();
        ShapeSpec::new()
            .with(HEAD_WEIGHT, vec![out, self.head_in_channels(), 1, 1])
            .with(HEAD_BIAS, vec![out])
    }

    /// Full expected parameter shapes: encoder plus head.
    pub fn shape_spec(&self) -> ShapeSpec {
        let mut spec = self.encoder_spec.clone();
        spec.extend(&self.head_shape_spec());
        spec
    }

    fn fresh_head(&self, state: &mut ModelState, seed: u64) {
        let out = self.head.out_channels();
        let mut rng = StdRng::seed_from_u64(seed);
        state.insert(
            HEAD_WEIGHT,
            kaiming_normal(&[out, self.head_in_channels(), 1, 1], &mut rng),
        );
        state.insert(HEAD_BIAS, ArrayD::zeros(IxDyn(&[out])));
    }

    /// Wrap a fresh feature-extraction backbone: its parameters plus a
    /// freshly initialized head, with empty metadata.
    pub fn from_backbone(&self, encoder: ModelState, seed: u64) -> (ModelState, Metadata) {
        let mut state = encoder;
        self.fresh_head(&mut state, seed);
        (state, Metadata::new())
    }

    /// Wrap an already-assembled model, e.g. chaining a trained localizer
    /// into a classifier: its encoder parameters are kept, any prior head
    /// is dropped, and a fresh head is attached. Empty metadata.
    pub fn from_prior_model(&self, prior: ModelState, seed: u64) -> (ModelState, Metadata) {
        let encoder = ModelState::from_parameters(
            prior
                .into_parameters()
                .into_iter()
                .filter(|(name, _)| !name.starts_with("head."))
                .collect(),
        );
        self.from_backbone(encoder, seed)
    }

    /// Restore from a stored checkpoint under this wrapper's fixed
    /// architecture name.
    ///
    /// Strict mode: resuming training must reproduce identical parameter
    /// structure, so any structural disagreement is
    /// [`Error::ShapeMismatch`](crate::Error::ShapeMismatch) and a
    /// missing artifact surfaces as
    /// [`Error::CheckpointNotFound`](crate::Error::CheckpointNotFound) —
    /// never a silent fresh model or partial load.
    pub fn from_checkpoint(
        &self,
        manager: &CheckpointManager,
        version: &str,
        seed: u64,
    ) -> Result<(ModelState, Metadata)> {
        let checkpoint = Checkpoint::new(self.architecture_name(), version, seed);
        debug!(checkpoint = %checkpoint, "restoring model from checkpoint");
        manager.load_strict(&checkpoint, &self.shape_spec())
    }

    /// Architecture-specific final nonlinearity over raw `(batch,
    /// channels, height, width)` output: sigmoid for localization masks,
    /// per-pixel softmax across the class axis for damage output.
    pub fn apply_activation(&self, raw: &Array4<f32>) -> Array4<f32> {
        match self.head {
            Head::Localizer => raw.mapv(sigmoid),
            Head::Classifier => softmax_channels(raw),
        }
    }
}

/// Numerically stable sigmoid.
fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Softmax across the channel axis, per pixel, max-subtracted for
/// stability.
fn softmax_channels(raw: &Array4<f32>) -> Array4<f32> {
    let (batch, channels, height, width) = raw.dim();
    let mut out = raw.clone();
    for n in 0..batch {
        for y in 0..height {
            for x in 0..width {
                let mut max = f32::NEG_INFINITY;
                for c in 0..channels {
                    max = max.max(raw[[n, c, y, x]]);
                }
                let mut sum = 0.0;
                for c in 0..channels {
                    let e = (raw[[n, c, y, x]] - max).exp();
                    out[[n, c, y, x]] = e;
                    sum += e;
                }
                for c in 0..channels {
                    out[[n, c, y, x]] /= sum;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::ArrayD;

    fn encoder_spec() -> ShapeSpec {
        ShapeSpec::new()
            .with("encoder.conv1.weight", vec![16, 3, 3, 3])
            .with("encoder.conv1.bias", vec![16])
    }

    fn encoder_state() -> ModelState {
        let mut state = ModelState::new();
        state.insert("encoder.conv1.weight", ArrayD::from_elem(IxDyn(&[16, 3, 3, 3]), 0.5));
        state.insert("encoder.conv1.bias", ArrayD::zeros(IxDyn(&[16])));
        state
    }

    #[test]
    fn test_architecture_names_match_original_scheme() {
        let loc = ModelWrapper::localizer(Backbone::Resnet34, ShapeSpec::new());
        assert_eq!(loc.architecture_name(), "Resnet34UnetLocalizer");

        let cls = ModelWrapper::classifier(Backbone::SeResnext50, ShapeSpec::new());
        assert_eq!(cls.architecture_name(), "SeResnext50UnetClassifier");
    }

    #[test]
    fn test_input_sizes_per_head() {
        let loc = ModelWrapper::localizer(Backbone::Resnet34, ShapeSpec::new());
        assert_eq!(loc.input_size(), (736, 736));
        let cls = ModelWrapper::classifier(Backbone::Resnet34, ShapeSpec::new());
        assert_eq!(cls.input_size(), (608, 608));
    }

    #[test]
    fn test_head_shapes() {
        let loc = ModelWrapper::localizer(Backbone::Resnet34, ShapeSpec::new());
        let spec = loc.head_shape_spec();
        assert_eq!(spec.expected("head.weight"), Some(&[1, 32, 1, 1][..]));
        assert_eq!(spec.expected("head.bias"), Some(&[1][..]));

        // Classifier head consumes doubled decoder features.
        let cls = ModelWrapper::classifier(Backbone::Resnet34, ShapeSpec::new());
        let spec = cls.head_shape_spec();
        assert_eq!(spec.expected("head.weight"), Some(&[5, 64, 1, 1][..]));
        assert_eq!(spec.expected("head.bias"), Some(&[5][..]));
    }

    #[test]
    fn test_from_backbone_attaches_fresh_head() {
        let wrapper = ModelWrapper::localizer(Backbone::Resnet34, encoder_spec());
        let (state, metadata) = wrapper.from_backbone(encoder_state(), 42);

        assert_eq!(metadata, Metadata::new());
        assert!(state.check_strict(&wrapper.shape_spec()).is_ok());
        // Bias starts at zero, weight does not.
        assert!(state.get("head.bias").unwrap().iter().all(|&v| v == 0.0));
        assert!(state.get("head.weight").unwrap().iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_from_backbone_is_seed_deterministic() {
        let wrapper = ModelWrapper::localizer(Backbone::Resnet34, encoder_spec());
        let (a, _) = wrapper.from_backbone(encoder_state(), 42);
        let (b, _) = wrapper.from_backbone(encoder_state(), 42);
        let (c, _) = wrapper.from_backbone(encoder_state(), 43);
        assert_eq!(a.get("head.weight"), b.get("head.weight"));
        assert_ne!(a.get("head.weight"), c.get("head.weight"));
    }

    #[test]
    fn test_from_prior_model_replaces_head() {
        let localizer = ModelWrapper::localizer(Backbone::Resnet34, encoder_spec());
        let (trained, _) = localizer.from_backbone(encoder_state(), 1);

        let classifier = ModelWrapper::classifier(Backbone::Resnet34, encoder_spec());
        let (state, metadata) = classifier.from_prior_model(trained, 2);

        assert_eq!(metadata, Metadata::new());
        assert!(state.check_strict(&classifier.shape_spec()).is_ok());
        assert_eq!(state.get("head.weight").unwrap().shape(), &[5, 64, 1, 1]);
        // Encoder carried over untouched.
        assert_eq!(state.get("encoder.conv1.weight").unwrap()[[0, 0, 0, 0]], 0.5);
    }

    #[test]
    fn test_sigmoid_activation() {
        let wrapper = ModelWrapper::localizer(Backbone::Resnet34, ShapeSpec::new());
        let raw = Array4::from_elem((1, 1, 2, 2), 0.0);
        let probs = wrapper.apply_activation(&raw);
        for &p in probs.iter() {
            assert_relative_eq!(p, 0.5);
        }

        let raw = Array4::from_elem((1, 1, 1, 1), 100.0);
        let probs = wrapper.apply_activation(&raw);
        assert!(probs[[0, 0, 0, 0]] > 0.999);
        assert!(probs[[0, 0, 0, 0]] <= 1.0);
    }

    #[test]
    fn test_softmax_activation_sums_to_one() {
        let wrapper = ModelWrapper::classifier(Backbone::Resnet34, ShapeSpec::new());
        let mut raw = Array4::zeros((1, 5, 2, 2));
        raw[[0, 2, 0, 0]] = 3.0;
        raw[[0, 4, 1, 1]] = -2.0;
        let probs = wrapper.apply_activation(&raw);

        for y in 0..2 {
            for x in 0..2 {
                let sum: f32 = (0..5).map(|c| probs[[0, c, y, x]]).sum();
                assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
            }
        }
        // The boosted channel dominates its pixel.
        let argmax = (0..5).max_by(|&a, &b| {
            probs[[0, a, 0, 0]].partial_cmp(&probs[[0, b, 0, 0]]).unwrap()
        });
        assert_eq!(argmax, Some(2));
    }

    #[test]
    fn test_softmax_stable_for_large_logits() {
        let wrapper = ModelWrapper::classifier(Backbone::Resnet34, ShapeSpec::new());
        let raw = Array4::from_elem((1, 5, 1, 1), 1000.0);
        let probs = wrapper.apply_activation(&raw);
        for &p in probs.iter() {
            assert!(p.is_finite());
            assert_relative_eq!(p, 0.2, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_data_parallel_is_configuration_only() {
        let plain = ModelWrapper::classifier(Backbone::Dpn92, encoder_spec());
        let parallel = plain.clone().data_parallel(true);
        assert!(!plain.is_data_parallel());
        assert!(parallel.is_data_parallel());
        assert_eq!(plain.shape_spec(), parallel.shape_spec());
    }
}
