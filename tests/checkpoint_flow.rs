//! End-to-end checkpoint flow: construct a model, evaluate, persist on
//! improvement, and resume — the loop the training collaborator drives.

use ndarray::{Array2, Array3, ArrayD, IxDyn};
use tempfile::TempDir;
use valorar::eval::{ImageMetric, ScoreAverage, WeightedImageMetric};
use valorar::{
    Backbone, Checkpoint, CheckpointManager, Error, Metadata, ModelState, ModelWrapper, ShapeSpec,
};

fn encoder_spec() -> ShapeSpec {
    ShapeSpec::new()
        .with("encoder.conv1.weight", vec![8, 3, 3, 3])
        .with("encoder.conv1.bias", vec![8])
}

fn encoder_state() -> ModelState {
    let mut state = ModelState::new();
    state.insert(
        "encoder.conv1.weight",
        ArrayD::from_shape_vec(IxDyn(&[8, 3, 3, 3]), (0..216).map(|i| i as f32 * 0.01).collect())
            .unwrap(),
    );
    state.insert("encoder.conv1.bias", ArrayD::zeros(IxDyn(&[8])));
    state
}

/// One-hot classifier prediction agreeing with the ground truth.
fn perfect_prediction(truth: &Array2<u8>) -> Array3<f32> {
    let (h, w) = truth.dim();
    let mut pred = Array3::<f32>::zeros((5, h, w));
    for y in 0..h {
        for x in 0..w {
            pred[[truth[[y, x]] as usize, y, x]] = 1.0;
        }
    }
    pred
}

#[test]
fn train_evaluate_checkpoint_resume_cycle() {
    let storage = TempDir::new().unwrap();
    let manager = CheckpointManager::new(storage.path());
    let wrapper = ModelWrapper::classifier(Backbone::Resnet34, encoder_spec());

    // Fresh model from a pretrained backbone.
    let (state, mut metadata) = wrapper.from_backbone(encoder_state(), 545);
    assert_eq!(metadata, Metadata::new());

    // Evaluate over a small "dataset" of perfect predictions.
    let metric = WeightedImageMetric::xview2_classification();
    let mut average = ScoreAverage::new();
    for truth in [
        Array2::from_shape_fn((4, 4), |(y, x)| ((y * 4 + x) % 5) as u8),
        Array2::from_shape_fn((4, 4), |(y, x)| ((y + x) % 5) as u8),
    ] {
        let pred = perfect_prediction(&truth);
        average.push(metric.score(&pred.view(), &truth.view()));
    }
    let score = average.mean();
    assert!(score > 0.99, "perfect predictions should score ~1.0, got {score}");

    // First evaluation always improves; persist the new best.
    assert!(CheckpointManager::is_better(score, &metadata));
    metadata.record_best(score);
    metadata.record_epoch(1);
    let checkpoint = Checkpoint::new(wrapper.architecture_name(), "v1", 545);
    manager.save(&checkpoint, &state, &metadata).unwrap();

    // A tying score must not trigger another best.
    assert!(!CheckpointManager::is_better(score, &metadata));

    // Resume: strict restore through the wrapper reproduces everything.
    let (resumed_state, resumed_metadata) = wrapper.from_checkpoint(&manager, "v1", 545).unwrap();
    assert_eq!(resumed_state, state);
    assert_eq!(resumed_metadata.epoch, 1);
    assert_eq!(resumed_metadata.best_score, Some(score));
}

#[test]
fn strict_resume_rejects_different_architecture() {
    let storage = TempDir::new().unwrap();
    let manager = CheckpointManager::new(storage.path());

    // Train and save a localizer...
    let localizer = ModelWrapper::localizer(Backbone::Resnet34, encoder_spec());
    let (state, metadata) = localizer.from_backbone(encoder_state(), 7);
    let checkpoint = Checkpoint::new(localizer.architecture_name(), "v1", 7);
    manager.save(&checkpoint, &state, &metadata).unwrap();

    // ...then try to resume it as a classifier under the same key. The
    // head shapes disagree, so strict loading must abort.
    let classifier = ModelWrapper::classifier(Backbone::Resnet34, encoder_spec());
    let err = manager
        .load_strict(&checkpoint, &classifier.shape_spec())
        .unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { name, .. } if name == "head.weight"));
}

#[test]
fn warm_start_via_compatible_load_keeps_encoder() {
    let storage = TempDir::new().unwrap();
    let manager = CheckpointManager::new(storage.path());

    let localizer = ModelWrapper::localizer(Backbone::Resnet34, encoder_spec());
    let (state, metadata) = localizer.from_backbone(encoder_state(), 7);
    let checkpoint = Checkpoint::new(localizer.architecture_name(), "v1", 7);
    manager.save(&checkpoint, &state, &metadata).unwrap();

    // Warm-start a classifier from the localizer checkpoint: the shared
    // encoder survives, the structurally different head drops silently.
    let classifier = ModelWrapper::classifier(Backbone::Resnet34, encoder_spec());
    let (partial, _) = manager
        .load_compatible(&checkpoint, &classifier.shape_spec())
        .unwrap();
    assert!(partial.get("encoder.conv1.weight").is_some());
    assert!(partial.get("encoder.conv1.bias").is_some());
    assert!(partial.get("head.weight").is_none());
    assert!(partial.get("head.bias").is_none());

    let missing = manager
        .load_compatible(&Checkpoint::new("NoSuchNet", "v1", 7), &classifier.shape_spec())
        .unwrap_err();
    assert!(matches!(missing, Error::CheckpointNotFound(_)));
}

#[test]
fn resume_from_absent_checkpoint_is_an_error_not_a_fresh_model() {
    let storage = TempDir::new().unwrap();
    let manager = CheckpointManager::new(storage.path());
    let wrapper = ModelWrapper::localizer(Backbone::Dpn92, encoder_spec());

    let err = wrapper.from_checkpoint(&manager, "v9", 1).unwrap_err();
    assert!(matches!(err, Error::CheckpointNotFound(_)));
}
