//! # valorar
//!
//! Experiment management for image-segmentation and building-damage
//! classification models: versioned checkpoint persistence and composable,
//! weighted multi-class metric evaluation.
//!
//! ## Architecture
//!
//! - [`eval`]: confusion accumulation, F-beta/Dice score functions,
//!   per-image metrics and weighted composites
//! - [`checkpoint`]: checkpoint identity, metadata, opaque model state and
//!   the storage-backed [`CheckpointManager`]
//! - [`model`]: architecture-dispatch layer constructing models from a
//!   backbone, a prior model, or a stored checkpoint
//!
//! ## Example
//!
//! ```
//! use valorar::eval::WeightedImageMetric;
//! use ndarray::{Array2, Array3};
//!
//! let metric = WeightedImageMetric::xview2_classification();
//! let prediction = Array3::<f32>::zeros((5, 4, 4));
//! let ground_truth = Array2::<u8>::zeros((4, 4));
//! let score = metric.score_detailed(&prediction.view(), &ground_truth.view());
//! assert!(score.total >= 0.0 && score.total <= 1.0);
//! ```

pub mod checkpoint;
pub mod error;
pub mod eval;
pub mod model;

pub use checkpoint::{Checkpoint, CheckpointManager, Metadata, ModelState, ShapeSpec};
pub use error::{Error, Result};
pub use eval::{
    dice, f_score, ConfusionAccumulator, DamageF1Score, Dice, ImageMetric, LocalizationF1Score,
    ScoreAverage, WeightedImageMetric, WeightedScore,
};
pub use model::{Backbone, Head, ModelWrapper};
