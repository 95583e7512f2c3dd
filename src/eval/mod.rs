//! Prediction scoring: confusion accumulation, score functions, per-image
//! metrics and weighted composites.
//!
//! ## Architecture
//!
//! - `confusion`: per-class tp/fp/fn accumulation over label arrays
//! - `score`: pure F-beta / Dice score functions on accumulated counts
//! - `image`: the [`ImageMetric`] contract and its variants
//! - `weighted`: named, weighted composition of image metrics
//! - `aggregate`: dataset-level averaging of per-image scores
//!
//! Scoring is per image: every [`ImageMetric::score`] call starts from a
//! fresh accumulator. Dataset-level results come from aggregating the
//! returned scores (see [`ScoreAverage`]), which is embarrassingly
//! parallel across images as long as each worker owns its own metric
//! instances.

pub mod aggregate;
pub mod confusion;
pub mod image;
pub mod score;
pub mod weighted;

pub use aggregate::{ScoreAverage, WeightedScoreAverage};
pub use confusion::ConfusionAccumulator;
pub use image::{DamageF1Score, Dice, ImageMetric, LocalizationF1Score};
pub use score::{dice, f_score, precision, recall};
pub use weighted::{WeightedImageMetric, WeightedScore};
