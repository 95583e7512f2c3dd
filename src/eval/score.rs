//! Pure score functions over accumulated confusion counts
//!
//! All functions are deterministic, stateless, and total: the
//! zero-denominator edge case (no positives predicted or present)
//! returns a defined score of 0 rather than an error or NaN, so that
//! aggregation code can average many scores unattended.

/// F-beta score: `(1+β²)·tp / ((1+β²)·tp + β²·fn + fp)`.
///
/// Returns 0 when the denominator is 0.
pub fn f_score(tp: u64, fp: u64, fn_: u64, beta: f64) -> f64 {
    let beta2 = beta * beta;
    let numerator = (1.0 + beta2) * tp as f64;
    let denominator = numerator + beta2 * fn_ as f64 + fp as f64;
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Dice score: `2·tp / (2·tp + fp + fn)`, the β=1 special case of
/// [`f_score`] expressed directly.
///
/// Returns 0 when the denominator is 0.
pub fn dice(tp: u64, fp: u64, fn_: u64) -> f64 {
    let numerator = 2.0 * tp as f64;
    let denominator = numerator + fp as f64 + fn_ as f64;
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Precision: `tp / (tp + fp)`, 0 when nothing was predicted positive.
pub fn precision(tp: u64, fp: u64) -> f64 {
    if tp + fp == 0 {
        0.0
    } else {
        tp as f64 / (tp + fp) as f64
    }
}

/// Recall: `tp / (tp + fn)`, 0 when no positives are present.
pub fn recall(tp: u64, fn_: u64) -> f64 {
    if tp + fn_ == 0 {
        0.0
    } else {
        tp as f64 / (tp + fn_) as f64
    }
}
