//! Seeded weight initialization for fresh task heads

use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::Rng;

/// Kaiming-normal tensor: zero-mean normal with `std = sqrt(2 / fan_in)`
/// where `fan_in` is the product of all non-leading dimensions.
pub(crate) fn kaiming_normal(shape: &[usize], rng: &mut StdRng) -> ArrayD<f32> {
    let fan_in: usize = shape.iter().skip(1).product::<usize>().max(1);
    let std = (2.0 / fan_in as f64).sqrt();
    let len: usize = shape.iter().product();
    let values: Vec<f32> = (0..len).map(|_| (sample_normal(rng) * std) as f32).collect();
    ArrayD::from_shape_vec(IxDyn(shape), values)
        .expect("length computed from the same shape")
}

/// Standard normal sample via Box-Muller.
fn sample_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_shape_and_determinism() {
        let mut rng = StdRng::seed_from_u64(42);
        let a = kaiming_normal(&[5, 32, 1, 1], &mut rng);
        assert_eq!(a.shape(), &[5, 32, 1, 1]);

        let mut rng = StdRng::seed_from_u64(42);
        let b = kaiming_normal(&[5, 32, 1, 1], &mut rng);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(2);
        let a = kaiming_normal(&[1, 16, 1, 1], &mut rng_a);
        let b = kaiming_normal(&[1, 16, 1, 1], &mut rng_b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_spread_tracks_fan_in() {
        // std = sqrt(2/fan_in): wide fan-in tensors have smaller spread.
        let mut rng = StdRng::seed_from_u64(7);
        let wide = kaiming_normal(&[8, 1024, 1, 1], &mut rng);
        let narrow = kaiming_normal(&[8, 4, 1, 1], &mut rng);
        let spread = |t: &ArrayD<f32>| {
            (t.iter().map(|v| f64::from(*v) * f64::from(*v)).sum::<f64>() / t.len() as f64).sqrt()
        };
        assert!(spread(&wide) < spread(&narrow));
    }
}
