// src/engines/metrics/features.rs
use crate::liquidity::LiquidityVector;
use crate::types::FeatureVector;

const MAX_TAIL_RATIO: f64 = 1e6;

/// Shape descriptors of a liquidity vector. Pure and simulation-free.
///
/// All descriptors are taken over the weights rescaled to a probability distribution:
/// - curvature: sum of squared second differences
/// - entropy: Shannon entropy in bits (0 for a single bin, `log2(N)` when uniform)
/// - symmetry: Pearson correlation of the left half with the mirrored right half
/// - tail density ratio: mass in the outer quartiles over mass in the central half
/// - peak concentration: max weight over mean weight
pub fn compute_features(bins: &LiquidityVector) -> FeatureVector {
    let total = bins.total();
    let n = bins.len();
    if n == 0 || !(total > 0.0) {
        return FeatureVector::default();
    }
    let p: Vec<f64> = bins.weights().iter().map(|w| w / total).collect();

    let curvature = p
        .windows(3)
        .map(|w| (w[0] - 2.0 * w[1] + w[2]).powi(2))
        .sum();

    let entropy = -p
        .iter()
        .filter(|&&x| x > 0.0)
        .map(|&x| x * x.log2())
        .sum::<f64>();

    let half = n / 2;
    let left = &p[..half];
    let mirrored: Vec<f64> = p[n - half..].iter().rev().copied().collect();
    let symmetry = pearson(left, &mirrored);

    let quarter = n / 4;
    let tails: f64 = p[..quarter].iter().sum::<f64>() + p[n - quarter..].iter().sum::<f64>();
    let center: f64 = p[quarter..n - quarter].iter().sum();
    let tail_density_ratio = if center > f64::EPSILON {
        (tails / center).min(MAX_TAIL_RATIO)
    } else {
        MAX_TAIL_RATIO
    };

    let max = p.iter().copied().fold(0.0, f64::max);
    let peak_concentration = max * n as f64;

    FeatureVector {
        curvature,
        entropy: entropy.max(0.0),
        symmetry,
        tail_density_ratio,
        peak_concentration,
    }
}

/// Pearson correlation. Constant inputs correlate 1 when identical and 0 otherwise.
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a <= 1e-30 || var_b <= 1e-30 {
        let identical = a[..n].iter().zip(&b[..n]).all(|(x, y)| (x - y).abs() < 1e-12);
        return if identical { 1.0 } else { 0.0 };
    }

    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}
