use super::bins::LiquidityVector;
use crate::types::NUM_BINS;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Keeps far tails strictly positive so a template never normalizes to zero
const DENSITY_FLOOR: f64 = 1e-6;

/// Parametric liquidity shapes on the log-price axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeTemplate {
    Uniform,
    Gaussian { center: f64, width: f64 },
    Bimodal { separation: f64, width: f64 },
    Laplace { center: f64, scale: f64 },
    /// Split normal: different widths left and right of `center`
    Skewed { center: f64, left_width: f64, right_width: f64 },
}

impl ShapeTemplate {
    pub fn density(&self, x: f64) -> f64 {
        match *self {
            ShapeTemplate::Uniform => 1.0,
            ShapeTemplate::Gaussian { center, width } => gaussian(x, center, width),
            ShapeTemplate::Bimodal { separation, width } => {
                gaussian(x, -separation / 2.0, width) + gaussian(x, separation / 2.0, width)
            }
            ShapeTemplate::Laplace { center, scale } => {
                (-(x - center).abs() / scale.max(1e-3)).exp()
            }
            ShapeTemplate::Skewed {
                center,
                left_width,
                right_width,
            } => {
                if x < center {
                    gaussian(x, center, left_width)
                } else {
                    gaussian(x, center, right_width)
                }
            }
        }
    }

    pub fn build(&self) -> LiquidityVector {
        let weights = (0..NUM_BINS)
            .map(|i| self.density(LiquidityVector::bin_center(i)) + DENSITY_FLOOR)
            .collect();
        LiquidityVector::from_weights(weights).unwrap_or_else(|_| LiquidityVector::uniform())
    }

    /// A template with randomized parameters, used to seed populations.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..5) {
            0 => ShapeTemplate::Uniform,
            1 => ShapeTemplate::Gaussian {
                center: rng.gen_range(-0.3..0.3),
                width: rng.gen_range(0.1..1.0),
            },
            2 => ShapeTemplate::Bimodal {
                separation: rng.gen_range(0.3..1.5),
                width: rng.gen_range(0.1..0.5),
            },
            3 => ShapeTemplate::Laplace {
                center: rng.gen_range(-0.2..0.2),
                scale: rng.gen_range(0.05..0.6),
            },
            _ => ShapeTemplate::Skewed {
                center: rng.gen_range(-0.2..0.2),
                left_width: rng.gen_range(0.1..0.8),
                right_width: rng.gen_range(0.1..0.8),
            },
        }
    }
}

fn gaussian(x: f64, center: f64, width: f64) -> f64 {
    let w = width.max(1e-3);
    (-0.5 * ((x - center) / w).powi(2)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TOTAL_LIQUIDITY;

    #[test]
    fn test_gaussian_peaks_at_center() {
        let bins = ShapeTemplate::Gaussian {
            center: 0.0,
            width: 0.2,
        }
        .build();
        let weights = bins.weights();
        let peak = weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        assert!(peak == NUM_BINS / 2 || peak == NUM_BINS / 2 - 1);
        assert!((bins.total() - TOTAL_LIQUIDITY).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_template_matches_uniform_vector() {
        let built = ShapeTemplate::Uniform.build();
        for (a, b) in built.weights().iter().zip(LiquidityVector::uniform().weights()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
