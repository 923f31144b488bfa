use crate::error::{CurveLabError, Result};
use crate::types::{BIN_WIDTH, LOG_PRICE_MAX, LOG_PRICE_MIN, NUM_BINS, TOTAL_LIQUIDITY};
use rand::Rng;
use serde::{Deserialize, Serialize};

const MAX_MUTATION_INTENSITY: f64 = 1.0;
const MAX_MUTATION_ATTEMPTS: usize = 8;
/// Relative tolerance under which a vector already counts as normalized
const NORMALIZED_TOLERANCE: f64 = 1e-12;

/// Capital allocated across `NUM_BINS` log-price bins spanning
/// `[LOG_PRICE_MIN, LOG_PRICE_MAX]`.
///
/// Weights are non-negative and sum to `TOTAL_LIQUIDITY` once normalized. Every
/// transform that can change the weights re-normalizes before returning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiquidityVector {
    weights: Vec<f64>,
}

impl LiquidityVector {
    /// Build a vector from raw weights and normalize it.
    pub fn from_weights(weights: Vec<f64>) -> Result<Self> {
        if weights.len() != NUM_BINS {
            return Err(CurveLabError::DegenerateLiquidity(format!(
                "expected {} bins, got {}",
                NUM_BINS,
                weights.len()
            )));
        }
        let mut bins = Self { weights };
        bins.normalize()?;
        Ok(bins)
    }

    pub fn uniform() -> Self {
        Self {
            weights: vec![TOTAL_LIQUIDITY / NUM_BINS as f64; NUM_BINS],
        }
    }

    /// Independent uniform-random weights, normalized.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let weights = (0..NUM_BINS).map(|_| rng.gen::<f64>() + 1e-3).collect();
        // Strictly positive weights cannot be degenerate
        Self::from_weights(weights).unwrap_or_else(|_| Self::uniform())
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Rescale in place so the weights sum to `TOTAL_LIQUIDITY`.
    ///
    /// Negative or non-finite weights are zeroed first. Fails when nothing is left to
    /// scale. Applying it twice is the same as applying it once.
    pub fn normalize(&mut self) -> Result<()> {
        for w in self.weights.iter_mut() {
            if !w.is_finite() || *w < 0.0 {
                *w = 0.0;
            }
        }
        let total: f64 = self.weights.iter().sum();
        if !total.is_finite() || total <= f64::EPSILON {
            return Err(CurveLabError::DegenerateLiquidity(format!(
                "total weight {} cannot be normalized",
                total
            )));
        }
        if ((total - TOTAL_LIQUIDITY) / TOTAL_LIQUIDITY).abs() <= NORMALIZED_TOLERANCE {
            return Ok(());
        }
        let scale = TOTAL_LIQUIDITY / total;
        for w in self.weights.iter_mut() {
            *w *= scale;
        }
        Ok(())
    }

    /// Bounded multiplicative noise plus an occasional one-bin shift, re-normalized.
    ///
    /// A degenerate draw is discarded and redrawn; after repeated failures the parent
    /// is returned unchanged.
    pub fn mutate<R: Rng + ?Sized>(&self, intensity: f64, rng: &mut R) -> Self {
        let intensity = if intensity.is_finite() {
            intensity.clamp(0.0, MAX_MUTATION_INTENSITY)
        } else {
            0.0
        };
        let mean = TOTAL_LIQUIDITY / self.len().max(1) as f64;

        for _ in 0..MAX_MUTATION_ATTEMPTS {
            let mut weights: Vec<f64> = self
                .weights
                .iter()
                .map(|&w| {
                    let factor = 1.0 + intensity * rng.gen_range(-1.0..=1.0);
                    let revive = intensity * mean * 0.05 * rng.gen::<f64>();
                    (w * factor + revive).max(0.0)
                })
                .collect();

            if rng.gen::<f64>() < intensity * 0.5 {
                if rng.gen_bool(0.5) {
                    weights.rotate_right(1);
                    weights[0] = weights[1];
                } else {
                    weights.rotate_left(1);
                    let last = weights.len() - 1;
                    weights[last] = weights[last - 1];
                }
            }

            let mut child = Self { weights };
            if child.normalize().is_ok() {
                return child;
            }
        }

        log::debug!("mutation kept degenerating, returning parent unchanged");
        self.clone()
    }

    /// `(1 - alpha) * self + alpha * donor`, re-normalized.
    pub fn blend(&self, donor: &LiquidityVector, alpha: f64) -> Result<Self> {
        let alpha = alpha.clamp(0.0, 1.0);
        let weights = self
            .weights
            .iter()
            .zip(donor.weights.iter())
            .map(|(a, b)| (1.0 - alpha) * a + alpha * b)
            .collect();
        Self::from_weights(weights)
    }

    /// Center of bin `index` on the log-price axis.
    pub fn bin_center(index: usize) -> f64 {
        LOG_PRICE_MIN + (index as f64 + 0.5) * BIN_WIDTH
    }

    pub fn bin_lower(index: usize) -> f64 {
        LOG_PRICE_MIN + index as f64 * BIN_WIDTH
    }

    /// Bin containing `log_price`, clamped to the grid.
    pub fn bin_index(log_price: f64) -> usize {
        if !log_price.is_finite() || log_price <= LOG_PRICE_MIN {
            return 0;
        }
        if log_price >= LOG_PRICE_MAX {
            return NUM_BINS - 1;
        }
        (((log_price - LOG_PRICE_MIN) / BIN_WIDTH) as usize).min(NUM_BINS - 1)
    }

    /// Liquidity lying between two log-prices, counting partial bins pro rata.
    pub fn depth_between(&self, from: f64, to: f64) -> f64 {
        let lo = from.min(to).max(LOG_PRICE_MIN);
        let hi = from.max(to).min(LOG_PRICE_MAX);
        if hi <= lo {
            return 0.0;
        }
        let mut depth = 0.0;
        for idx in Self::bin_index(lo)..=Self::bin_index(hi) {
            let bin_lo = Self::bin_lower(idx);
            let bin_hi = bin_lo + BIN_WIDTH;
            let overlap = hi.min(bin_hi) - lo.max(bin_lo);
            if overlap > 0.0 {
                depth += self.weights[idx] * overlap / BIN_WIDTH;
            }
        }
        depth
    }
}
