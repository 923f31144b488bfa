// src/engines/scoring/scorer.rs
use crate::config::ScoringConfig;
use crate::engines::metrics::risk::std_dev;
use crate::types::MetricVector;

pub const AXIS_COUNT: usize = 7;

/// Returned for non-finite input so ordering stays total
pub const WORST_SCORE: f64 = f64::MAX;

/// Composite scorer. Lower is better.
///
/// Each metric is mapped onto a common [0, 1) "higher is worse" axis. The score is the
/// weighted mean of those axes, plus `balance_coefficient` times their standard
/// deviation, plus `stability_coefficient` times the cross-path LP/HODL dispersion.
/// The spread term means a design that is moderately good everywhere beats one that
/// excels on a single axis at the same weighted mean.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Axis order: fees, slippage, arb leakage, utilization, LP/HODL, drawdown, volatility.
    pub fn normalize(&self, metrics: &MetricVector) -> [f64; AXIS_COUNT] {
        let refs = &self.config.references;
        let worse_when_low = |value: f64, reference: f64| reference / (reference + value.max(0.0));
        let worse_when_high = |value: f64, reference: f64| {
            let v = value.max(0.0);
            v / (v + reference)
        };

        [
            worse_when_low(metrics.fees, refs.fees),
            worse_when_high(metrics.slippage, refs.slippage),
            worse_when_high(metrics.arb_leakage, refs.arb_leakage),
            1.0 - metrics.utilization.clamp(0.0, 1.0),
            1.0 / (1.0 + ((metrics.lp_hodl - 1.0) / refs.lp_hodl_scale).exp()),
            worse_when_high(metrics.max_drawdown, refs.max_drawdown),
            worse_when_high(metrics.return_volatility, refs.return_volatility),
        ]
    }

    pub fn weighted_sum(&self, axes: &[f64; AXIS_COUNT]) -> f64 {
        let weights = self.config.weights.as_array();
        let total: f64 = weights.iter().sum();
        weights.iter().zip(axes).map(|(w, a)| w * a).sum::<f64>() / total
    }

    /// Spread of the normalized axes
    pub fn imbalance(axes: &[f64; AXIS_COUNT]) -> f64 {
        std_dev(axes)
    }

    pub fn combine(&self, axes: &[f64; AXIS_COUNT], stability: f64) -> f64 {
        self.weighted_sum(axes)
            + self.config.balance_coefficient * Self::imbalance(axes)
            + self.config.stability_coefficient * stability.max(0.0)
    }

    pub fn score_candidate(&self, metrics: &MetricVector, stability: f64) -> f64 {
        if !metrics.is_finite() || !stability.is_finite() {
            return WORST_SCORE;
        }
        let score = self.combine(&self.normalize(metrics), stability);
        if score.is_finite() {
            score
        } else {
            WORST_SCORE
        }
    }
}

/// Score with the default weights.
pub fn score_candidate(metrics: &MetricVector, stability: f64) -> f64 {
    Scorer::default().score_candidate(metrics, stability)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moderate_metrics() -> MetricVector {
        MetricVector {
            fees: 10.0,
            slippage: 40.0,
            arb_leakage: 20.0,
            utilization: 0.5,
            lp_hodl: 1.0,
            max_drawdown: 0.02,
            return_volatility: 0.001,
        }
    }

    #[test]
    fn test_reference_metrics_sit_at_midpoint() {
        let axes = Scorer::default().normalize(&moderate_metrics());
        for axis in axes {
            assert!((axis - 0.5).abs() < 1e-12);
        }
        assert!(Scorer::imbalance(&axes) < 1e-12);
    }

    #[test]
    fn test_non_finite_metrics_score_worst() {
        let metrics = MetricVector {
            fees: f64::NAN,
            ..moderate_metrics()
        };
        assert_eq!(score_candidate(&metrics, 0.0), WORST_SCORE);
        assert_eq!(score_candidate(&moderate_metrics(), f64::INFINITY), WORST_SCORE);
    }

    #[test]
    fn test_better_metrics_score_lower() {
        let better = MetricVector {
            fees: 20.0,
            slippage: 20.0,
            arb_leakage: 10.0,
            utilization: 0.7,
            lp_hodl: 1.02,
            max_drawdown: 0.01,
            return_volatility: 0.0005,
        };
        assert!(score_candidate(&better, 0.0) < score_candidate(&moderate_metrics(), 0.0));
    }

    #[test]
    fn test_instability_is_penalized() {
        let m = moderate_metrics();
        assert!(score_candidate(&m, 0.0) < score_candidate(&m, 0.05));
    }
}
