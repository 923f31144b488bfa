// src/engines/metrics/engine.rs
use super::risk::RiskMetrics;
use crate::engines::simulation::PathOutcome;
use crate::types::MetricVector;

pub struct MetricsEngine;

impl MetricsEngine {
    /// Average per-path totals and risk statistics into one metric vector.
    pub fn reduce(paths: &[PathOutcome]) -> MetricVector {
        if paths.is_empty() {
            return MetricVector {
                lp_hodl: 1.0,
                ..Default::default()
            };
        }

        MetricVector {
            fees: mean_of(paths, |p| p.fees),
            slippage: mean_of(paths, |p| p.slippage),
            arb_leakage: mean_of(paths, |p| p.arb_leakage),
            utilization: mean_of(paths, |p| p.utilization()),
            lp_hodl: mean_of(paths, |p| p.lp_hodl()),
            max_drawdown: mean_of(paths, |p| RiskMetrics::max_drawdown(&p.equity_curve)),
            return_volatility: mean_of(paths, |p| RiskMetrics::return_volatility(&p.equity_curve)),
        }
    }
}

fn mean_of<F: Fn(&PathOutcome) -> f64>(paths: &[PathOutcome], f: F) -> f64 {
    paths.iter().map(f).sum::<f64>() / paths.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(fees: f64, equity: Vec<f64>) -> PathOutcome {
        PathOutcome {
            fees,
            equity_curve: equity,
            bins_visited: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_reduce_averages_paths() {
        let paths = vec![
            path(2.0, vec![1.0, 1.1, 1.0]),
            path(4.0, vec![1.0, 0.9, 0.95]),
        ];
        let metrics = MetricsEngine::reduce(&paths);

        assert!((metrics.fees - 3.0).abs() < 1e-12);
        assert!((metrics.lp_hodl - 0.975).abs() < 1e-12);
        assert!((metrics.utilization - 0.25).abs() < 1e-12);
        assert!(metrics.max_drawdown > 0.0);
    }

    #[test]
    fn test_reduce_empty_is_neutral() {
        let metrics = MetricsEngine::reduce(&[]);
        assert_eq!(metrics.lp_hodl, 1.0);
        assert!(metrics.is_finite());
    }
}
