// src/engines/metrics/risk.rs

pub struct RiskMetrics;

impl RiskMetrics {
    /// Largest peak-to-trough fall of an equity curve, as a fraction of the peak.
    pub fn max_drawdown(equity: &[f64]) -> f64 {
        let Some(&first) = equity.first() else {
            return 0.0;
        };
        let mut max_dd = 0.0;
        let mut peak = first;

        for &value in equity.iter() {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                let dd = (peak - value) / peak;
                if dd > max_dd {
                    max_dd = dd;
                }
            }
        }

        max_dd
    }

    pub fn calculate_returns(equity: &[f64]) -> Vec<f64> {
        equity
            .windows(2)
            .filter(|w| w[0] != 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect()
    }

    /// Standard deviation of per-step returns
    pub fn return_volatility(equity: &[f64]) -> f64 {
        std_dev(&Self::calculate_returns(equity))
    }
}

/// Population standard deviation; 0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_drawdown() {
        let equity = [1.0, 1.2, 0.9, 1.1, 0.6, 1.3];
        assert!((RiskMetrics::max_drawdown(&equity) - 0.5).abs() < 1e-12);
        assert_eq!(RiskMetrics::max_drawdown(&[]), 0.0);
    }

    #[test]
    fn test_flat_curve_has_no_volatility() {
        assert_eq!(RiskMetrics::return_volatility(&[1.0; 10]), 0.0);
    }

    #[test]
    fn test_std_dev() {
        assert!((std_dev(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
        assert_eq!(std_dev(&[5.0]), 0.0);
    }
}
