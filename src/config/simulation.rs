use super::traits::{require, ConfigManifest, ConfigSection, FieldManifest};
use crate::error::CurveLabError;
use crate::types::DEFAULT_FEE_RATE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub steps: usize,
    /// Paths simulated per evaluation (stability estimate)
    pub path_count: usize,
    /// Leading subset of paths the metric vector is computed from
    pub eval_path_count: usize,
    pub trades_per_step: usize,
    /// Mean noise-trade size as a fraction of total liquidity
    pub trade_size_scale: f64,
    /// Log-normal dispersion of trade sizes
    pub trade_size_sigma: f64,
    pub fee_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 200,
            path_count: 16,
            eval_path_count: 8,
            trades_per_step: 4,
            trade_size_scale: 0.005,
            trade_size_sigma: 0.8,
            fee_rate: DEFAULT_FEE_RATE,
        }
    }
}

impl ConfigSection for SimulationConfig {
    fn section_name() -> &'static str {
        "simulation"
    }

    fn validate(&self) -> Result<(), CurveLabError> {
        require(self.steps > 0, "Simulation needs at least one step")?;
        require(self.path_count > 0, "Path count must be positive")?;
        require(
            self.eval_path_count > 0 && self.eval_path_count <= self.path_count,
            "Evaluation path count must be between 1 and path count",
        )?;
        require(
            self.trade_size_scale.is_finite() && self.trade_size_scale > 0.0,
            "Trade size scale must be positive",
        )?;
        require(
            self.trade_size_sigma.is_finite() && self.trade_size_sigma >= 0.0,
            "Trade size sigma must be non-negative",
        )?;
        require(
            (0.0..0.1).contains(&self.fee_rate),
            "Fee rate must be in [0, 0.1)",
        )
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Simulation".to_string(),
            fields: vec![
                FieldManifest::integer("steps", self.steps, 1.0, 10000.0, "Steps per simulated path"),
                FieldManifest::integer("path_count", self.path_count, 1.0, 1024.0, "Paths per evaluation"),
                FieldManifest::integer(
                    "eval_path_count",
                    self.eval_path_count,
                    1.0,
                    1024.0,
                    "Paths feeding the metric vector",
                ),
                FieldManifest::integer("trades_per_step", self.trades_per_step, 0.0, 100.0, "Noise trades per step"),
                FieldManifest::float(
                    "trade_size_scale",
                    self.trade_size_scale,
                    0.0001,
                    0.5,
                    "Mean trade size relative to total liquidity",
                ),
                FieldManifest::float("fee_rate", self.fee_rate, 0.0, 0.1, "Swap fee charged by the pool"),
            ],
        }
    }
}
