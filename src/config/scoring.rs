use super::traits::{require, ConfigManifest, ConfigSection, FieldManifest};
use crate::error::CurveLabError;
use serde::{Deserialize, Serialize};

/// Relative importance of each metric axis in the weighted part of the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisWeights {
    pub fees: f64,
    pub slippage: f64,
    pub arb_leakage: f64,
    pub utilization: f64,
    pub lp_hodl: f64,
    pub max_drawdown: f64,
    pub return_volatility: f64,
}

impl Default for AxisWeights {
    fn default() -> Self {
        Self {
            fees: 0.15,
            slippage: 0.15,
            arb_leakage: 0.15,
            utilization: 0.05,
            lp_hodl: 0.25,
            max_drawdown: 0.15,
            return_volatility: 0.10,
        }
    }
}

impl AxisWeights {
    /// Weights in metric-axis order
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.fees,
            self.slippage,
            self.arb_leakage,
            self.utilization,
            self.lp_hodl,
            self.max_drawdown,
            self.return_volatility,
        ]
    }
}

/// Metric values that map to a normalized badness of 0.5
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationRefs {
    pub fees: f64,
    pub slippage: f64,
    pub arb_leakage: f64,
    /// Width of the logistic around LP/HODL = 1
    pub lp_hodl_scale: f64,
    pub max_drawdown: f64,
    pub return_volatility: f64,
}

impl Default for NormalizationRefs {
    fn default() -> Self {
        Self {
            fees: 10.0,
            slippage: 40.0,
            arb_leakage: 20.0,
            lp_hodl_scale: 0.02,
            max_drawdown: 0.02,
            return_volatility: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: AxisWeights,
    pub references: NormalizationRefs,
    /// Multiplier on the spread of normalized axis values
    pub balance_coefficient: f64,
    /// Multiplier on cross-path LP/HODL dispersion
    pub stability_coefficient: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: AxisWeights::default(),
            references: NormalizationRefs::default(),
            balance_coefficient: 0.6,
            stability_coefficient: 2.0,
        }
    }
}

impl ConfigSection for ScoringConfig {
    fn section_name() -> &'static str {
        "scoring"
    }

    fn validate(&self) -> Result<(), CurveLabError> {
        let weights = self.weights.as_array();
        require(
            weights.iter().all(|w| w.is_finite() && *w >= 0.0),
            "Axis weights must be non-negative",
        )?;
        require(
            weights.iter().sum::<f64>() > 0.0,
            "At least one axis weight must be positive",
        )?;
        let refs = &self.references;
        require(
            [
                refs.fees,
                refs.slippage,
                refs.arb_leakage,
                refs.lp_hodl_scale,
                refs.max_drawdown,
                refs.return_volatility,
            ]
            .iter()
            .all(|r| r.is_finite() && *r > 0.0),
            "Normalization references must be positive",
        )?;
        require(
            self.balance_coefficient.is_finite() && self.balance_coefficient > 0.0,
            "Balance coefficient must be positive",
        )?;
        require(
            self.stability_coefficient.is_finite() && self.stability_coefficient >= 0.0,
            "Stability coefficient must be non-negative",
        )
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Scoring".to_string(),
            fields: vec![
                FieldManifest::float(
                    "balance_coefficient",
                    self.balance_coefficient,
                    0.0,
                    10.0,
                    "Penalty on uneven performance across metric axes",
                ),
                FieldManifest::float(
                    "stability_coefficient",
                    self.stability_coefficient,
                    0.0,
                    100.0,
                    "Penalty on LP/HODL dispersion across paths",
                ),
            ],
        }
    }
}
