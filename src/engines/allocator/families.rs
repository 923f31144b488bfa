use crate::liquidity::{LiquidityVector, ShapeTemplate};
use crate::types::{RegimeConfig, DEFAULT_FEE_RATE, NUM_BINS};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pricing invariant. Each family reshapes a liquidity template the way that
/// invariant distributes depth along the log-price axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantFamily {
    ConstantProduct,
    StableSwap,
    Concentrated,
    Weighted,
}

impl InvariantFamily {
    pub const ALL: [InvariantFamily; 4] = [
        InvariantFamily::ConstantProduct,
        InvariantFamily::StableSwap,
        InvariantFamily::Concentrated,
        InvariantFamily::Weighted,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InvariantFamily::ConstantProduct => "cp",
            InvariantFamily::StableSwap => "stable",
            InvariantFamily::Concentrated => "clmm",
            InvariantFamily::Weighted => "weighted",
        }
    }

    /// Multiplier applied to the template density at log-price `x`.
    fn reshape(&self, x: f64) -> f64 {
        match self {
            InvariantFamily::ConstantProduct => 1.0,
            InvariantFamily::StableSwap => (-0.5 * (x / 0.25).powi(2)).exp() + 0.05,
            InvariantFamily::Concentrated => {
                if x.abs() <= 1.0 {
                    1.0
                } else {
                    1e-3
                }
            }
            InvariantFamily::Weighted => (0.5 * x).exp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityFamily {
    Uniform,
    Gaussian,
    Bimodal,
    Laplace,
    Skewed,
}

impl LiquidityFamily {
    pub const ALL: [LiquidityFamily; 5] = [
        LiquidityFamily::Uniform,
        LiquidityFamily::Gaussian,
        LiquidityFamily::Bimodal,
        LiquidityFamily::Laplace,
        LiquidityFamily::Skewed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LiquidityFamily::Uniform => "uniform",
            LiquidityFamily::Gaussian => "gauss",
            LiquidityFamily::Bimodal => "bimodal",
            LiquidityFamily::Laplace => "laplace",
            LiquidityFamily::Skewed => "skewed",
        }
    }

    /// Template of this family with randomized parameters.
    pub fn template<R: Rng + ?Sized>(&self, rng: &mut R) -> ShapeTemplate {
        match self {
            LiquidityFamily::Uniform => ShapeTemplate::Uniform,
            LiquidityFamily::Gaussian => ShapeTemplate::Gaussian {
                center: rng.gen_range(-0.2..0.2),
                width: rng.gen_range(0.15..0.9),
            },
            LiquidityFamily::Bimodal => ShapeTemplate::Bimodal {
                separation: rng.gen_range(0.3..1.4),
                width: rng.gen_range(0.1..0.45),
            },
            LiquidityFamily::Laplace => ShapeTemplate::Laplace {
                center: rng.gen_range(-0.2..0.2),
                scale: rng.gen_range(0.05..0.5),
            },
            LiquidityFamily::Skewed => ShapeTemplate::Skewed {
                center: rng.gen_range(-0.2..0.2),
                left_width: rng.gen_range(0.1..0.8),
                right_width: rng.gen_range(0.1..0.8),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeFamily {
    Flat,
    Tiered,
    VolatilityAdaptive,
}

impl FeeFamily {
    pub const ALL: [FeeFamily; 3] = [FeeFamily::Flat, FeeFamily::Tiered, FeeFamily::VolatilityAdaptive];

    pub fn label(&self) -> &'static str {
        match self {
            FeeFamily::Flat => "flat",
            FeeFamily::Tiered => "tiered",
            FeeFamily::VolatilityAdaptive => "adaptive",
        }
    }

    /// Fee rate this policy charges in `regime`.
    pub fn fee_rate(&self, regime: &RegimeConfig) -> f64 {
        match self {
            FeeFamily::Flat => DEFAULT_FEE_RATE,
            FeeFamily::Tiered => {
                if regime.volatility < 0.01 {
                    0.0005
                } else {
                    0.01
                }
            }
            FeeFamily::VolatilityAdaptive => (0.001 + 0.1 * regime.volatility).min(0.05),
        }
    }
}

/// One point of the structural design space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchCoordinate {
    pub invariant: InvariantFamily,
    pub liquidity: LiquidityFamily,
    pub fee: FeeFamily,
}

impl BranchCoordinate {
    pub fn new(invariant: InvariantFamily, liquidity: LiquidityFamily, fee: FeeFamily) -> Self {
        Self { invariant, liquidity, fee }
    }

    /// Full cross-product of the three family axes.
    pub fn all() -> Vec<BranchCoordinate> {
        let mut out = Vec::with_capacity(
            InvariantFamily::ALL.len() * LiquidityFamily::ALL.len() * FeeFamily::ALL.len(),
        );
        for invariant in InvariantFamily::ALL {
            for liquidity in LiquidityFamily::ALL {
                for fee in FeeFamily::ALL {
                    out.push(BranchCoordinate::new(invariant, liquidity, fee));
                }
            }
        }
        out
    }

    /// Cross-product minus combinations that contradict themselves. A stable-swap
    /// invariant pins depth at the peg, which a bimodal shape cannot express.
    pub fn curated() -> Vec<BranchCoordinate> {
        Self::all()
            .into_iter()
            .filter(|c| !(c.invariant == InvariantFamily::StableSwap && c.liquidity == LiquidityFamily::Bimodal))
            .collect()
    }

    pub fn id(&self) -> String {
        format!("{}-{}-{}", self.invariant.label(), self.liquidity.label(), self.fee.label())
    }

    /// Number of family axes shared with `other`, 0 to 3.
    pub fn shared_axes(&self, other: &BranchCoordinate) -> usize {
        usize::from(self.invariant == other.invariant)
            + usize::from(self.liquidity == other.liquidity)
            + usize::from(self.fee == other.fee)
    }

    /// Fresh design: a randomized template of the liquidity family reshaped by the
    /// invariant family.
    pub fn template<R: Rng + ?Sized>(&self, rng: &mut R) -> LiquidityVector {
        let shape = self.liquidity.template(rng);
        let weights = (0..NUM_BINS)
            .map(|i| {
                let x = LiquidityVector::bin_center(i);
                (shape.density(x) + 1e-6) * self.invariant.reshape(x)
            })
            .collect();
        LiquidityVector::from_weights(weights).unwrap_or_else(|_| shape.build())
    }

    pub fn fee_rate(&self, regime: &RegimeConfig) -> f64 {
        self.fee.fee_rate(regime)
    }
}

impl fmt::Display for BranchCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}
