use crate::error::{CurveLabError, Result};
use crate::liquidity::LiquidityVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of log-price bins in every liquidity vector
pub const NUM_BINS: usize = 64;
pub const LOG_PRICE_MIN: f64 = -2.0;
pub const LOG_PRICE_MAX: f64 = 2.0;
pub const BIN_WIDTH: f64 = (LOG_PRICE_MAX - LOG_PRICE_MIN) / NUM_BINS as f64;
/// Sum of all bin weights after normalization
pub const TOTAL_LIQUIDITY: f64 = 1000.0;
pub const DEFAULT_FEE_RATE: f64 = 0.003;
/// Log-price gap below which arbitrageurs leave the pool alone
pub const ARB_THRESHOLD: f64 = 0.01;

/// Named market-generation presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeKind {
    LowVolatility,
    HighVolatility,
    JumpDiffusion,
    Trending,
}

impl RegimeKind {
    pub const ALL: [RegimeKind; 4] = [
        RegimeKind::LowVolatility,
        RegimeKind::HighVolatility,
        RegimeKind::JumpDiffusion,
        RegimeKind::Trending,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RegimeKind::LowVolatility => "low_volatility",
            RegimeKind::HighVolatility => "high_volatility",
            RegimeKind::JumpDiffusion => "jump_diffusion",
            RegimeKind::Trending => "trending",
        }
    }

    pub fn config(&self) -> RegimeConfig {
        match self {
            RegimeKind::LowVolatility => RegimeConfig {
                kind: *self,
                volatility: 0.008,
                drift: 0.0,
                jump_intensity: 0.0,
                jump_mean: 0.0,
                jump_std: 0.0,
                arb_responsiveness: 0.9,
            },
            RegimeKind::HighVolatility => RegimeConfig {
                kind: *self,
                volatility: 0.03,
                drift: 0.0,
                jump_intensity: 0.0,
                jump_mean: 0.0,
                jump_std: 0.0,
                arb_responsiveness: 0.6,
            },
            RegimeKind::JumpDiffusion => RegimeConfig {
                kind: *self,
                volatility: 0.012,
                drift: 0.0,
                jump_intensity: 0.05,
                jump_mean: -0.01,
                jump_std: 0.06,
                arb_responsiveness: 0.35,
            },
            RegimeKind::Trending => RegimeConfig {
                kind: *self,
                volatility: 0.012,
                drift: 0.002,
                jump_intensity: 0.0,
                jump_mean: 0.0,
                jump_std: 0.0,
                arb_responsiveness: 0.75,
            },
        }
    }
}

impl fmt::Display for RegimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-step market-generation parameters. Candidates are always scored against one of these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeConfig {
    pub kind: RegimeKind,
    pub volatility: f64,
    pub drift: f64,
    /// Probability of a jump on any given step
    pub jump_intensity: f64,
    pub jump_mean: f64,
    pub jump_std: f64,
    /// Fraction of the pool/external gap closed per step, in (0, 1]
    pub arb_responsiveness: f64,
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.volatility,
            self.drift,
            self.jump_intensity,
            self.jump_mean,
            self.jump_std,
            self.arb_responsiveness,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(CurveLabError::InvalidRegime(format!(
                "{}: parameters must be finite",
                self.kind
            )));
        }
        if self.arb_responsiveness <= 0.0 || self.arb_responsiveness > 1.0 {
            return Err(CurveLabError::InvalidRegime(format!(
                "{}: arbitrage responsiveness must be in (0, 1], got {}",
                self.kind, self.arb_responsiveness
            )));
        }
        if self.volatility < 0.0 || self.jump_std < 0.0 {
            return Err(CurveLabError::InvalidRegime(format!(
                "{}: volatility and jump std must be non-negative",
                self.kind
            )));
        }
        if !(0.0..=1.0).contains(&self.jump_intensity) {
            return Err(CurveLabError::InvalidRegime(format!(
                "{}: jump intensity must be a per-step probability",
                self.kind
            )));
        }
        Ok(())
    }
}

/// Result of replaying one liquidity vector against one regime.
///
/// Higher is better for `fees`, `utilization` and `lp_hodl`; lower is better for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricVector {
    pub fees: f64,
    pub slippage: f64,
    pub arb_leakage: f64,
    pub utilization: f64,
    pub lp_hodl: f64,
    pub max_drawdown: f64,
    pub return_volatility: f64,
}

impl MetricVector {
    pub fn is_finite(&self) -> bool {
        [
            self.fees,
            self.slippage,
            self.arb_leakage,
            self.utilization,
            self.lp_hodl,
            self.max_drawdown,
            self.return_volatility,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Shape descriptors derived from the bins alone
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub curvature: f64,
    pub entropy: f64,
    pub symmetry: f64,
    pub tail_density_ratio: f64,
    pub peak_concentration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Evolutionary,
    Allocator,
    HandAuthored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    Composite,
    ParetoFront,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: CandidateSource,
    pub contributor: Option<String>,
    /// Originating branch or experiment id
    pub experiment: Option<String>,
    pub objective: ObjectiveType,
}

impl Provenance {
    pub fn evolutionary() -> Self {
        Self {
            source: CandidateSource::Evolutionary,
            contributor: None,
            experiment: None,
            objective: ObjectiveType::Composite,
        }
    }

    pub fn allocator(branch_id: &str) -> Self {
        Self {
            source: CandidateSource::Allocator,
            contributor: None,
            experiment: Some(branch_id.to_string()),
            objective: ObjectiveType::Composite,
        }
    }

    pub fn hand_authored(contributor: Option<String>) -> Self {
        Self {
            source: CandidateSource::HandAuthored,
            contributor,
            experiment: None,
            objective: ObjectiveType::Manual,
        }
    }
}

/// One evaluated design. Never mutated after creation; re-evaluation yields a new candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub bins: LiquidityVector,
    pub regime: RegimeConfig,
    pub generation: u64,
    pub metrics: MetricVector,
    pub features: FeatureVector,
    /// Dispersion of LP/HODL across simulated paths
    pub stability: f64,
    /// Composite score, lower is better
    pub score: f64,
    pub fee_rate: f64,
    pub timestamp: DateTime<Utc>,
    pub provenance: Provenance,
}

static CANDIDATE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique candidate id, e.g. `evo-high_volatility-g3-000042`
pub fn next_candidate_id(prefix: &str, regime: RegimeKind, generation: u64) -> String {
    let seq = CANDIDATE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-g{}-{:06}", prefix, regime, generation, seq)
}
