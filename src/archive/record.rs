use crate::error::Result;
use crate::liquidity::LiquidityVector;
use crate::types::{
    Candidate, FeatureVector, MetricVector, Provenance, RegimeConfig, LOG_PRICE_MAX, LOG_PRICE_MIN,
    NUM_BINS, TOTAL_LIQUIDITY,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grid and fee settings a candidate was evaluated under
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    pub bin_count: usize,
    pub price_range: [f64; 2],
    pub total_liquidity: f64,
    pub fee_rate: f64,
}

impl EvaluationSettings {
    pub fn current(fee_rate: f64) -> Self {
        Self {
            bin_count: NUM_BINS,
            price_range: [LOG_PRICE_MIN, LOG_PRICE_MAX],
            total_liquidity: TOTAL_LIQUIDITY,
            fee_rate,
        }
    }
}

/// Durable JSON form of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    pub regime: RegimeConfig,
    pub generation: u64,
    pub score: f64,
    pub stability: f64,
    pub timestamp: DateTime<Utc>,
    pub bins: Vec<f64>,
    pub metrics: MetricVector,
    pub features: FeatureVector,
    pub provenance: Provenance,
    pub evaluation: EvaluationSettings,
}

impl From<&Candidate> for CandidateRecord {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id.clone(),
            regime: candidate.regime,
            generation: candidate.generation,
            score: candidate.score,
            stability: candidate.stability,
            timestamp: candidate.timestamp,
            bins: candidate.bins.weights().to_vec(),
            metrics: candidate.metrics,
            features: candidate.features,
            provenance: candidate.provenance.clone(),
            evaluation: EvaluationSettings::current(candidate.fee_rate),
        }
    }
}

impl CandidateRecord {
    /// Rebuild the candidate. Fails if the bins do not fit the current grid.
    pub fn to_candidate(&self) -> Result<Candidate> {
        Ok(Candidate {
            id: self.id.clone(),
            bins: LiquidityVector::from_weights(self.bins.clone())?,
            regime: self.regime,
            generation: self.generation,
            metrics: self.metrics,
            features: self.features,
            stability: self.stability,
            score: self.score,
            fee_rate: self.evaluation.fee_rate,
            timestamp: self.timestamp,
            provenance: self.provenance.clone(),
        })
    }
}
