use crate::engines::metrics::compute_features;
use crate::engines::scoring::score_candidate;
use crate::error::{CurveLabError, Result};
use crate::liquidity::LiquidityVector;
use crate::types::{
    next_candidate_id, Candidate, CandidateSource, MetricVector, Provenance, RegimeConfig,
    DEFAULT_FEE_RATE, NUM_BINS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Loosely structured design as exchanged with editors and other tools.
///
/// Only `origin` and `bins` are required to parse. Unknown keys are kept in `extra`
/// and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mechanism {
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub bins: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mechanism {
    /// Origin tag parsed as a candidate source. Unknown tags are hand-authored.
    pub fn source(&self) -> CandidateSource {
        match self.origin.as_str() {
            "evolutionary" => CandidateSource::Evolutionary,
            "allocator" => CandidateSource::Allocator,
            _ => CandidateSource::HandAuthored,
        }
    }

    /// Provenance carried by the mechanism, or one derived from its origin tag.
    pub fn resolved_provenance(&self) -> Provenance {
        if let Some(provenance) = &self.provenance {
            return provenance.clone();
        }
        let text = |key: &str| self.extra.get(key).and_then(Value::as_str);
        match self.source() {
            CandidateSource::Evolutionary => Provenance::evolutionary(),
            CandidateSource::Allocator => Provenance::allocator(text("branch").unwrap_or("unknown")),
            CandidateSource::HandAuthored => {
                Provenance::hand_authored(text("contributor").map(str::to_string))
            }
        }
    }

    /// Bins checked against the grid and normalized.
    pub fn validated_bins(&self) -> Result<LiquidityVector> {
        if self.bins.len() != NUM_BINS {
            return Err(CurveLabError::InvalidMechanism(format!(
                "expected {} bins, got {}",
                NUM_BINS,
                self.bins.len()
            )));
        }
        if let Some(bad) = self.bins.iter().position(|w| !w.is_finite() || *w < 0.0) {
            return Err(CurveLabError::InvalidMechanism(format!(
                "bin {} has invalid weight {}",
                bad, self.bins[bad]
            )));
        }
        LiquidityVector::from_weights(self.bins.clone())
            .map_err(|e| CurveLabError::InvalidMechanism(e.to_string()))
    }
}

fn source_tag(source: CandidateSource) -> &'static str {
    match source {
        CandidateSource::Evolutionary => "evolutionary",
        CandidateSource::Allocator => "allocator",
        CandidateSource::HandAuthored => "hand_authored",
    }
}

pub fn candidate_to_mechanism(candidate: &Candidate) -> Mechanism {
    Mechanism {
        origin: source_tag(candidate.provenance.source).to_string(),
        id: Some(candidate.id.clone()),
        bins: candidate.bins.weights().to_vec(),
        metrics: Some(candidate.metrics),
        stability: Some(candidate.stability),
        score: Some(candidate.score),
        fee_rate: Some(candidate.fee_rate),
        timestamp: Some(candidate.timestamp),
        provenance: Some(candidate.provenance.clone()),
        extra: Map::new(),
    }
}

/// Rebuild a candidate from a mechanism that already carries metrics.
///
/// Features are recomputed from the bins. A missing score is recomputed from the
/// metrics with the default scorer; missing stability is taken as zero. Mechanisms
/// without metrics must go through `CandidateEvaluator::import_mechanism` instead.
pub fn mechanism_to_candidate(
    mechanism: &Mechanism,
    regime: &RegimeConfig,
    generation: u64,
) -> Result<Candidate> {
    let metrics = mechanism
        .metrics
        .ok_or_else(|| CurveLabError::MissingField("metrics".to_string()))?;
    if !metrics.is_finite() {
        return Err(CurveLabError::InvalidMechanism("metrics are not finite".to_string()));
    }
    let bins = mechanism.validated_bins()?;
    let stability = mechanism.stability.unwrap_or(0.0);

    Ok(Candidate {
        id: mechanism
            .id
            .clone()
            .unwrap_or_else(|| next_candidate_id("hand", regime.kind, generation)),
        features: compute_features(&bins),
        bins,
        regime: *regime,
        generation,
        metrics,
        stability,
        score: mechanism
            .score
            .unwrap_or_else(|| score_candidate(&metrics, stability)),
        fee_rate: mechanism.fee_rate.unwrap_or(DEFAULT_FEE_RATE),
        timestamp: mechanism.timestamp.unwrap_or_else(Utc::now),
        provenance: mechanism.resolved_provenance(),
    })
}

pub fn mechanism_from_json(json: &str) -> Result<Mechanism> {
    serde_json::from_str(json).map_err(|e| CurveLabError::InvalidMechanism(e.to_string()))
}

pub fn mechanism_to_json(mechanism: &Mechanism) -> Result<String> {
    Ok(serde_json::to_string_pretty(mechanism)?)
}
