use crate::archive::Mechanism;
use crate::config::AppConfig;
use crate::engines::metrics::compute_features;
use crate::engines::scoring::Scorer;
use crate::engines::simulation::{EvaluationResult, Simulator};
use crate::error::{CurveLabError, Result};
use crate::liquidity::LiquidityVector;
use crate::types::{next_candidate_id, Candidate, CandidateSource, FeatureVector, Provenance, RegimeConfig};
use chrono::Utc;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// One scored evaluation, before it is wrapped into a candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub result: EvaluationResult,
    pub features: FeatureVector,
    pub score: f64,
}

/// Fitness oracle shared by the evolutionary loop and the branch allocator:
/// simulator, feature extraction and scorer in one call.
#[derive(Debug, Clone)]
pub struct CandidateEvaluator {
    simulator: Simulator,
    scorer: Scorer,
}

impl CandidateEvaluator {
    pub fn new(simulator: Simulator, scorer: Scorer) -> Self {
        Self { simulator, scorer }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Simulator::new(config.simulation.clone()),
            Scorer::new(config.scoring.clone()),
        )
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn with_fee_rate(&self, fee_rate: f64) -> Self {
        Self {
            simulator: self.simulator.with_fee_rate(fee_rate),
            scorer: self.scorer.clone(),
        }
    }

    /// Simulate, extract features and score. `None` when the simulation produced
    /// non-finite output; such results never become candidates.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        bins: &LiquidityVector,
        regime: &RegimeConfig,
        rng: &mut R,
    ) -> Option<Evaluation> {
        let result = self.simulator.evaluate(bins, regime, rng);
        if !result.metrics.is_finite() || !result.stability.is_finite() {
            log::debug!("discarding non-finite evaluation in {}", regime.kind);
            return None;
        }
        let score = self.scorer.score_candidate(&result.metrics, result.stability);
        Some(Evaluation {
            features: compute_features(bins),
            score,
            result,
        })
    }

    pub fn build_candidate<R: Rng + ?Sized>(
        &self,
        bins: LiquidityVector,
        regime: &RegimeConfig,
        generation: u64,
        provenance: Provenance,
        rng: &mut R,
    ) -> Option<Candidate> {
        let evaluation = self.evaluate(&bins, regime, rng)?;
        Some(Candidate {
            id: next_candidate_id(id_prefix(provenance.source), regime.kind, generation),
            bins,
            regime: *regime,
            generation,
            metrics: evaluation.result.metrics,
            features: evaluation.features,
            stability: evaluation.result.stability,
            score: evaluation.score,
            fee_rate: self.simulator.fee_rate(),
            timestamp: Utc::now(),
            provenance,
        })
    }

    /// Evaluate a batch in parallel. Output order matches input order; failed
    /// evaluations come back as `None`.
    pub fn evaluate_batch<R: Rng + ?Sized>(
        &self,
        batch: Vec<LiquidityVector>,
        regime: &RegimeConfig,
        generation: u64,
        provenance: &Provenance,
        rng: &mut R,
    ) -> Vec<Option<Candidate>> {
        let seeded: Vec<(u64, LiquidityVector)> =
            batch.into_iter().map(|bins| (rng.gen(), bins)).collect();

        seeded
            .into_par_iter()
            .map(|(seed, bins)| {
                let mut task_rng = ChaCha8Rng::seed_from_u64(seed);
                self.build_candidate(bins, regime, generation, provenance.clone(), &mut task_rng)
            })
            .collect()
    }

    /// Evaluate a mechanism that carries no metrics, such as a hand-drawn curve.
    /// Its own fee rate is used when present. The id is kept if the mechanism has one.
    pub fn import_mechanism<R: Rng + ?Sized>(
        &self,
        mechanism: &Mechanism,
        regime: &RegimeConfig,
        generation: u64,
        rng: &mut R,
    ) -> Result<Candidate> {
        let bins = mechanism.validated_bins()?;
        let evaluator = match mechanism.fee_rate {
            Some(fee_rate) if fee_rate.is_finite() && (0.0..1.0).contains(&fee_rate) => {
                self.with_fee_rate(fee_rate)
            }
            Some(fee_rate) => {
                return Err(CurveLabError::InvalidMechanism(format!(
                    "fee rate {} out of range",
                    fee_rate
                )))
            }
            None => self.clone(),
        };

        let mut candidate = evaluator
            .build_candidate(bins, regime, generation, mechanism.resolved_provenance(), rng)
            .ok_or_else(|| {
                log::warn!("rejected import of {:?}: non-finite evaluation", mechanism.id);
                CurveLabError::Evaluation("mechanism evaluated to non-finite metrics".to_string())
            })?;
        if let Some(id) = &mechanism.id {
            candidate.id = id.clone();
        }
        Ok(candidate)
    }
}

fn id_prefix(source: CandidateSource) -> &'static str {
    match source {
        CandidateSource::Evolutionary => "evo",
        CandidateSource::Allocator => "alloc",
        CandidateSource::HandAuthored => "hand",
    }
}
