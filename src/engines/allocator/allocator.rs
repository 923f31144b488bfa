use super::branch::{BatchResult, Branch, ExplorationPhase};
use super::families::BranchCoordinate;
use super::priority::{branch_priority, select_branch, PriorityBreakdown};
use crate::config::AllocatorConfig;
use crate::engines::evaluation::CandidateEvaluator;
use crate::error::{CurveLabError, Result};
use crate::liquidity::LiquidityVector;
use crate::types::{Candidate, Provenance, RegimeKind};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Donors must share at least this many family axes with the receiving branch
const MIN_SHARED_AXES: usize = 2;

/// One line of the allocator's exploration log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationEvent {
    pub step: u64,
    pub branch_id: String,
    pub regime: RegimeKind,
    pub candidates_generated: usize,
    pub best_score: Option<f64>,
    /// Previous branch best minus this batch's best; positive is an improvement
    pub improvement: f64,
    pub phase: ExplorationPhase,
    pub donor: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub allocator: BranchAllocator,
    pub event: ExplorationEvent,
    pub candidates: Vec<Candidate>,
}

/// Bandit over the structural design space. `step` never modifies `self`; it
/// returns the successor allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchAllocator {
    config: AllocatorConfig,
    regimes: Vec<RegimeKind>,
    branches: Vec<Branch>,
    events: VecDeque<ExplorationEvent>,
    steps: u64,
}

impl BranchAllocator {
    /// One branch per curated family combination.
    pub fn new(config: AllocatorConfig, regimes: Vec<RegimeKind>) -> Self {
        let branches = BranchCoordinate::curated()
            .into_iter()
            .map(|coordinate| Branch::new(coordinate, &config))
            .collect();
        Self {
            config,
            regimes,
            branches,
            events: VecDeque::new(),
            steps: 0,
        }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, id: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id() == id)
    }

    pub fn events(&self) -> impl Iterator<Item = &ExplorationEvent> {
        self.events.iter()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn total_tests(&self) -> u32 {
        self.branches.iter().map(|b| b.tested).sum()
    }

    pub fn global_best(&self) -> Option<f64> {
        self.branches
            .iter()
            .filter_map(|b| b.best_score)
            .min_by(f64::total_cmp)
    }

    /// Current priority of every branch, highest first.
    pub fn priorities(&self) -> Vec<(String, PriorityBreakdown)> {
        let total = self.total_tests();
        let best = self.global_best();
        let mut out: Vec<(String, PriorityBreakdown)> = self
            .branches
            .iter()
            .map(|b| (b.id(), branch_priority(b, total, best, &self.config)))
            .collect();
        out.sort_by(|a, b| b.1.total.total_cmp(&a.1.total));
        out
    }

    /// Pick a branch by Thompson sampling, evaluate one batch in the regime where it
    /// is weakest, and fold the result back into its posterior.
    pub fn step<R: Rng + ?Sized>(
        &self,
        evaluator: &CandidateEvaluator,
        rng: &mut R,
    ) -> Result<AllocationOutcome> {
        let index = select_branch(&self.branches, &self.config, rng)
            .ok_or_else(|| CurveLabError::Evaluation("allocator has no branches".to_string()))?;
        let branch = &self.branches[index];
        let regime_kind = branch
            .target_regime(&self.regimes)
            .ok_or_else(|| CurveLabError::InvalidRegime("allocator has no regimes".to_string()))?;
        let regime = regime_kind.config();

        let donor = if rng.gen::<f64>() < self.config.cross_branch_probability {
            self.donor_for(index, regime_kind)
        } else {
            None
        };

        let batch: Vec<LiquidityVector> = (0..self.config.batch_size)
            .map(|_| self.propose(branch, regime_kind, donor.as_ref().map(|(_, bins)| *bins), rng))
            .collect();

        let evaluator = evaluator.with_fee_rate(branch.coordinate.fee_rate(&regime));
        let candidates: Vec<Candidate> = evaluator
            .evaluate_batch(batch, &regime, self.steps, &Provenance::allocator(&branch.id()), rng)
            .into_iter()
            .flatten()
            .collect();

        let result = BatchResult::from_scored(
            candidates
                .iter()
                .map(|c| (c.score, &c.bins, c.id.as_str())),
        );
        if result.is_none() {
            log::warn!(
                "branch {} produced no finite candidate in {}",
                branch.id(),
                regime_kind
            );
        }

        let (updated, improvement) = branch.observe(regime_kind, result.as_ref(), &self.config);

        let event = ExplorationEvent {
            step: self.steps,
            branch_id: updated.id(),
            regime: regime_kind,
            candidates_generated: candidates.len(),
            best_score: result.as_ref().map(|r| r.best_score),
            improvement,
            phase: updated.phase,
            donor: donor.map(|(id, _)| id),
            timestamp: Utc::now(),
        };

        log::info!(
            "allocation step {}: {} in {} -> {} candidates, best {:?}, phase {}",
            event.step,
            event.branch_id,
            regime_kind,
            event.candidates_generated,
            event.best_score,
            event.phase
        );

        let mut next = self.clone();
        next.branches[index] = updated;
        next.steps += 1;
        next.events.push_back(event.clone());
        while next.events.len() > self.config.event_log_capacity {
            next.events.pop_front();
        }

        Ok(AllocationOutcome {
            allocator: next,
            event,
            candidates,
        })
    }

    /// Best `regime` vector of the top-scoring branch there that shares enough
    /// families with branch `index`.
    fn donor_for(&self, index: usize, regime: RegimeKind) -> Option<(String, &LiquidityVector)> {
        let receiver = &self.branches[index].coordinate;
        self.branches
            .iter()
            .enumerate()
            .filter(|(i, b)| *i != index && b.coordinate.shared_axes(receiver) >= MIN_SHARED_AXES)
            .filter_map(|(_, b)| b.regime_best(regime).map(|(score, bins)| (b, score, bins)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(b, _, bins)| (b.id(), bins))
    }

    fn propose<R: Rng + ?Sized>(
        &self,
        branch: &Branch,
        regime: RegimeKind,
        donor: Option<&LiquidityVector>,
        rng: &mut R,
    ) -> LiquidityVector {
        let base = match branch.regime_best(regime) {
            Some((_, best)) if rng.gen::<f64>() < self.config.reuse_best_probability => {
                best.mutate(branch.mutation_intensity, rng)
            }
            _ => branch.coordinate.template(rng),
        };

        match donor {
            Some(donor) => {
                let alpha = rng.gen_range(0.2..0.5);
                base.blend(donor, alpha).unwrap_or(base)
            }
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::engines::scoring::Scorer;
    use crate::engines::simulation::Simulator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn evaluator() -> CandidateEvaluator {
        CandidateEvaluator::new(
            Simulator::new(SimulationConfig {
                steps: 20,
                path_count: 3,
                eval_path_count: 2,
                ..SimulationConfig::default()
            }),
            Scorer::default(),
        )
    }

    #[test]
    fn test_step_updates_one_branch_and_logs() {
        let allocator = BranchAllocator::new(
            AllocatorConfig {
                batch_size: 2,
                ..AllocatorConfig::default()
            },
            vec![RegimeKind::LowVolatility],
        );
        let outcome = allocator
            .step(&evaluator(), &mut StdRng::seed_from_u64(8))
            .unwrap();

        assert_eq!(allocator.total_tests(), 0);
        assert_eq!(outcome.allocator.total_tests(), 1);
        assert_eq!(outcome.allocator.steps(), 1);
        assert_eq!(outcome.allocator.events().count(), 1);
        assert_eq!(outcome.event.regime, RegimeKind::LowVolatility);
        assert!(outcome
            .candidates
            .iter()
            .all(|c| c.provenance.experiment.as_deref() == Some(outcome.event.branch_id.as_str())));
    }

    #[test]
    fn test_event_log_is_bounded() {
        let mut allocator = BranchAllocator::new(
            AllocatorConfig {
                batch_size: 1,
                event_log_capacity: 2,
                ..AllocatorConfig::default()
            },
            vec![RegimeKind::HighVolatility],
        );
        let evaluator = evaluator();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..4 {
            allocator = allocator.step(&evaluator, &mut rng).unwrap().allocator;
        }
        assert_eq!(allocator.events().count(), 2);
        assert_eq!(allocator.steps(), 4);
    }

    #[test]
    fn test_no_regimes_is_an_error() {
        let allocator = BranchAllocator::new(AllocatorConfig::default(), Vec::new());
        assert!(allocator
            .step(&evaluator(), &mut StdRng::seed_from_u64(1))
            .is_err());
    }

    #[test]
    fn test_donor_is_ranked_within_the_target_regime() {
        let config = AllocatorConfig::default();
        let mut allocator = BranchAllocator::new(config.clone(), vec![RegimeKind::LowVolatility, RegimeKind::Trending]);
        let receiver = 0;
        let coordinate = allocator.branches[receiver].coordinate;
        let neighbours: Vec<usize> = (1..allocator.branches.len())
            .filter(|&i| allocator.branches[i].coordinate.shared_axes(&coordinate) >= MIN_SHARED_AXES)
            .take(2)
            .collect();
        assert_eq!(neighbours.len(), 2);

        let batch = |score: f64, bins: LiquidityVector| BatchResult {
            best_score: score,
            mean_score: score,
            best_bins: bins,
            candidate_ids: Vec::new(),
        };
        let mut rng = StdRng::seed_from_u64(5);
        let trending_bins = LiquidityVector::random(&mut rng);

        // Strong overall, but only ever tested in LowVolatility
        let (strong, _) = allocator.branches[neighbours[0]].observe(
            RegimeKind::LowVolatility,
            Some(&batch(0.1, LiquidityVector::uniform())),
            &config,
        );
        let (trending, _) = allocator.branches[neighbours[1]].observe(
            RegimeKind::Trending,
            Some(&batch(0.6, trending_bins.clone())),
            &config,
        );
        allocator.branches[neighbours[0]] = strong;
        allocator.branches[neighbours[1]] = trending;

        let (id, bins) = allocator.donor_for(receiver, RegimeKind::Trending).unwrap();
        assert_eq!(id, allocator.branches[neighbours[1]].id());
        assert_eq!(bins, &trending_bins);

        let (id, _) = allocator.donor_for(receiver, RegimeKind::LowVolatility).unwrap();
        assert_eq!(id, allocator.branches[neighbours[0]].id());
    }
}
