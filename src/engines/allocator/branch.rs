use super::families::BranchCoordinate;
use crate::config::AllocatorConfig;
use crate::liquidity::LiquidityVector;
use crate::types::RegimeKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Recent candidate ids remembered per branch
const RECENT_CANDIDATES: usize = 32;
/// Share of the batch best in the posterior observation; the rest is the batch mean
const BEST_OBSERVATION_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationPhase {
    Explore,
    Exploit,
    Intensify,
}

impl fmt::Display for ExplorationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExplorationPhase::Explore => "explore",
            ExplorationPhase::Exploit => "exploit",
            ExplorationPhase::Intensify => "intensify",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Plateau,
    Degrading,
}

/// Scores from one evaluated allocation batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub best_score: f64,
    pub mean_score: f64,
    pub best_bins: LiquidityVector,
    pub candidate_ids: Vec<String>,
}

impl BatchResult {
    /// `None` when no (score, bins, id) triple was supplied.
    pub fn from_scored<'a, I>(scored: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, &'a LiquidityVector, &'a str)>,
    {
        let mut best: Option<(f64, &LiquidityVector)> = None;
        let mut sum = 0.0;
        let mut ids = Vec::new();

        for (score, bins, id) in scored {
            sum += score;
            ids.push(id.to_string());
            if best.map_or(true, |(b, _)| score < b) {
                best = Some((score, bins));
            }
        }

        let (best_score, best_bins) = best?;
        Some(Self {
            best_score,
            mean_score: sum / ids.len() as f64,
            best_bins: best_bins.clone(),
            candidate_ids: ids,
        })
    }
}

/// Allocator state for one structural coordinate. Scores are composite scores, so
/// lower is better throughout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub coordinate: BranchCoordinate,
    /// Gaussian posterior over the best score this branch can reach
    pub posterior_mean: f64,
    pub posterior_variance: f64,
    pub tested: u32,
    pub failure_streak: u32,
    pub stagnation_penalty: f64,
    pub mutation_intensity: f64,
    pub phase: ExplorationPhase,
    /// Batch mean scores, oldest first
    pub recent_scores: VecDeque<f64>,
    pub recent_candidates: VecDeque<String>,
    /// Best across every regime
    pub best_score: Option<f64>,
    pub best_bins: Option<LiquidityVector>,
    /// Best score reached in each regime tested so far
    pub regime_scores: BTreeMap<RegimeKind, f64>,
    pub regime_bins: BTreeMap<RegimeKind, LiquidityVector>,
}

impl Branch {
    pub fn new(coordinate: BranchCoordinate, config: &AllocatorConfig) -> Self {
        Self {
            coordinate,
            posterior_mean: config.prior_mean,
            posterior_variance: config.prior_variance,
            tested: 0,
            failure_streak: 0,
            stagnation_penalty: 0.0,
            mutation_intensity: config.initial_mutation_intensity,
            phase: ExplorationPhase::Explore,
            recent_scores: VecDeque::new(),
            recent_candidates: VecDeque::new(),
            best_score: None,
            best_bins: None,
            regime_scores: BTreeMap::new(),
            regime_bins: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> String {
        self.coordinate.id()
    }

    /// First regime never tested, otherwise the one with the worst best score.
    pub fn target_regime(&self, regimes: &[RegimeKind]) -> Option<RegimeKind> {
        if let Some(untested) = regimes.iter().find(|r| !self.regime_scores.contains_key(*r)) {
            return Some(*untested);
        }
        regimes
            .iter()
            .copied()
            .max_by(|a, b| self.regime_scores[a].total_cmp(&self.regime_scores[b]))
    }

    /// Best vector found in `regime`.
    pub fn regime_best(&self, regime: RegimeKind) -> Option<(f64, &LiquidityVector)> {
        Some((*self.regime_scores.get(&regime)?, self.regime_bins.get(&regime)?))
    }

    /// Max minus min of the per-regime best scores.
    pub fn regime_spread(&self) -> f64 {
        let mut values = self.regime_scores.values();
        let Some(&first) = values.next() else {
            return 0.0;
        };
        let (lo, hi) = values.fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        hi - lo
    }

    /// Mean of the older half of the score window minus the mean of the newer half.
    /// Positive means scores are falling, which is improvement.
    pub fn trend_delta(&self) -> Option<f64> {
        let n = self.recent_scores.len();
        if n < 4 {
            return None;
        }
        let half = n / 2;
        let older: f64 = self.recent_scores.iter().take(half).sum::<f64>() / half as f64;
        let newer: f64 = self.recent_scores.iter().skip(n - half).sum::<f64>() / half as f64;
        Some(older - newer)
    }

    pub fn trend(&self, epsilon: f64) -> Trend {
        match self.trend_delta() {
            Some(delta) if delta > epsilon => Trend::Improving,
            Some(delta) if delta < -epsilon => Trend::Degrading,
            _ => Trend::Plateau,
        }
    }

    /// Fold one batch into a copy of this branch. `None` means the oracle produced
    /// no finite candidate, which counts as a failure with a doubled penalty.
    /// Returns the updated branch and the improvement over the previous best in
    /// `regime` (positive is better, zero when the regime was untested).
    pub fn observe(
        &self,
        regime: RegimeKind,
        batch: Option<&BatchResult>,
        config: &AllocatorConfig,
    ) -> (Branch, f64) {
        let mut next = self.clone();
        next.tested = next.tested.saturating_add(1);
        let mut improvement = 0.0;

        match batch {
            None => {
                next.register_failure(2.0 * config.stagnation_step, config);
            }
            Some(batch) => {
                next.update_posterior(
                    BEST_OBSERVATION_WEIGHT * batch.best_score
                        + (1.0 - BEST_OBSERVATION_WEIGHT) * batch.mean_score,
                    config,
                );

                let previous = self.regime_scores.get(&regime).copied();
                if let Some(previous) = previous {
                    improvement = previous - batch.best_score;
                }
                let improved = previous.is_none() || improvement > config.improvement_epsilon;

                if improved {
                    next.failure_streak = 0;
                    next.stagnation_penalty *= config.stagnation_decay;
                    next.mutation_intensity *= config.mutation_narrow;
                } else {
                    next.register_failure(config.stagnation_step, config);
                }

                if previous.map_or(true, |p| batch.best_score < p) {
                    next.regime_scores.insert(regime, batch.best_score);
                    next.regime_bins.insert(regime, batch.best_bins.clone());
                }

                if self.best_score.map_or(true, |best| batch.best_score < best) {
                    next.best_score = Some(batch.best_score);
                    next.best_bins = Some(batch.best_bins.clone());
                }

                next.recent_scores.push_back(batch.mean_score);
                while next.recent_scores.len() > config.trend_window.max(1) {
                    next.recent_scores.pop_front();
                }
                for id in &batch.candidate_ids {
                    next.recent_candidates.push_back(id.clone());
                }
                while next.recent_candidates.len() > RECENT_CANDIDATES {
                    next.recent_candidates.pop_front();
                }
            }
        }

        next.mutation_intensity = next
            .mutation_intensity
            .clamp(config.min_mutation_intensity, config.max_mutation_intensity);
        next.phase = next.next_phase(config);
        (next, improvement)
    }

    fn register_failure(&mut self, penalty_step: f64, config: &AllocatorConfig) {
        self.failure_streak = self.failure_streak.saturating_add(1);
        self.stagnation_penalty =
            (self.stagnation_penalty + penalty_step).min(config.max_stagnation_penalty);
        self.mutation_intensity *= config.mutation_widen;
    }

    /// Conjugate Gaussian update with known observation noise.
    fn update_posterior(&mut self, observation: f64, config: &AllocatorConfig) {
        let prior_precision = 1.0 / self.posterior_variance;
        let noise_precision = 1.0 / config.observation_noise;
        let variance = 1.0 / (prior_precision + noise_precision);
        self.posterior_mean =
            variance * (self.posterior_mean * prior_precision + observation * noise_precision);
        self.posterior_variance = variance.max(config.min_variance);
    }

    fn next_phase(&self, config: &AllocatorConfig) -> ExplorationPhase {
        let trend = self.trend(config.improvement_epsilon);
        if self.tested < config.min_tests_before_exploit
            || self.failure_streak > config.failure_threshold
            || trend == Trend::Degrading
        {
            ExplorationPhase::Explore
        } else if trend == Trend::Improving && self.failure_streak == 0 {
            ExplorationPhase::Intensify
        } else {
            ExplorationPhase::Exploit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::allocator::families::{FeeFamily, InvariantFamily, LiquidityFamily};

    fn branch() -> Branch {
        Branch::new(
            BranchCoordinate::new(InvariantFamily::ConstantProduct, LiquidityFamily::Gaussian, FeeFamily::Flat),
            &AllocatorConfig::default(),
        )
    }

    fn batch(score: f64) -> BatchResult {
        BatchResult {
            best_score: score,
            mean_score: score + 0.05,
            best_bins: LiquidityVector::uniform(),
            candidate_ids: vec!["c".to_string()],
        }
    }

    #[test]
    fn test_posterior_variance_shrinks() {
        let config = AllocatorConfig::default();
        let (next, _) = branch().observe(RegimeKind::LowVolatility, Some(&batch(0.4)), &config);

        assert!(next.posterior_variance < config.prior_variance);
        assert!(next.posterior_mean < config.prior_mean);
        assert_eq!(next.tested, 1);
        assert_eq!(next.best_score, Some(0.4));
    }

    #[test]
    fn test_stagnation_widens_then_improvement_narrows() {
        let config = AllocatorConfig::default();
        let (b, _) = branch().observe(RegimeKind::LowVolatility, Some(&batch(0.4)), &config);
        let (stuck, delta) = b.observe(RegimeKind::LowVolatility, Some(&batch(0.45)), &config);

        assert!(delta < 0.0);
        assert_eq!(stuck.failure_streak, 1);
        assert!(stuck.stagnation_penalty > 0.0);
        assert!(stuck.mutation_intensity > b.mutation_intensity);

        let (recovered, delta) = stuck.observe(RegimeKind::LowVolatility, Some(&batch(0.3)), &config);
        assert!(delta > 0.0);
        assert_eq!(recovered.failure_streak, 0);
        assert!(recovered.stagnation_penalty < stuck.stagnation_penalty);
        assert!(recovered.mutation_intensity < stuck.mutation_intensity);
    }

    #[test]
    fn test_exhaustion_counts_double() {
        let config = AllocatorConfig::default();
        let (failed, _) = branch().observe(RegimeKind::Trending, None, &config);

        assert_eq!(failed.failure_streak, 1);
        assert!((failed.stagnation_penalty - 2.0 * config.stagnation_step).abs() < 1e-12);
        assert_eq!(failed.posterior_mean, config.prior_mean);
    }

    #[test]
    fn test_trend_detection() {
        let mut b = branch();
        b.recent_scores = VecDeque::from(vec![0.8, 0.7, 0.5, 0.4]);
        assert_eq!(b.trend(1e-4), Trend::Improving);
        b.recent_scores = VecDeque::from(vec![0.4, 0.5, 0.7, 0.8]);
        assert_eq!(b.trend(1e-4), Trend::Degrading);
        b.recent_scores = VecDeque::from(vec![0.5, 0.5]);
        assert_eq!(b.trend(1e-4), Trend::Plateau);
    }

    #[test]
    fn test_target_regime_prefers_untested_then_worst() {
        let mut b = branch();
        let regimes = [RegimeKind::LowVolatility, RegimeKind::HighVolatility];
        assert_eq!(b.target_regime(&regimes), Some(RegimeKind::LowVolatility));

        b.regime_scores.insert(RegimeKind::LowVolatility, 0.3);
        assert_eq!(b.target_regime(&regimes), Some(RegimeKind::HighVolatility));

        b.regime_scores.insert(RegimeKind::HighVolatility, 0.2);
        assert_eq!(b.target_regime(&regimes), Some(RegimeKind::LowVolatility));
        assert!((b.regime_spread() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_phase_starts_in_explore() {
        let config = AllocatorConfig::default();
        let (b, _) = branch().observe(RegimeKind::LowVolatility, Some(&batch(0.4)), &config);
        assert_eq!(b.phase, ExplorationPhase::Explore);
    }

    #[test]
    fn test_improvement_is_measured_within_the_target_regime() {
        let config = AllocatorConfig::default();
        let (mut b, _) = branch().observe(RegimeKind::LowVolatility, Some(&batch(0.30)), &config);

        let weak_bins = LiquidityVector::from_weights((0..crate::types::NUM_BINS).map(|i| 1.0 + i as f64).collect()).unwrap();
        for score in [0.60, 0.55, 0.50, 0.45, 0.40, 0.35] {
            let result = BatchResult {
                best_bins: weak_bins.clone(),
                ..batch(score)
            };
            let (next, improvement) = b.observe(RegimeKind::HighVolatility, Some(&result), &config);
            if b.regime_scores.contains_key(&RegimeKind::HighVolatility) {
                assert!(improvement > 0.0);
            }
            assert_eq!(next.failure_streak, 0);
            assert!(next.stagnation_penalty <= b.stagnation_penalty);
            assert!(next.mutation_intensity <= b.mutation_intensity);
            b = next;
        }

        assert_eq!(b.best_score, Some(0.30));
        assert_eq!(b.regime_scores[&RegimeKind::HighVolatility], 0.35);
        assert_eq!(b.regime_best(RegimeKind::HighVolatility).map(|(_, bins)| bins), Some(&weak_bins));
        assert_eq!(
            b.regime_best(RegimeKind::LowVolatility).map(|(_, bins)| bins),
            Some(&LiquidityVector::uniform())
        );
        assert_ne!(b.phase, ExplorationPhase::Explore);
    }
}
