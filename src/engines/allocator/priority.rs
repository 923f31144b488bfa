use super::branch::{Branch, ExplorationPhase, Trend};
use crate::config::AllocatorConfig;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Per-term priority of a branch. Higher means test sooner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub ucb: f64,
    pub expected_improvement: f64,
    pub uncertainty: f64,
    pub novelty: f64,
    pub robustness: f64,
    pub velocity: f64,
    pub phase_bonus: f64,
    pub untested_bonus: f64,
    pub stagnation_penalty: f64,
    pub total: f64,
}

/// Priority of `branch` given `total_tests` across all branches and the lowest
/// score any branch has reached.
pub fn branch_priority(
    branch: &Branch,
    total_tests: u32,
    global_best: Option<f64>,
    config: &AllocatorConfig,
) -> PriorityBreakdown {
    let sigma = branch.posterior_variance.max(0.0).sqrt();
    let quality = -branch.posterior_mean;

    let exploration = ((f64::from(total_tests) + 1.0).ln() / (f64::from(branch.tested) + 1.0)).sqrt();
    let ucb = quality + config.ucb_coefficient * exploration;

    let expected_improvement = config.ei_coefficient
        * match global_best {
            Some(best) => expected_improvement(branch.posterior_mean, sigma, best),
            None => expected_improvement(branch.posterior_mean, sigma, branch.posterior_mean),
        };

    let uncertainty = config.uncertainty_coefficient * sigma;
    let novelty = config.novelty_coefficient / (1.0 + f64::from(branch.tested));
    let robustness = -config.robustness_coefficient * branch.regime_spread();

    let velocity = match branch.trend(config.improvement_epsilon) {
        Trend::Improving => config.velocity_coefficient * branch.trend_delta().unwrap_or(0.0).max(0.0),
        _ => 0.0,
    };

    let phase_bonus = match branch.phase {
        ExplorationPhase::Explore => config.explore_phase_bonus,
        ExplorationPhase::Exploit => 0.0,
        ExplorationPhase::Intensify => config.intensify_phase_bonus,
    };

    let untested_bonus = if branch.tested == 0 { config.untested_bonus } else { 0.0 };
    let stagnation_penalty = branch.stagnation_penalty;

    let total = ucb + expected_improvement + uncertainty + novelty + robustness + velocity
        + phase_bonus
        + untested_bonus
        - stagnation_penalty;

    PriorityBreakdown {
        ucb,
        expected_improvement,
        uncertainty,
        novelty,
        robustness,
        velocity,
        phase_bonus,
        untested_bonus,
        stagnation_penalty,
        total,
    }
}

/// Expected amount by which a draw from N(mean, sigma^2) falls below `best`.
pub fn expected_improvement(mean: f64, sigma: f64, best: f64) -> f64 {
    let gap = best - mean;
    match Normal::new(mean, sigma) {
        // sigma * phi(z) == sigma^2 * pdf(best)
        Ok(posterior) if sigma > f64::EPSILON => {
            gap * posterior.cdf(best) + sigma * sigma * posterior.pdf(best)
        }
        _ => gap.max(0.0),
    }
}

pub fn phase_noise(phase: ExplorationPhase, config: &AllocatorConfig) -> f64 {
    match phase {
        ExplorationPhase::Explore => config.explore_noise,
        ExplorationPhase::Exploit => config.exploit_noise,
        ExplorationPhase::Intensify => config.intensify_noise,
    }
}

/// Thompson draw: priority plus posterior noise, widened or narrowed by phase.
pub fn thompson_draw<R: Rng + ?Sized>(
    branch: &Branch,
    priority: f64,
    config: &AllocatorConfig,
    rng: &mut R,
) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    priority + z * branch.posterior_variance.max(0.0).sqrt() * phase_noise(branch.phase, config)
}

/// Index of the branch with the highest Thompson draw.
pub fn select_branch<R: Rng + ?Sized>(
    branches: &[Branch],
    config: &AllocatorConfig,
    rng: &mut R,
) -> Option<usize> {
    let total_tests: u32 = branches.iter().map(|b| b.tested).sum();
    let global_best = branches
        .iter()
        .filter_map(|b| b.best_score)
        .min_by(f64::total_cmp);

    let mut best: Option<(usize, f64)> = None;
    for (i, branch) in branches.iter().enumerate() {
        let priority = branch_priority(branch, total_tests, global_best, config).total;
        let draw = thompson_draw(branch, priority, config, rng);
        if best.map_or(true, |(_, d)| draw > d) {
            best = Some((i, draw));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::allocator::families::BranchCoordinate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_expected_improvement_at_the_mean() {
        // Half-normal mean: sigma / sqrt(2 pi)
        let ei = expected_improvement(0.4, 0.2, 0.4);
        assert!((ei - 0.2 * 0.398_942_280_401_432_7).abs() < 1e-12);
        assert!((expected_improvement(0.0, 1.0, 1.0) - 1.083_315_470_8).abs() < 1e-8);
    }

    #[test]
    fn test_expected_improvement_grows_with_gap() {
        let near = expected_improvement(0.5, 0.1, 0.5);
        let far = expected_improvement(0.3, 0.1, 0.5);
        assert!(far > near);
        assert!(near > 0.0);
        assert_eq!(expected_improvement(0.7, 0.0, 0.5), 0.0);
    }

    #[test]
    fn test_untested_branch_outranks_stagnant_one() {
        let config = AllocatorConfig::default();
        let coordinates = BranchCoordinate::curated();
        let fresh = Branch::new(coordinates[0], &config);
        let mut stale = Branch::new(coordinates[1], &config);
        stale.tested = 12;
        stale.stagnation_penalty = config.max_stagnation_penalty;
        stale.best_score = Some(0.5);

        let p_fresh = branch_priority(&fresh, 12, Some(0.5), &config);
        let p_stale = branch_priority(&stale, 12, Some(0.5), &config);
        assert!(p_fresh.total > p_stale.total);
        assert_eq!(p_fresh.untested_bonus, config.untested_bonus);
    }

    #[test]
    fn test_select_branch_empty() {
        let config = AllocatorConfig::default();
        assert!(select_branch(&[], &config, &mut StdRng::seed_from_u64(0)).is_none());
    }

    #[test]
    fn test_intensify_draws_are_narrower() {
        let config = AllocatorConfig::default();
        assert!(phase_noise(ExplorationPhase::Intensify, &config) < phase_noise(ExplorationPhase::Explore, &config));
    }
}
