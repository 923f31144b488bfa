use super::traits::{require, ConfigManifest, ConfigSection, FieldManifest};
use crate::error::CurveLabError;
use serde::{Deserialize, Serialize};

/// Tuning for the branch allocator. Scores are on the composite-score scale (lower is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Candidates generated per allocation step
    pub batch_size: usize,

    // Posterior
    pub prior_mean: f64,
    pub prior_variance: f64,
    pub observation_noise: f64,
    pub min_variance: f64,

    // Priority terms
    pub ucb_coefficient: f64,
    pub ei_coefficient: f64,
    pub uncertainty_coefficient: f64,
    pub novelty_coefficient: f64,
    pub robustness_coefficient: f64,
    pub velocity_coefficient: f64,
    pub untested_bonus: f64,
    pub explore_phase_bonus: f64,
    pub intensify_phase_bonus: f64,

    // Thompson noise width per phase
    pub explore_noise: f64,
    pub exploit_noise: f64,
    pub intensify_noise: f64,

    // Stagnation learning
    pub stagnation_step: f64,
    pub stagnation_decay: f64,
    pub max_stagnation_penalty: f64,
    pub failure_threshold: u32,
    pub min_tests_before_exploit: u32,
    pub trend_window: usize,
    pub improvement_epsilon: f64,

    // Mutation intensity
    pub initial_mutation_intensity: f64,
    pub min_mutation_intensity: f64,
    pub max_mutation_intensity: f64,
    pub mutation_widen: f64,
    pub mutation_narrow: f64,

    // Candidate generation
    pub reuse_best_probability: f64,
    pub cross_branch_probability: f64,

    pub event_log_capacity: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            batch_size: 6,
            prior_mean: 0.6,
            prior_variance: 0.09,
            observation_noise: 0.01,
            min_variance: 1e-4,
            ucb_coefficient: 0.3,
            ei_coefficient: 1.0,
            uncertainty_coefficient: 0.2,
            novelty_coefficient: 0.1,
            robustness_coefficient: 0.2,
            velocity_coefficient: 0.5,
            untested_bonus: 1.0,
            explore_phase_bonus: 0.05,
            intensify_phase_bonus: 0.1,
            explore_noise: 1.5,
            exploit_noise: 1.0,
            intensify_noise: 0.5,
            stagnation_step: 0.05,
            stagnation_decay: 0.3,
            max_stagnation_penalty: 0.5,
            failure_threshold: 4,
            min_tests_before_exploit: 3,
            trend_window: 10,
            improvement_epsilon: 1e-4,
            initial_mutation_intensity: 0.2,
            min_mutation_intensity: 0.05,
            max_mutation_intensity: 0.8,
            mutation_widen: 1.25,
            mutation_narrow: 0.8,
            reuse_best_probability: 0.6,
            cross_branch_probability: 0.3,
            event_log_capacity: 256,
        }
    }
}

impl ConfigSection for AllocatorConfig {
    fn section_name() -> &'static str {
        "allocator"
    }

    fn validate(&self) -> Result<(), CurveLabError> {
        require(self.batch_size >= 1, "Batch size must be positive")?;
        require(
            self.prior_variance > 0.0 && self.observation_noise > 0.0 && self.min_variance > 0.0,
            "Posterior variances must be positive",
        )?;
        require(
            self.min_mutation_intensity > 0.0
                && self.min_mutation_intensity <= self.initial_mutation_intensity
                && self.initial_mutation_intensity <= self.max_mutation_intensity
                && self.max_mutation_intensity <= 1.0,
            "Mutation intensities must satisfy 0 < min <= initial <= max <= 1",
        )?;
        require(
            self.mutation_widen >= 1.0 && self.mutation_narrow > 0.0 && self.mutation_narrow <= 1.0,
            "Mutation widen must be >= 1 and narrow in (0, 1]",
        )?;
        require(
            (0.0..1.0).contains(&self.stagnation_decay),
            "Stagnation decay must be in [0, 1)",
        )?;
        require(self.trend_window >= 4, "Trend window needs at least 4 points")?;
        require(
            (0.0..=1.0).contains(&self.reuse_best_probability)
                && (0.0..=1.0).contains(&self.cross_branch_probability),
            "Generation probabilities must be between 0 and 1",
        )?;
        require(
            self.explore_noise >= self.exploit_noise && self.exploit_noise >= self.intensify_noise,
            "Thompson noise must narrow from explore to intensify",
        )
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Allocator".to_string(),
            fields: vec![
                FieldManifest::integer("batch_size", self.batch_size, 1.0, 256.0, "Candidates per allocation step"),
                FieldManifest::float(
                    "ucb_coefficient",
                    self.ucb_coefficient,
                    0.0,
                    10.0,
                    "Exploration bonus shrinking with test count",
                ),
                FieldManifest::float(
                    "stagnation_step",
                    self.stagnation_step,
                    0.0,
                    1.0,
                    "Penalty added per step without improvement",
                ),
                FieldManifest::integer(
                    "failure_threshold",
                    self.failure_threshold as usize,
                    1.0,
                    100.0,
                    "Failure streak that sends a branch back to exploring",
                ),
            ],
        }
    }
}
