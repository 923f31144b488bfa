use super::traits::{require, ConfigManifest, ConfigSection, FieldManifest};
use crate::error::CurveLabError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    /// Best-scoring members carried into the next generation
    pub elite_count: usize,
    /// Cap on Pareto-front members retained on top of the elite
    pub max_front_retained: usize,
    pub mutation_intensity: f64,
    /// Probability a refill child blends two parents before mutation
    pub crossover_rate: f64,
    /// Share of the seed population built from shape templates instead of noise
    pub template_seed_ratio: f64,
    /// Redraws allowed per slot before a degenerate child is dropped
    pub max_regeneration_attempts: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 24,
            elite_count: 6,
            max_front_retained: 6,
            mutation_intensity: 0.25,
            crossover_rate: 0.3,
            template_seed_ratio: 0.5,
            max_regeneration_attempts: 5,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), CurveLabError> {
        require(self.population_size >= 4, "Population size must be at least 4")?;
        require(
            self.elite_count >= 1 && self.elite_count < self.population_size,
            "Elite count must be between 1 and population size",
        )?;
        // Survivors are the champion, the elite and the retained front; the rest are children
        require(
            self.elite_count + self.max_front_retained + 1 < self.population_size,
            "Elite count plus retained front must leave room for children",
        )?;
        require(
            self.mutation_intensity.is_finite()
                && self.mutation_intensity > 0.0
                && self.mutation_intensity <= 1.0,
            "Mutation intensity must be in (0, 1]",
        )?;
        require(
            (0.0..=1.0).contains(&self.crossover_rate),
            "Crossover rate must be between 0 and 1",
        )?;
        require(
            (0.0..=1.0).contains(&self.template_seed_ratio),
            "Template seed ratio must be between 0 and 1",
        )?;
        require(
            self.max_regeneration_attempts >= 1,
            "At least one regeneration attempt is required",
        )
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Evolution".to_string(),
            fields: vec![
                FieldManifest::integer(
                    "population_size",
                    self.population_size,
                    4.0,
                    10000.0,
                    "Number of liquidity designs per regime",
                ),
                FieldManifest::integer("elite_count", self.elite_count, 1.0, 1000.0, "Survivors per generation"),
                FieldManifest::float(
                    "mutation_intensity",
                    self.mutation_intensity,
                    0.01,
                    1.0,
                    "Bound on per-bin multiplicative noise",
                ),
            ],
        }
    }
}
