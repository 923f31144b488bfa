use crate::archive::{mechanism_from_json, Archive};
use crate::config::AppConfig;
use crate::engines::allocator::{BranchAllocator, ExplorationEvent};
use crate::engines::evaluation::CandidateEvaluator;
use crate::engines::generation::{EvolutionEngine, GenerationStats, Population};
use crate::error::{CurveLabError, Result};
use crate::types::{Candidate, RegimeKind};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Process-wide search state. Steps return a successor; the archive is shared
/// between successors and only ever appended to.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub archive: Arc<Archive>,
    pub populations: BTreeMap<RegimeKind, Population>,
    pub allocator: BranchAllocator,
    /// Incremented by every generation and allocation step
    pub generation: u64,
}

impl EngineState {
    pub fn new(config: &AppConfig) -> Self {
        let populations = config
            .engine
            .regimes
            .iter()
            .map(|kind| (*kind, Population::new(kind.config())))
            .collect();
        Self {
            archive: Arc::new(Archive::new()),
            populations,
            allocator: BranchAllocator::new(config.allocator.clone(), config.engine.regimes.clone()),
            generation: 0,
        }
    }

    pub fn champion(&self, regime: RegimeKind) -> Option<&Candidate> {
        self.populations.get(&regime)?.champion.as_ref()
    }

    pub fn champions(&self) -> Vec<&Candidate> {
        self.populations
            .values()
            .filter_map(|p| p.champion.as_ref())
            .collect()
    }
}

/// Stateless driver for both search strategies.
pub struct DiscoveryEngine {
    config: AppConfig,
    evaluator: CandidateEvaluator,
    evolution: EvolutionEngine,
}

impl DiscoveryEngine {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let evaluator = CandidateEvaluator::from_config(&config);
        let evolution = EvolutionEngine::new(config.evolution.clone(), evaluator.clone());
        Ok(Self {
            config,
            evaluator,
            evolution,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &CandidateEvaluator {
        &self.evaluator
    }

    pub fn initial_state(&self) -> EngineState {
        EngineState::new(&self.config)
    }

    /// One generation in every regime. New candidates go to the archive.
    pub fn generation_step<R: Rng + ?Sized>(
        &self,
        state: &EngineState,
        rng: &mut R,
    ) -> (EngineState, Vec<GenerationStats>) {
        let mut next = state.clone();
        let mut stats = Vec::with_capacity(state.populations.len());

        for (kind, population) in &state.populations {
            let outcome = self.evolution.run_generation(population, rng);
            next.archive.ingest_candidates(
                outcome.new_candidates,
                Some(&format!("{} generation {}", kind, outcome.population.generation)),
            );
            if let Some(s) = outcome.population.last_stats() {
                stats.push(s.clone());
            }
            next.populations.insert(*kind, outcome.population);
        }

        next.generation += 1;
        (next, stats)
    }

    /// One allocator batch. New candidates go to the archive.
    pub fn allocation_step<R: Rng + ?Sized>(
        &self,
        state: &EngineState,
        rng: &mut R,
    ) -> Result<(EngineState, ExplorationEvent)> {
        let outcome = state.allocator.step(&self.evaluator, rng)?;
        state.archive.ingest_candidates(
            outcome.candidates,
            Some(&format!("allocator branch {}", outcome.event.branch_id)),
        );

        let mut next = state.clone();
        next.allocator = outcome.allocator;
        next.generation += 1;
        Ok((next, outcome.event))
    }

    /// Parse and evaluate a hand-authored mechanism, then archive it.
    pub fn import_mechanism_json<R: Rng + ?Sized>(
        &self,
        state: &EngineState,
        json: &str,
        regime: RegimeKind,
        rng: &mut R,
    ) -> Result<Candidate> {
        if !self.config.engine.regimes.contains(&regime) {
            return Err(CurveLabError::InvalidRegime(format!("{} is not enabled", regime)));
        }
        let mechanism = mechanism_from_json(json)?;
        let candidate =
            self.evaluator
                .import_mechanism(&mechanism, &regime.config(), state.generation, rng)?;
        state
            .archive
            .ingest_candidates(vec![candidate.clone()], Some("hand-authored import"));
        Ok(candidate)
    }
}
