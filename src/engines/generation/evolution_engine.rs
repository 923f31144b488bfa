use crate::config::EvolutionConfig;
use crate::engines::evaluation::CandidateEvaluator;
use crate::engines::generation::{
    operators::{crossover, mutate_bins, random_design, tournament_selection},
    pareto::{crowded_selection, pareto_front},
};
use crate::liquidity::LiquidityVector;
use crate::types::{Candidate, Provenance, RegimeConfig, RegimeKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

const TOURNAMENT_SIZE: usize = 3;
/// Stagnant generations after which mutation intensity stops widening
const MAX_STAGNATION_BOOST: u32 = 4;

/// Summary of one completed generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub regime: RegimeKind,
    pub generation: u64,
    pub best_score: f64,
    pub mean_score: f64,
    pub champion_score: f64,
    pub front_size: usize,
    pub population_size: usize,
    /// Evaluations that came back non-finite and were redrawn or dropped
    pub discarded: usize,
}

/// Per-regime evolutionary state. Each generation produces a new value; the
/// previous one is never modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Population {
    pub regime: RegimeConfig,
    /// Index of the last completed generation
    pub generation: u64,
    /// Sorted by ascending score
    pub members: Vec<Candidate>,
    pub front: Vec<Candidate>,
    /// Lowest score ever seen in this regime. Selection never evicts it.
    pub champion: Option<Candidate>,
    pub champion_history: Vec<Candidate>,
    pub history: Vec<GenerationStats>,
    /// Consecutive generations without a new champion
    pub stagnant_generations: u32,
}

impl Population {
    pub fn new(regime: RegimeConfig) -> Self {
        Self {
            regime,
            generation: 0,
            members: Vec::new(),
            front: Vec::new(),
            champion: None,
            champion_history: Vec::new(),
            history: Vec::new(),
            stagnant_generations: 0,
        }
    }

    pub fn is_seeded(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.members.first()
    }

    pub fn last_stats(&self) -> Option<&GenerationStats> {
        self.history.last()
    }
}

/// Result of one generation: the successor population and every candidate that was
/// evaluated while producing it, ready for the archive.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub population: Population,
    pub new_candidates: Vec<Candidate>,
}

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, regime: RegimeKind, generation: u64);
    fn on_generation_complete(&mut self, stats: &GenerationStats);
    fn on_candidate_evaluated(&mut self, evaluated: usize, total: usize);
}

pub struct EvolutionEngine {
    config: EvolutionConfig,
    evaluator: CandidateEvaluator,
}

impl EvolutionEngine {
    pub fn new(config: EvolutionConfig, evaluator: CandidateEvaluator) -> Self {
        Self { config, evaluator }
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &CandidateEvaluator {
        &self.evaluator
    }

    /// Advance `population` by one generation.
    ///
    /// An empty population is seeded from shape templates and random noise. Otherwise
    /// the elite and the Pareto front survive, tournament-selected survivors are
    /// crossed and mutated to refill the population, and the children are evaluated.
    pub fn run_generation<R: Rng + ?Sized>(
        &self,
        population: &Population,
        rng: &mut R,
    ) -> GenerationOutcome {
        if population.is_seeded() {
            self.evolve(population, rng)
        } else {
            self.seed(population, rng)
        }
    }

    /// Run several generations, reporting through `callback`. Stops early when
    /// `cancel` is raised between generations.
    pub fn run<R: Rng + ?Sized, C: ProgressCallback>(
        &self,
        mut population: Population,
        generations: usize,
        rng: &mut R,
        callback: &mut C,
        cancel: &AtomicBool,
    ) -> GenerationOutcome {
        let mut new_candidates = Vec::new();

        for _ in 0..generations {
            if cancel.load(Ordering::Relaxed) {
                log::info!("evolution cancelled in {}", population.regime.kind);
                break;
            }

            let next = if population.is_seeded() { population.generation + 1 } else { 0 };
            callback.on_generation_start(population.regime.kind, next);

            let outcome = self.run_generation(&population, rng);
            callback.on_candidate_evaluated(outcome.new_candidates.len(), self.config.population_size);
            if let Some(stats) = outcome.population.last_stats() {
                callback.on_generation_complete(stats);
            }

            new_candidates.extend(outcome.new_candidates);
            population = outcome.population;
        }

        GenerationOutcome { population, new_candidates }
    }

    fn seed<R: Rng + ?Sized>(&self, population: &Population, rng: &mut R) -> GenerationOutcome {
        let ratio = self.config.template_seed_ratio;
        let (children, discarded) = self.fill_slots(
            self.config.population_size,
            &population.regime,
            0,
            |r: &mut R| random_design(ratio, r),
            rng,
        );

        if children.is_empty() {
            log::warn!(
                "seeding {} produced no finite candidates, will retry next generation",
                population.regime.kind
            );
        }

        let next = self.assemble(population, 0, Vec::new(), children.clone(), discarded);
        GenerationOutcome { population: next, new_candidates: children }
    }

    fn evolve<R: Rng + ?Sized>(&self, population: &Population, rng: &mut R) -> GenerationOutcome {
        let generation = population.generation + 1;
        let survivors = self.select_survivors(population);
        let needed = self.config.population_size.saturating_sub(survivors.len());

        let boost = population.stagnant_generations.min(MAX_STAGNATION_BOOST) as f64;
        let intensity = (self.config.mutation_intensity * (1.0 + 0.25 * boost)).min(1.0);
        let crossover_rate = self.config.crossover_rate;

        let make_child = |r: &mut R| -> LiquidityVector {
            let Some(parent) = tournament_selection(&survivors, TOURNAMENT_SIZE, r) else {
                return random_design(1.0, r);
            };
            let base = if r.gen::<f64>() < crossover_rate {
                match tournament_selection(&survivors, TOURNAMENT_SIZE, r) {
                    Some(other) => crossover(&parent.bins, &other.bins, r),
                    None => parent.bins.clone(),
                }
            } else {
                parent.bins.clone()
            };
            mutate_bins(&base, intensity, r)
        };

        let (children, discarded) =
            self.fill_slots(needed, &population.regime, generation, make_child, rng);

        if children.len() < needed {
            log::warn!(
                "{} generation {}: only {}/{} children evaluated cleanly",
                population.regime.kind,
                generation,
                children.len(),
                needed
            );
        }

        let next = self.assemble(population, generation, survivors, children.clone(), discarded);
        GenerationOutcome { population: next, new_candidates: children }
    }

    /// Elite by score plus the Pareto front (capped), deduplicated by id. The
    /// champion is always kept.
    fn select_survivors(&self, population: &Population) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut survivors = Vec::new();

        let elite = population.members.iter().take(self.config.elite_count);
        let front = crowded_selection(&population.front, self.config.max_front_retained);

        for candidate in population.champion.iter().chain(elite).chain(front.iter()) {
            if seen.insert(candidate.id.clone()) {
                survivors.push(candidate.clone());
            }
        }

        survivors
    }

    /// Evaluate `count` fresh designs, redrawing slots whose evaluation was not finite
    /// up to `max_regeneration_attempts` times.
    fn fill_slots<R, F>(
        &self,
        count: usize,
        regime: &RegimeConfig,
        generation: u64,
        make: F,
        rng: &mut R,
    ) -> (Vec<Candidate>, usize)
    where
        R: Rng + ?Sized,
        F: FnMut(&mut R) -> LiquidityVector,
    {
        let provenance = Provenance::evolutionary();
        regenerate(
            count,
            self.config.max_regeneration_attempts,
            make,
            |batch, r: &mut R| {
                self.evaluator
                    .evaluate_batch(batch, regime, generation, &provenance, r)
            },
            rng,
        )
    }

    fn assemble(
        &self,
        previous: &Population,
        generation: u64,
        survivors: Vec<Candidate>,
        children: Vec<Candidate>,
        discarded: usize,
    ) -> Population {
        let mut members = survivors;
        members.extend(children);
        members.sort_by(|a, b| a.score.total_cmp(&b.score));

        let mut next = previous.clone();
        next.generation = generation;
        next.front = pareto_front(&members);

        let improved = match (members.first(), previous.champion.as_ref()) {
            (Some(best), Some(champion)) => best.score < champion.score,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if improved {
            if let Some(best) = members.first() {
                log::info!(
                    "new champion in {} at generation {}: {:.5}",
                    previous.regime.kind,
                    generation,
                    best.score
                );
                next.champion = Some(best.clone());
                next.champion_history.push(best.clone());
            }
            next.stagnant_generations = 0;
        } else {
            next.stagnant_generations = previous.stagnant_generations.saturating_add(1);
        }

        let scores: Vec<f64> = members.iter().map(|c| c.score).collect();
        let mean_score = if scores.is_empty() {
            f64::NAN
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        next.history.push(GenerationStats {
            regime: previous.regime.kind,
            generation,
            best_score: scores.first().copied().unwrap_or(f64::NAN),
            mean_score,
            champion_score: next.champion.as_ref().map(|c| c.score).unwrap_or(f64::NAN),
            front_size: next.front.len(),
            population_size: members.len(),
            discarded,
        });

        next.members = members;
        next
    }
}

/// Draw designs from `make` until `count` of them pass `evaluate` or `attempts`
/// rounds are used up. Rejected designs are dropped, never kept. Returns the
/// accepted candidates and how many were discarded.
fn regenerate<R, M, E>(
    count: usize,
    attempts: usize,
    mut make: M,
    mut evaluate: E,
    rng: &mut R,
) -> (Vec<Candidate>, usize)
where
    R: Rng + ?Sized,
    M: FnMut(&mut R) -> LiquidityVector,
    E: FnMut(Vec<LiquidityVector>, &mut R) -> Vec<Option<Candidate>>,
{
    let mut accepted = Vec::with_capacity(count);
    let mut discarded = 0;

    for _ in 0..attempts {
        let missing = count - accepted.len();
        if missing == 0 {
            break;
        }

        let batch: Vec<LiquidityVector> = (0..missing).map(|_| make(&mut *rng)).collect();
        for result in evaluate(batch, &mut *rng) {
            match result {
                Some(candidate) => accepted.push(candidate),
                None => discarded += 1,
            }
        }
    }

    (accepted, discarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::engines::scoring::Scorer;
    use crate::engines::simulation::Simulator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_engine() -> EvolutionEngine {
        let evaluator = CandidateEvaluator::new(
            Simulator::new(SimulationConfig {
                steps: 25,
                path_count: 4,
                eval_path_count: 2,
                ..SimulationConfig::default()
            }),
            Scorer::default(),
        );
        EvolutionEngine::new(
            EvolutionConfig {
                population_size: 8,
                elite_count: 2,
                max_front_retained: 2,
                ..EvolutionConfig::default()
            },
            evaluator,
        )
    }

    #[test]
    fn test_seeding_fills_population() {
        let engine = small_engine();
        let population = Population::new(RegimeKind::LowVolatility.config());
        let outcome = engine.run_generation(&population, &mut StdRng::seed_from_u64(1));

        assert!(!population.is_seeded());
        assert_eq!(outcome.population.members.len(), 8);
        assert_eq!(outcome.new_candidates.len(), 8);
        assert_eq!(outcome.population.generation, 0);
        assert!(outcome.population.champion.is_some());
        assert!(!outcome.population.front.is_empty());
    }

    #[test]
    fn test_members_sorted_and_generation_advances() {
        let engine = small_engine();
        let mut rng = StdRng::seed_from_u64(2);
        let seeded = engine.run_generation(&Population::new(RegimeKind::HighVolatility.config()), &mut rng);
        let next = engine.run_generation(&seeded.population, &mut rng);

        assert_eq!(next.population.generation, 1);
        assert!(next
            .population
            .members
            .windows(2)
            .all(|w| w[0].score <= w[1].score));
        assert!(next.new_candidates.iter().all(|c| c.generation == 1));
        assert_eq!(next.population.history.len(), 2);
    }

    struct Counter {
        completed: usize,
    }

    impl ProgressCallback for Counter {
        fn on_generation_start(&mut self, _regime: RegimeKind, _generation: u64) {}
        fn on_generation_complete(&mut self, _stats: &GenerationStats) {
            self.completed += 1;
        }
        fn on_candidate_evaluated(&mut self, _evaluated: usize, _total: usize) {}
    }

    #[test]
    fn test_run_honors_cancel() {
        let engine = small_engine();
        let cancel = AtomicBool::new(true);
        let mut counter = Counter { completed: 0 };
        let outcome = engine.run(
            Population::new(RegimeKind::Trending.config()),
            3,
            &mut StdRng::seed_from_u64(3),
            &mut counter,
            &cancel,
        );

        assert_eq!(counter.completed, 0);
        assert!(outcome.new_candidates.is_empty());
    }

    #[test]
    fn test_rejected_designs_are_regenerated_and_counted() {
        let engine = small_engine();
        let regime = RegimeKind::LowVolatility.config();
        let mut rng = StdRng::seed_from_u64(4);
        let template = engine
            .evaluator
            .build_candidate(LiquidityVector::uniform(), &regime, 1, Provenance::evolutionary(), &mut rng)
            .unwrap();

        // Every other design in the first round comes back non-finite
        let mut round = 0;
        let mut drawn = 0;
        let (children, discarded) = regenerate(
            6,
            engine.config.max_regeneration_attempts,
            |r: &mut StdRng| {
                drawn += 1;
                LiquidityVector::random(r)
            },
            |batch, _r: &mut StdRng| {
                round += 1;
                let first_round = round == 1;
                batch
                    .into_iter()
                    .enumerate()
                    .map(|(i, _)| (!first_round || i % 2 == 0).then(|| template.clone()))
                    .collect()
            },
            &mut rng,
        );

        assert_eq!(children.len(), 6);
        assert_eq!(discarded, 3);
        assert_eq!(drawn, 9);
        assert_eq!(round, 2);

        let population = Population::new(regime);
        let next = engine.assemble(&population, 0, Vec::new(), children, discarded);
        let stats = next.last_stats().unwrap();
        assert_eq!(stats.discarded, 3);
        assert_eq!(stats.population_size, 6);
        assert!(next.members.iter().all(|m| m.score.is_finite() && m.metrics.is_finite()));
    }

    #[test]
    fn test_regeneration_gives_up_after_attempts() {
        let mut rng = StdRng::seed_from_u64(5);
        let (children, discarded) = regenerate(
            4,
            3,
            |r: &mut StdRng| LiquidityVector::random(r),
            |batch, _r: &mut StdRng| batch.into_iter().map(|_| None).collect(),
            &mut rng,
        );

        assert!(children.is_empty());
        assert_eq!(discarded, 12);
    }
}
