use curvelab::config::{EvolutionConfig, SimulationConfig};
use curvelab::engines::evaluation::CandidateEvaluator;
use curvelab::engines::generation::pareto::{directions, dominates, extract_objectives};
use curvelab::engines::generation::{pareto_front, EvolutionEngine, Population, FRONT_OBJECTIVES};
use curvelab::engines::scoring::Scorer;
use curvelab::engines::simulation::Simulator;
use curvelab::liquidity::LiquidityVector;
use curvelab::types::{RegimeKind, TOTAL_LIQUIDITY};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn engine() -> EvolutionEngine {
    let evaluator = CandidateEvaluator::new(
        Simulator::new(SimulationConfig {
            steps: 40,
            path_count: 4,
            eval_path_count: 2,
            ..SimulationConfig::default()
        }),
        Scorer::default(),
    );
    EvolutionEngine::new(
        EvolutionConfig {
            population_size: 10,
            elite_count: 3,
            max_front_retained: 3,
            ..EvolutionConfig::default()
        },
        evaluator,
    )
}

#[test]
fn champion_is_never_evicted_and_never_worsens() {
    let engine = engine();
    let mut rng = StdRng::seed_from_u64(11);
    let mut population = Population::new(RegimeKind::JumpDiffusion.config());
    let mut best_so_far = f64::INFINITY;

    for _ in 0..5 {
        population = engine.run_generation(&population, &mut rng).population;
        let champion = population.champion.clone().expect("seeded population has a champion");

        assert!(champion.score <= best_so_far);
        best_so_far = champion.score;
        assert!(population.members.iter().any(|m| m.id == champion.id));
        assert!(population.members.iter().all(|m| m.score >= champion.score));
    }

    assert_eq!(population.generation, 4);
    assert_eq!(population.history.len(), 5);
    assert!(!population.champion_history.is_empty());
}

#[test]
fn population_front_is_non_dominated() {
    let engine = engine();
    let mut rng = StdRng::seed_from_u64(12);
    let seeded = engine.run_generation(&Population::new(RegimeKind::HighVolatility.config()), &mut rng);
    let population = engine.run_generation(&seeded.population, &mut rng).population;

    let dirs = directions(&FRONT_OBJECTIVES);
    for member in &population.front {
        let mine = extract_objectives(&member.metrics, &FRONT_OBJECTIVES);
        for other in &population.members {
            let theirs = extract_objectives(&other.metrics, &FRONT_OBJECTIVES);
            assert!(!dominates(&theirs, &mine, &dirs), "{} dominated by {}", member.id, other.id);
        }
    }
}

#[test]
fn pareto_front_of_archive_candidates() {
    let engine = engine();
    let outcome = engine.run_generation(
        &Population::new(RegimeKind::LowVolatility.config()),
        &mut StdRng::seed_from_u64(13),
    );
    let candidates = outcome.new_candidates;
    let front = pareto_front(&candidates);

    assert!(!front.is_empty());
    let dirs = directions(&FRONT_OBJECTIVES);
    for member in &front {
        let mine = extract_objectives(&member.metrics, &FRONT_OBJECTIVES);
        assert!(candidates
            .iter()
            .all(|c| !dominates(&extract_objectives(&c.metrics, &FRONT_OBJECTIVES), &mine, &dirs)));
    }
    // Anything left out is dominated by someone
    for candidate in candidates.iter().filter(|c| !front.iter().any(|f| f.id == c.id)) {
        let mine = extract_objectives(&candidate.metrics, &FRONT_OBJECTIVES);
        assert!(candidates
            .iter()
            .any(|c| dominates(&extract_objectives(&c.metrics, &FRONT_OBJECTIVES), &mine, &dirs)));
    }
}

#[test]
fn normalization_is_idempotent_after_mutation() {
    let mut rng = StdRng::seed_from_u64(14);
    let mut bins = LiquidityVector::random(&mut rng);

    for _ in 0..50 {
        bins = bins.mutate(0.9, &mut rng);
        assert!((bins.total() - TOTAL_LIQUIDITY).abs() < 1e-9);
        assert!(bins.weights().iter().all(|w| *w >= 0.0 && w.is_finite()));

        let mut once = bins.clone();
        once.normalize().unwrap();
        let mut twice = once.clone();
        twice.normalize().unwrap();
        assert_eq!(once, twice);
    }
}

#[test]
fn generations_are_reproducible_for_a_seed() {
    let engine = engine();
    let population = Population::new(RegimeKind::Trending.config());

    let a = engine.run_generation(&population, &mut StdRng::seed_from_u64(15));
    let b = engine.run_generation(&population, &mut StdRng::seed_from_u64(15));

    let scores = |p: &Population| p.members.iter().map(|m| m.score).collect::<Vec<_>>();
    assert_eq!(scores(&a.population), scores(&b.population));
}
