use crate::liquidity::{LiquidityVector, ShapeTemplate};
use crate::types::Candidate;
use rand::Rng;

/// Tournament selection: pick the lowest score of K random members
pub fn tournament_selection<'a, R: Rng + ?Sized>(
    population: &'a [Candidate],
    tournament_size: usize,
    rng: &mut R,
) -> Option<&'a Candidate> {
    if population.is_empty() {
        return None;
    }

    let mut best_idx = rng.gen_range(0..population.len());

    for _ in 1..tournament_size.max(1) {
        let idx = rng.gen_range(0..population.len());
        if population[idx].score < population[best_idx].score {
            best_idx = idx;
        }
    }

    Some(&population[best_idx])
}

/// Single-point crossover on bin weights, re-normalized. Falls back to the first
/// parent if the spliced vector cannot be normalized.
pub fn crossover<R: Rng + ?Sized>(
    parent1: &LiquidityVector,
    parent2: &LiquidityVector,
    rng: &mut R,
) -> LiquidityVector {
    let len = parent1.len().min(parent2.len());
    if len <= 1 {
        return parent1.clone();
    }

    let point = rng.gen_range(1..len);

    let mut weights = parent1.weights().to_vec();
    weights[point..len].copy_from_slice(&parent2.weights()[point..len]);

    LiquidityVector::from_weights(weights).unwrap_or_else(|_| parent1.clone())
}

/// Bounded multiplicative noise, re-normalized
pub fn mutate_bins<R: Rng + ?Sized>(
    bins: &LiquidityVector,
    intensity: f64,
    rng: &mut R,
) -> LiquidityVector {
    bins.mutate(intensity, rng)
}

/// Fresh design for an empty population slot: a randomized shape template with
/// probability `template_ratio`, independent noise otherwise.
pub fn random_design<R: Rng + ?Sized>(template_ratio: f64, rng: &mut R) -> LiquidityVector {
    if rng.gen::<f64>() < template_ratio {
        ShapeTemplate::random(rng).build()
    } else {
        LiquidityVector::random(rng)
    }
}
