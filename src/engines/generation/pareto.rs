/// Pareto optimization utilities for multi-objective evolution
/// Implements NSGA-II style fast non-dominated sorting and crowding distance

use crate::types::{Candidate, MetricVector};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Defines whether a metric should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationDirection {
    Maximize,
    Minimize,
}

/// One field of the metric vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricAxis {
    Fees,
    Slippage,
    ArbLeakage,
    Utilization,
    LpHodl,
    MaxDrawdown,
    ReturnVolatility,
}

impl MetricAxis {
    pub fn value(&self, metrics: &MetricVector) -> f64 {
        match self {
            MetricAxis::Fees => metrics.fees,
            MetricAxis::Slippage => metrics.slippage,
            MetricAxis::ArbLeakage => metrics.arb_leakage,
            MetricAxis::Utilization => metrics.utilization,
            MetricAxis::LpHodl => metrics.lp_hodl,
            MetricAxis::MaxDrawdown => metrics.max_drawdown,
            MetricAxis::ReturnVolatility => metrics.return_volatility,
        }
    }

    pub fn direction(&self) -> OptimizationDirection {
        match self {
            MetricAxis::Fees | MetricAxis::Utilization | MetricAxis::LpHodl => {
                OptimizationDirection::Maximize
            }
            _ => OptimizationDirection::Minimize,
        }
    }
}

/// Objectives spanning the population front: LP/HODL up, slippage and drawdown down
pub const FRONT_OBJECTIVES: [MetricAxis; 3] =
    [MetricAxis::LpHodl, MetricAxis::Slippage, MetricAxis::MaxDrawdown];

/// Individual with multiple objective values
#[derive(Debug, Clone)]
pub struct MultiObjectiveIndividual<T> {
    pub data: T,
    pub objectives: Vec<f64>,
    pub rank: usize,           // Pareto rank (0 = best frontier)
    pub crowding_distance: f64, // Isolation within its front
}

impl<T> MultiObjectiveIndividual<T> {
    pub fn new(data: T, objectives: Vec<f64>) -> Self {
        Self {
            data,
            objectives,
            rank: 0,
            crowding_distance: 0.0,
        }
    }
}

/// Check if individual A dominates individual B
/// A dominates B if A is no worse than B in all objectives and strictly better in at least one
pub fn dominates(
    a_objectives: &[f64],
    b_objectives: &[f64],
    directions: &[OptimizationDirection],
) -> bool {
    if a_objectives.len() != b_objectives.len() || a_objectives.len() != directions.len() {
        return false;
    }

    let mut at_least_one_better = false;

    for i in 0..a_objectives.len() {
        let a_val = a_objectives[i];
        let b_val = b_objectives[i];

        let (a_better, b_better) = match directions[i] {
            OptimizationDirection::Maximize => (a_val > b_val, b_val > a_val),
            OptimizationDirection::Minimize => (a_val < b_val, b_val < a_val),
        };

        if b_better {
            return false;
        }

        if a_better {
            at_least_one_better = true;
        }
    }

    at_least_one_better
}

/// Fast non-dominated sorting (NSGA-II algorithm)
/// Returns individuals grouped by Pareto front (0 = best, 1 = second best, etc.)
pub fn fast_non_dominated_sort<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    directions: &[OptimizationDirection],
) -> Vec<Vec<usize>> {
    let n = individuals.len();
    if n == 0 {
        return Vec::new();
    }

    let mut domination_count = vec![0usize; n];
    let mut dominated_solutions: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut first_front = Vec::new();

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }

            if dominates(&individuals[i].objectives, &individuals[j].objectives, directions) {
                dominated_solutions[i].push(j);
            } else if dominates(&individuals[j].objectives, &individuals[i].objectives, directions) {
                domination_count[i] += 1;
            }
        }

        if domination_count[i] == 0 {
            individuals[i].rank = 0;
            first_front.push(i);
        }
    }

    fronts.push(first_front);

    let mut front_index = 0;
    while front_index < fronts.len() && !fronts[front_index].is_empty() {
        let mut next_front = Vec::new();

        for &i in &fronts[front_index] {
            for &j in &dominated_solutions[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    individuals[j].rank = front_index + 1;
                    next_front.push(j);
                }
            }
        }

        if !next_front.is_empty() {
            fronts.push(next_front);
        }
        front_index += 1;
    }

    fronts
}

/// Calculate crowding distance for individuals in a front
/// Higher values indicate more isolated individuals
pub fn calculate_crowding_distance<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    front_indices: &[usize],
) {
    let front_size = front_indices.len();
    if front_size == 0 {
        return;
    }

    if front_size <= 2 {
        for &idx in front_indices {
            individuals[idx].crowding_distance = f64::INFINITY;
        }
        return;
    }

    let num_objectives = individuals[front_indices[0]].objectives.len();

    for &idx in front_indices {
        individuals[idx].crowding_distance = 0.0;
    }

    for obj in 0..num_objectives {
        let mut sorted_indices: Vec<usize> = front_indices.to_vec();
        sorted_indices.sort_by(|&a, &b| {
            individuals[a].objectives[obj].total_cmp(&individuals[b].objectives[obj])
        });

        individuals[sorted_indices[0]].crowding_distance = f64::INFINITY;
        individuals[sorted_indices[front_size - 1]].crowding_distance = f64::INFINITY;

        let min_val = individuals[sorted_indices[0]].objectives[obj];
        let max_val = individuals[sorted_indices[front_size - 1]].objectives[obj];
        let range = max_val - min_val;

        if range.abs() < 1e-10 {
            continue;
        }

        for i in 1..(front_size - 1) {
            let idx = sorted_indices[i];
            let prev_val = individuals[sorted_indices[i - 1]].objectives[obj];
            let next_val = individuals[sorted_indices[i + 1]].objectives[obj];

            individuals[idx].crowding_distance += (next_val - prev_val) / range;
        }
    }
}

pub fn extract_objectives(metrics: &MetricVector, axes: &[MetricAxis]) -> Vec<f64> {
    axes.iter().map(|axis| axis.value(metrics)).collect()
}

pub fn directions(axes: &[MetricAxis]) -> Vec<OptimizationDirection> {
    axes.iter().map(|axis| axis.direction()).collect()
}

/// Candidates not dominated on {LP/HODL, slippage, drawdown} by any other input.
/// Input order is preserved.
pub fn pareto_front(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut individuals: Vec<MultiObjectiveIndividual<usize>> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| MultiObjectiveIndividual::new(i, extract_objectives(&c.metrics, &FRONT_OBJECTIVES)))
        .collect();

    let fronts = fast_non_dominated_sort(&mut individuals, &directions(&FRONT_OBJECTIVES));
    let mut first: Vec<usize> = fronts
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|i| individuals[i].data)
        .collect();
    first.sort_unstable();

    first.into_iter().map(|i| candidates[i].clone()).collect()
}

/// Crowded comparison: lower rank wins, then the more isolated individual.
pub fn crowded_comparison<T>(
    a: &MultiObjectiveIndividual<T>,
    b: &MultiObjectiveIndividual<T>,
) -> Ordering {
    a.rank
        .cmp(&b.rank)
        .then_with(|| b.crowding_distance.total_cmp(&a.crowding_distance))
}

/// Ranks and crowds every individual, then returns their indices best first.
/// Ties keep input order.
pub fn crowded_order<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    directions: &[OptimizationDirection],
) -> Vec<usize> {
    let fronts = fast_non_dominated_sort(individuals, directions);
    for front in &fronts {
        calculate_crowding_distance(individuals, front);
    }

    let mut order: Vec<usize> = (0..individuals.len()).collect();
    order.sort_by(|&a, &b| crowded_comparison(&individuals[a], &individuals[b]).then(a.cmp(&b)));
    order
}

/// Up to `limit` candidates in crowded order over the front objectives, so a
/// capped front keeps its spread instead of its best-scored corner.
pub fn crowded_selection(candidates: &[Candidate], limit: usize) -> Vec<Candidate> {
    let mut individuals: Vec<MultiObjectiveIndividual<usize>> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| MultiObjectiveIndividual::new(i, extract_objectives(&c.metrics, &FRONT_OBJECTIVES)))
        .collect();

    crowded_order(&mut individuals, &directions(&FRONT_OBJECTIVES))
        .into_iter()
        .take(limit)
        .map(|i| candidates[individuals[i].data].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominance_maximize() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Maximize];

        assert!(dominates(&[10.0, 20.0], &[5.0, 10.0], &directions));
        assert!(dominates(&[10.0, 20.0], &[10.0, 10.0], &directions));
        assert!(!dominates(&[10.0, 5.0], &[5.0, 10.0], &directions));
        assert!(!dominates(&[10.0, 20.0], &[10.0, 20.0], &directions));
    }

    #[test]
    fn test_dominance_mixed() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Minimize];

        assert!(dominates(&[10.0, 5.0], &[5.0, 10.0], &directions));
        assert!(!dominates(&[10.0, 15.0], &[5.0, 10.0], &directions));
    }

    #[test]
    fn test_fast_non_dominated_sort() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Maximize];

        let mut individuals = vec![
            MultiObjectiveIndividual::new(0, vec![1.0, 5.0]),
            MultiObjectiveIndividual::new(1, vec![3.0, 3.0]),
            MultiObjectiveIndividual::new(2, vec![5.0, 1.0]),
            MultiObjectiveIndividual::new(3, vec![2.0, 2.0]),
            MultiObjectiveIndividual::new(4, vec![1.0, 1.0]),
        ];

        let fronts = fast_non_dominated_sort(&mut individuals, &directions);

        assert_eq!(fronts.len(), 3);
        assert_eq!(fronts[0].len(), 3);
        assert_eq!(individuals[3].rank, 1);
        assert_eq!(individuals[4].rank, 2);
    }

    #[test]
    fn test_crowding_distance_boundaries() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Maximize];

        let mut individuals = vec![
            MultiObjectiveIndividual::new(0, vec![1.0, 5.0]),
            MultiObjectiveIndividual::new(1, vec![3.0, 3.0]),
            MultiObjectiveIndividual::new(2, vec![5.0, 1.0]),
        ];

        let fronts = fast_non_dominated_sort(&mut individuals, &directions);
        calculate_crowding_distance(&mut individuals, &fronts[0]);

        assert!(individuals[0].crowding_distance.is_infinite());
        assert!(individuals[2].crowding_distance.is_infinite());
        assert!(individuals[1].crowding_distance.is_finite());
    }

    #[test]
    fn test_empty_sort() {
        let mut individuals: Vec<MultiObjectiveIndividual<usize>> = Vec::new();
        assert!(fast_non_dominated_sort(&mut individuals, &[]).is_empty());
    }

    #[test]
    fn test_crowded_order_prefers_extremes_then_isolation() {
        let directions = vec![OptimizationDirection::Maximize, OptimizationDirection::Maximize];

        let mut individuals = vec![
            MultiObjectiveIndividual::new(0, vec![1.0, 5.0]),
            MultiObjectiveIndividual::new(1, vec![2.0, 4.0]),
            MultiObjectiveIndividual::new(2, vec![2.2, 3.8]),
            MultiObjectiveIndividual::new(3, vec![5.0, 1.0]),
            MultiObjectiveIndividual::new(4, vec![1.0, 1.0]),
        ];

        let order = crowded_order(&mut individuals, &directions);

        assert_eq!(order, vec![0, 3, 2, 1, 4]);
        assert!((individuals[1].crowding_distance - 0.6).abs() < 1e-12);
        assert!((individuals[2].crowding_distance - 1.5).abs() < 1e-12);
        assert_eq!(individuals[4].rank, 1);
        assert_eq!(crowded_comparison(&individuals[2], &individuals[1]), Ordering::Less);
    }
}
