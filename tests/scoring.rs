use curvelab::config::ScoringConfig;
use curvelab::engines::scoring::{score_candidate, Scorer, AXIS_COUNT};
use curvelab::types::MetricVector;

/// Metrics whose normalized axes are `x` everywhere except LP/HODL, which maps to `lp_axis`.
fn metrics_for_axes(x: f64, lp_axis: f64) -> MetricVector {
    let refs = ScoringConfig::default().references;
    let high = |reference: f64| reference * x / (1.0 - x);
    MetricVector {
        fees: refs.fees * (1.0 - x) / x,
        slippage: high(refs.slippage),
        arb_leakage: high(refs.arb_leakage),
        utilization: 1.0 - x,
        lp_hodl: 1.0 + refs.lp_hodl_scale * ((1.0 - lp_axis) / lp_axis).ln(),
        max_drawdown: high(refs.max_drawdown),
        return_volatility: high(refs.return_volatility),
    }
}

#[test]
fn balanced_axes_beat_specialist_at_equal_weighted_sum() {
    let scorer = Scorer::default();
    let balanced = [0.4; AXIS_COUNT];
    let mut specialist = [0.4 / 0.75; AXIS_COUNT];
    specialist[4] = 0.0;

    assert!((scorer.weighted_sum(&balanced) - scorer.weighted_sum(&specialist)).abs() < 1e-12);
    assert!(scorer.combine(&balanced, 0.0) < scorer.combine(&specialist, 0.0));
}

#[test]
fn balanced_metrics_beat_specialist_with_same_headline() {
    let scorer = Scorer::default();
    let balanced = metrics_for_axes(0.5, 0.5);
    let specialist = metrics_for_axes((0.5 - 0.25 * 0.1) / 0.75, 0.1);

    let balanced_axes = scorer.normalize(&balanced);
    let specialist_axes = scorer.normalize(&specialist);
    assert!((specialist_axes[4] - 0.1).abs() < 1e-9);
    assert!((scorer.weighted_sum(&balanced_axes) - scorer.weighted_sum(&specialist_axes)).abs() < 1e-9);
    assert!(specialist.lp_hodl > balanced.lp_hodl);

    assert!(score_candidate(&balanced, 0.0) < score_candidate(&specialist, 0.0));
}

#[test]
fn specialist_loses_even_when_linear_sum_favors_it() {
    let scorer = Scorer::default();
    let balanced = [0.45; AXIS_COUNT];
    let mut specialist = [0.55; AXIS_COUNT];
    specialist[4] = 0.0;

    assert!(scorer.weighted_sum(&specialist) < scorer.weighted_sum(&balanced));
    assert!(scorer.combine(&balanced, 0.0) < scorer.combine(&specialist, 0.0));
}

#[test]
fn score_is_finite_and_ordered_for_extreme_inputs() {
    let extreme = MetricVector {
        fees: 1e12,
        slippage: 0.0,
        arb_leakage: 1e12,
        utilization: 2.0,
        lp_hodl: 50.0,
        max_drawdown: 1.0,
        return_volatility: 1e6,
    };
    let score = score_candidate(&extreme, 1e3);
    assert!(score.is_finite());
}
