use curvelab::archive::{
    candidate_to_mechanism, mechanism_from_json, mechanism_to_candidate, mechanism_to_json,
    CandidateRecord,
};
use curvelab::config::SimulationConfig;
use curvelab::engines::evaluation::CandidateEvaluator;
use curvelab::engines::metrics::compute_features;
use curvelab::engines::scoring::Scorer;
use curvelab::engines::simulation::Simulator;
use curvelab::liquidity::ShapeTemplate;
use curvelab::types::{Candidate, Provenance, RegimeKind, NUM_BINS};
use curvelab::CurveLabError;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn evaluated_candidate(seed: u64) -> Candidate {
    let evaluator = CandidateEvaluator::new(
        Simulator::new(SimulationConfig {
            steps: 30,
            path_count: 4,
            eval_path_count: 2,
            ..SimulationConfig::default()
        }),
        Scorer::default(),
    );
    let bins = ShapeTemplate::Skewed {
        center: 0.1,
        left_width: 0.3,
        right_width: 0.7,
    }
    .build();
    evaluator
        .build_candidate(
            bins,
            &RegimeKind::JumpDiffusion.config(),
            7,
            Provenance::allocator("clmm-skewed-adaptive"),
            &mut StdRng::seed_from_u64(seed),
        )
        .expect("finite evaluation")
}

#[test]
fn candidate_survives_mechanism_roundtrip() {
    let candidate = evaluated_candidate(31);
    let mechanism = candidate_to_mechanism(&candidate);
    let back = mechanism_to_candidate(&mechanism, &candidate.regime, candidate.generation).unwrap();

    assert_eq!(back, candidate);
}

#[test]
fn candidate_survives_mechanism_json_roundtrip() {
    let candidate = evaluated_candidate(32);
    let json = mechanism_to_json(&candidate_to_mechanism(&candidate)).unwrap();
    let mechanism = mechanism_from_json(&json).unwrap();
    let back = mechanism_to_candidate(&mechanism, &candidate.regime, candidate.generation).unwrap();

    assert_eq!(back.bins, candidate.bins);
    assert_eq!(back.metrics, candidate.metrics);
    assert_eq!(back.features, candidate.features);
    assert_eq!(back, candidate);
}

#[test]
fn exported_record_roundtrips_through_mechanism() {
    let candidate = evaluated_candidate(33);
    let record_json = serde_json::to_string(&CandidateRecord::from(&candidate)).unwrap();
    let record: CandidateRecord = serde_json::from_str(&record_json).unwrap();
    let restored = record.to_candidate().unwrap();

    let back = mechanism_to_candidate(&candidate_to_mechanism(&restored), &restored.regime, restored.generation)
        .unwrap();
    assert_eq!(back, candidate);
    assert_eq!(record.evaluation.bin_count, NUM_BINS);
}

#[test]
fn features_are_recomputed_not_trusted() {
    let candidate = evaluated_candidate(34);
    let mut mechanism = candidate_to_mechanism(&candidate);
    mechanism
        .extra
        .insert("features".to_string(), serde_json::json!({"entropy": 0.0}));

    let back = mechanism_to_candidate(&mechanism, &candidate.regime, candidate.generation).unwrap();
    assert_eq!(back.features, compute_features(&candidate.bins));
}

#[test]
fn malformed_imports_are_rejected() {
    assert!(matches!(
        mechanism_from_json("{not json"),
        Err(CurveLabError::InvalidMechanism(_))
    ));

    let short = format!(
        r#"{{"origin": "sketch", "bins": {:?}, "metrics": {}}}"#,
        vec![1.0; 8],
        serde_json::to_string(&evaluated_candidate(35).metrics).unwrap()
    );
    let mechanism = mechanism_from_json(&short).unwrap();
    assert!(matches!(
        mechanism_to_candidate(&mechanism, &RegimeKind::LowVolatility.config(), 0),
        Err(CurveLabError::InvalidMechanism(_))
    ));

    let zeros = format!(
        r#"{{"origin": "sketch", "bins": {:?}, "metrics": {}}}"#,
        vec![0.0; NUM_BINS],
        serde_json::to_string(&evaluated_candidate(36).metrics).unwrap()
    );
    let mechanism = mechanism_from_json(&zeros).unwrap();
    assert!(mechanism_to_candidate(&mechanism, &RegimeKind::LowVolatility.config(), 0).is_err());
}
