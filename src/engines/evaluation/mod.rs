pub mod evaluator;

pub use evaluator::{CandidateEvaluator, Evaluation};
