pub mod scorer;

pub use scorer::{score_candidate, Scorer, AXIS_COUNT, WORST_SCORE};
