pub mod archive;
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod liquidity;
pub mod services;
pub mod types;

pub use archive::{Archive, CandidateRecord, Mechanism};
pub use engine::{DiscoveryEngine, EngineState};
pub use error::{CurveLabError, Result};
pub use types::{Candidate, FeatureVector, MetricVector, RegimeConfig, RegimeKind};
