pub mod engine;
pub mod features;
pub mod risk;

pub use engine::MetricsEngine;
pub use features::compute_features;
pub use risk::RiskMetrics;
