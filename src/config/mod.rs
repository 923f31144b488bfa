pub mod traits;
pub mod simulation;
pub mod scoring;
pub mod evolution;
pub mod allocator;
pub mod engine;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use simulation::SimulationConfig;
pub use scoring::{ScoringConfig, AxisWeights, NormalizationRefs};
pub use evolution::EvolutionConfig;
pub use allocator::AllocatorConfig;
pub use engine::EngineConfig;
pub use traits::{ConfigSection, ConfigManifest, FieldManifest};
