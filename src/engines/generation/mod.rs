pub mod evolution_engine;
pub mod operators;
pub mod pareto;
pub mod progress;

pub use evolution_engine::{
    EvolutionEngine, GenerationOutcome, GenerationStats, Population, ProgressCallback,
};
pub use pareto::{crowded_selection, pareto_front, MetricAxis, OptimizationDirection, FRONT_OBJECTIVES};
pub use progress::{ChannelProgressCallback, LogProgressCallback, ProgressMessage};
