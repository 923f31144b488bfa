pub mod simulation;
pub mod metrics;
pub mod scoring;
pub mod evaluation;
pub mod generation;
pub mod allocator;
