pub mod explorer;

pub use explorer::{AutoExplorer, ExploreMode, ExplorerUpdate};
