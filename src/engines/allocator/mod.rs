pub mod allocator;
pub mod branch;
pub mod families;
pub mod priority;

pub use allocator::{AllocationOutcome, BranchAllocator, ExplorationEvent};
pub use branch::{BatchResult, Branch, ExplorationPhase, Trend};
pub use families::{BranchCoordinate, FeeFamily, InvariantFamily, LiquidityFamily};
pub use priority::{branch_priority, select_branch, thompson_draw, PriorityBreakdown};
