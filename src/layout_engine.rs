pub mod binary_tree;
pub(crate) mod graph;
pub mod region;
pub mod resize;
pub mod serialize;

pub use binary_tree::{BspTree, NodeId, NodeKind, Rotation, SpawnPosition, SplitSettings, Zoom};
pub use graph::{Direction, SpaceMode, Split};
pub use region::{Padding, Region, RegionType, ScreenInsets};
pub use resize::{RatioAdjustment, ResizeCorner};
pub use serialize::LayoutFileError;

/// Aspect-ratio threshold used when a pending optimal split is resolved
/// outside of insertion.
pub const DEFAULT_OPTIMAL_RATIO: f64 = 1.618;
