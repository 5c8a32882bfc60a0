pub mod registry;
pub mod rules;
pub mod virtual_space;

pub use registry::{SpaceGuard, SpaceRegistry};
pub use rules::{RuleAction, RuleError, RuleSet, WindowRule};
pub use virtual_space::{
    InsertionPoint, Preselection, PreselectionKind, SpaceConfig, SpaceFlags, VirtualSpace,
};
