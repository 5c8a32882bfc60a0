use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

/// Opaque handle for one (monitor, desktop) pairing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SpaceId(NonZeroU64);

impl SpaceId {
    pub fn new(id: u64) -> SpaceId { SpaceId(NonZeroU64::new(id).expect("space id 0 is reserved")) }

    pub fn try_new(id: u64) -> Option<SpaceId> { NonZeroU64::new(id).map(SpaceId) }

    pub fn get(&self) -> u64 { self.0.get() }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.get()) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisplayId(pub u32);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Display {
    pub id: DisplayId,
    /// Full bounds in global coordinates.
    pub frame: Rect,
    /// The display that carries the menu bar.
    pub is_main: bool,
}

/// A space as reported by the window server, together with the information
/// needed to key per-desktop configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceInfo {
    pub id: SpaceId,
    pub display: DisplayId,
    /// 1-based desktop index, used for `"<n>_<name>"` configuration keys.
    pub desktop_index: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuBar {
    pub autohide: bool,
    pub height: f64,
}

impl Default for MenuBar {
    fn default() -> Self {
        Self {
            autohide: false,
            height: 22.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockPosition {
    Left,
    #[default]
    Bottom,
    Right,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dock {
    pub autohide: bool,
    pub position: DockPosition,
    /// Thickness of the dock measured from its screen edge.
    pub size: f64,
    pub display: Option<DisplayId>,
}

/// Orders displays left to right, then top to bottom. Monitor indices used by
/// commands refer to this order.
pub fn order_displays_by_position(displays: &mut [Display]) {
    displays.sort_by(|a, b| {
        a.frame
            .min_x()
            .total_cmp(&b.frame.min_x())
            .then(a.frame.min_y().total_cmp(&b.frame.min_y()))
    });
}
