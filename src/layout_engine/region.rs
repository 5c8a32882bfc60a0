//! Derivation of pixel rectangles from tree structure.
//!
//! Everything here is a pure function of its inputs; the tree calls into it
//! whenever a ratio, an axis or the root rectangle changes.

use serde::{Deserialize, Serialize};

use crate::layout_engine::Split;
use crate::sys::geometry::{Rect, Round};
use crate::sys::screen::{Display, Dock, DockPosition, MenuBar};

/// How a region was derived from its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionType {
    #[default]
    Full,
    Left,
    Right,
    Upper,
    Lower,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub rect: Rect,
    pub kind: RegionType,
}

impl Region {
    pub const fn full(rect: Rect) -> Self {
        Self {
            rect,
            kind: RegionType::Full,
        }
    }
}

/// Which child of a split a region is computed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

/// Edge offsets applied inside the usable display area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Padding {
    pub fn uniform(amount: f64) -> Self {
        Self {
            top: amount,
            bottom: amount,
            left: amount,
            right: amount,
        }
    }

    /// Grows (or shrinks, for a negative `delta`) every edge, never below 0.
    pub fn adjusted(self, delta: f64) -> Self {
        Self {
            top: (self.top + delta).max(0.0),
            bottom: (self.bottom + delta).max(0.0),
            left: (self.left + delta).max(0.0),
            right: (self.right + delta).max(0.0),
        }
    }
}

/// Screen furniture that reduces the area available for tiling.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenInsets {
    pub menu_bar: MenuBar,
    pub dock: Dock,
    /// Space reserved by an external status bar at the top / bottom.
    pub status_bar_top: f64,
    pub status_bar_bottom: f64,
}

/// The display's usable rectangle: bounds minus menu bar, dock and status
/// bar insets, further shrunk by the space padding.
pub fn fullscreen_region(display: &Display, insets: &ScreenInsets, padding: &Padding) -> Region {
    let mut top = insets.status_bar_top;
    let mut bottom = insets.status_bar_bottom;
    let mut left = 0.0;
    let mut right = 0.0;

    if display.is_main && !insets.menu_bar.autohide {
        top += insets.menu_bar.height;
    }

    let dock = &insets.dock;
    let dock_here = dock.display.map_or(display.is_main, |d| d == display.id);
    if dock_here && !dock.autohide {
        match dock.position {
            DockPosition::Left => left += dock.size,
            DockPosition::Bottom => bottom += dock.size,
            DockPosition::Right => right += dock.size,
        }
    }

    let usable = display.frame.inset(top, left, bottom, right);
    Region::full(usable.inset(padding.top, padding.left, padding.bottom, padding.right))
}

/// Rectangle of one child of a split. The two children of the same parent
/// are separated by exactly `gap`, and together with that gap they cover the
/// parent.
pub fn child_region(parent: &Rect, ratio: f64, split: Split, side: Side, gap: f64) -> Region {
    let half_gap = gap / 2.0;
    match (split, side) {
        (Split::Horizontal, Side::First) => {
            let height = (parent.size.height * ratio - half_gap).max(0.0);
            Region {
                rect: Rect::from_xywh(parent.origin.x, parent.origin.y, parent.size.width, height),
                kind: RegionType::Upper,
            }
        }
        (Split::Horizontal, Side::Second) => {
            let split_at = parent.size.height * ratio;
            let height = (parent.size.height - split_at - half_gap).max(0.0);
            Region {
                rect: Rect::from_xywh(
                    parent.origin.x,
                    parent.origin.y + split_at + half_gap,
                    parent.size.width,
                    height,
                ),
                kind: RegionType::Lower,
            }
        }
        // Optimal is resolved before regions are derived; treat a stray one
        // as vertical.
        (Split::Vertical | Split::Optimal, Side::First) => {
            let width = (parent.size.width * ratio - half_gap).max(0.0);
            Region {
                rect: Rect::from_xywh(parent.origin.x, parent.origin.y, width, parent.size.height),
                kind: RegionType::Left,
            }
        }
        (Split::Vertical | Split::Optimal, Side::Second) => {
            let split_at = parent.size.width * ratio;
            let width = (parent.size.width - split_at - half_gap).max(0.0);
            Region {
                rect: Rect::from_xywh(
                    parent.origin.x + split_at + half_gap,
                    parent.origin.y,
                    width,
                    parent.size.height,
                ),
                kind: RegionType::Right,
            }
        }
    }
}

/// Frame actually pushed to a window. Sub-pixel positions are rounded so that
/// repeated layouts do not jitter.
pub fn window_frame(region: &Region) -> Rect { region.rect.round() }
