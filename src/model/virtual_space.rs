use std::path::{Path, PathBuf};
use std::str::FromStr;

use bitflags::bitflags;
use tracing::{debug, trace, warn};

use crate::common::collections::BTreeSet;
use crate::common::config::layouts_dir;
use crate::common::store::{self, ConfigStore};
use crate::layout_engine::region::fullscreen_region;
use crate::layout_engine::serialize::{load_layout, save_layout};
use crate::layout_engine::{
    BspTree, DEFAULT_OPTIMAL_RATIO, Direction, LayoutFileError, NodeId, Padding, Region, ScreenInsets, SpaceMode,
    SpawnPosition, SplitSettings,
};
use crate::sys::geometry::Rect;
use crate::sys::screen::{Display, SpaceId, SpaceInfo};
use crate::sys::window_server::WindowId;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SpaceFlags: u8 {
        /// Regions are stale and must be recomputed before the next layout.
        const NEEDS_RECOMPUTE = 1 << 0;
        /// Padding is ignored until toggled back on.
        const OFFSETS_DISABLED = 1 << 1;
        /// Existing windows have been tiled in once.
        const INITIALIZED = 1 << 2;
    }
}

/// Per-space settings resolved from the config store when the space is
/// first seen.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceConfig {
    pub mode: SpaceMode,
    pub padding: Padding,
    pub gap: f64,
    pub layout: Option<PathBuf>,
    /// Threshold for `optimal` splits in a restored layout.
    pub optimal_ratio: f64,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            mode: SpaceMode::Bsp,
            padding: Padding::default(),
            gap: 0.0,
            layout: None,
            optimal_ratio: DEFAULT_OPTIMAL_RATIO,
        }
    }
}

impl SpaceConfig {
    pub fn resolve(store: &ConfigStore, desktop_index: usize) -> Self {
        let float = |name: &str| store.resolve_float(desktop_index, name).unwrap_or(0.0);
        let mode = match store.resolve_string(desktop_index, store::MODE) {
            Some(raw) => SpaceMode::from_str(&raw).unwrap_or_else(|_| {
                warn!(desktop_index, mode = %raw, "unknown space mode, using bsp");
                SpaceMode::Bsp
            }),
            None => SpaceMode::Bsp,
        };
        Self {
            mode,
            padding: Padding {
                top: float(store::PADDING_TOP),
                bottom: float(store::PADDING_BOTTOM),
                left: float(store::PADDING_LEFT),
                right: float(store::PADDING_RIGHT),
            },
            gap: float(store::GAP),
            layout: store
                .resolve_string(desktop_index, store::LAYOUT)
                .map(|p| resolve_layout_path(Path::new(&p))),
            optimal_ratio: DEFAULT_OPTIMAL_RATIO,
        }
    }
}

/// Relative layout paths live in the data directory.
pub fn resolve_layout_path(path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { layouts_dir().join(path) }
}

/// Where the next tiled window goes: next to `node`, optionally on a
/// chosen side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPoint {
    pub node: NodeId,
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreselectionKind {
    Swap,
    Resize,
}

/// Nodes highlighted while a drag is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preselection {
    pub kind: PreselectionKind,
    pub nodes: Vec<NodeId>,
}

/// One (monitor, desktop) pairing and everything tiled on it.
#[derive(Debug)]
pub struct VirtualSpace {
    pub id: SpaceId,
    pub desktop_index: usize,
    pub mode: SpaceMode,
    pub padding: Padding,
    pub gap: f64,
    pub layout_path: Option<PathBuf>,
    pub flags: SpaceFlags,
    pub tree: BspTree,
    pub preselection: Option<Preselection>,
    insertion: Option<InsertionPoint>,
    temporary_ratio: Option<f64>,
    floating: BTreeSet<WindowId>,
    display: Display,
    insets: ScreenInsets,
}

impl VirtualSpace {
    pub fn new(info: SpaceInfo, display: Display, insets: ScreenInsets, config: SpaceConfig) -> Self {
        let mut space = Self {
            id: info.id,
            desktop_index: info.desktop_index,
            mode: config.mode,
            padding: config.padding,
            gap: config.gap,
            layout_path: config.layout,
            flags: SpaceFlags::empty(),
            tree: BspTree::default(),
            preselection: None,
            insertion: None,
            temporary_ratio: None,
            floating: BTreeSet::new(),
            display,
            insets,
        };
        space.tree = BspTree::new(space.bounds(), space.gap).with_optimal_ratio(config.optimal_ratio);
        if let Some(path) = space.layout_path.clone() {
            match load_layout(&path, space.bounds(), space.gap, config.optimal_ratio) {
                Ok(tree) => space.tree = tree,
                Err(e) => warn!(space = %space.id, path = %path.display(), "could not restore layout: {e}"),
            }
        }
        debug!(space = %space.id, mode = %space.mode, "created virtual space");
        space
    }

    pub fn display(&self) -> &Display { &self.display }

    /// Root rectangle for the tree.
    pub fn bounds(&self) -> Region {
        let padding = if self.flags.contains(SpaceFlags::OFFSETS_DISABLED) {
            Padding::default()
        } else {
            self.padding
        };
        fullscreen_region(&self.display, &self.insets, &padding)
    }

    /// Display area without padding, used for zoom-to-fullscreen of floating
    /// windows and warp targets.
    pub fn usable_area(&self) -> Rect {
        fullscreen_region(&self.display, &self.insets, &Padding::default()).rect
    }

    /// Recomputes every region from the current display, padding and gap.
    pub fn recompute(&mut self) {
        self.tree.set_bounds(self.bounds(), self.gap);
        self.flags.remove(SpaceFlags::NEEDS_RECOMPUTE);
    }

    pub fn update_screen(&mut self, display: Display, insets: ScreenInsets) {
        if self.display != display || self.insets != insets {
            self.display = display;
            self.insets = insets;
            self.flags.insert(SpaceFlags::NEEDS_RECOMPUTE);
        }
    }

    pub fn ensure_recomputed(&mut self) {
        if self.flags.contains(SpaceFlags::NEEDS_RECOMPUTE) {
            self.recompute();
        }
    }

    pub fn is_floating(&self, window: WindowId) -> bool { self.floating.contains(&window) }

    pub fn floating_windows(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.floating.iter().copied()
    }

    pub fn set_floating(&mut self, window: WindowId, floating: bool) {
        if floating {
            self.floating.insert(window);
        } else {
            self.floating.remove(&window);
        }
    }

    /// Every window this space knows about, tiled first.
    pub fn windows(&self) -> Vec<WindowId> {
        let mut windows = self.tree.windows();
        windows.extend(self.floating.iter().copied());
        windows
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.tree.contains(window) || self.floating.contains(&window)
    }

    pub fn insertion_point(&self) -> Option<InsertionPoint> {
        self.insertion.filter(|p| self.tree.get(p.node).is_some())
    }

    /// Tracks the focused window as the insertion point, keeping any pending
    /// direction only when the node does not change.
    pub fn set_insertion_node(&mut self, node: Option<NodeId>) {
        self.insertion = match (node, self.insertion) {
            (Some(n), Some(p)) if p.node == n => Some(p),
            (Some(n), _) => Some(InsertionPoint { node: n, direction: None }),
            (None, _) => None,
        };
    }

    pub fn set_insertion_direction(&mut self, node: NodeId, direction: Option<Direction>) {
        self.insertion = Some(InsertionPoint { node, direction });
    }

    /// Region the next window would take for a pending directional
    /// insertion.
    pub fn insertion_preview(&self) -> Option<Region> {
        let point = self.insertion_point()?;
        let direction = point.direction?;
        let parent = self.tree.region(point.node)?.rect;
        let side = if direction.is_forward() {
            crate::layout_engine::region::Side::Second
        } else {
            crate::layout_engine::region::Side::First
        };
        Some(crate::layout_engine::region::child_region(
            &parent,
            0.5,
            direction.crossed_split(),
            side,
            self.gap,
        ))
    }

    pub fn set_temporary_ratio(&mut self, ratio: f64) { self.temporary_ratio = Some(ratio); }

    pub fn temporary_ratio(&self) -> Option<f64> { self.temporary_ratio }

    /// Tiles `window` at the insertion point. A pending insertion direction
    /// and temporary ratio are consumed by this call.
    pub fn tile(&mut self, window: WindowId, defaults: &SplitSettings) -> Option<NodeId> {
        let mut settings = *defaults;
        let point = self.insertion_point();
        if let Some(direction) = point.and_then(|p| p.direction) {
            settings.split = direction.crossed_split();
            settings.spawn =
                if direction.is_forward() { SpawnPosition::Right } else { SpawnPosition::Left };
        }
        if let Some(ratio) = self.temporary_ratio {
            settings.ratio = ratio;
        }
        let node = self.tree.tile_in(window, point.map(|p| p.node), &settings)?;
        self.floating.remove(&window);
        if point.is_some_and(|p| p.direction.is_some()) {
            self.insertion = Some(InsertionPoint { node, direction: None });
        }
        self.temporary_ratio = None;
        trace!(space = %self.id, ?window, "tiled window");
        Some(node)
    }

    /// Removes `window` from the tree and the floating set.
    pub fn forget(&mut self, window: WindowId) -> bool {
        let floated = self.floating.remove(&window);
        let tiled = self.tree.contains(window);
        if tiled {
            self.tree.untile(window);
        }
        if self.insertion_point().is_none() {
            self.insertion = None;
        }
        if let Some(pre) = &self.preselection {
            if pre.nodes.iter().any(|n| self.tree.get(*n).is_none()) {
                self.preselection = None;
            }
        }
        floated || tiled
    }

    /// Target frames for every tiled window. Floating windows and spaces in
    /// float mode are left alone.
    pub fn frames(&self) -> Vec<(WindowId, Rect)> {
        match self.mode {
            SpaceMode::Float => Vec::new(),
            SpaceMode::Monocle => self.tree.frames(true),
            SpaceMode::Bsp => self.tree.frames(false),
        }
    }

    pub fn set_mode(&mut self, mode: SpaceMode) {
        if self.mode != mode {
            debug!(space = %self.id, from = %self.mode, to = %mode, "space mode changed");
            self.mode = mode;
        }
    }

    pub fn toggle_offsets(&mut self) {
        self.flags.toggle(SpaceFlags::OFFSETS_DISABLED);
        self.recompute();
    }

    pub fn adjust_padding(&mut self, delta: f64) {
        self.padding = self.padding.adjusted(delta);
        self.recompute();
    }

    pub fn adjust_gap(&mut self, delta: f64) {
        self.gap = (self.gap + delta).max(0.0);
        self.recompute();
    }

    pub fn save_layout(&self, path: &Path) -> Result<(), LayoutFileError> {
        save_layout(&self.tree, path)
    }

    /// Replaces the tree with the shape stored at `path` and re-tiles the
    /// current windows into it in order.
    pub fn load_layout(&mut self, path: &Path, defaults: &SplitSettings) -> Result<(), LayoutFileError> {
        let windows = self.tree.windows();
        self.tree = load_layout(path, self.bounds(), self.gap, defaults.optimal_ratio)?;
        self.insertion = None;
        self.preselection = None;
        for window in windows {
            self.tree.tile_in(window, None, defaults);
        }
        self.layout_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Nodes in the current preselection and their rectangles.
    pub fn preselection_rects(&self) -> Vec<Rect> {
        let Some(pre) = &self.preselection else {
            return Vec::new();
        };
        pre.nodes
            .iter()
            .filter_map(|n| self.tree.display_region(*n).or_else(|| self.tree.region(*n)))
            .map(|r| r.rect)
            .collect()
    }
}
