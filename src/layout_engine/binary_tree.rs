use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use strum::{Display, EnumString};
use tracing::{debug, trace};

use crate::common::collections::{HashMap, HashSet, VecDeque};
use crate::layout_engine::region::{Region, Side, child_region, window_frame};
use crate::layout_engine::{DEFAULT_OPTIMAL_RATIO, Direction, Split};
use crate::sys::geometry::{Point, Rect};
use crate::sys::window_server::WindowId;

slotmap::new_key_type! { pub struct NodeId; }

/// Bounds for ratios set interactively or by command.
pub const MIN_RATIO: f64 = 0.1;
pub const MAX_RATIO: f64 = 0.9;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// `window` is `None` for placeholders restored from a saved layout.
    Leaf { window: Option<WindowId> },
    Split {
        split: Split,
        ratio: f64,
        first: NodeId,
        second: NodeId,
        /// Descendant leaf currently shown at this node's full region.
        zoom: Option<NodeId>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub region: Region,
    /// Highlighted by an in-progress drag.
    pub preselected: bool,
}

impl Node {
    fn leaf(parent: Option<NodeId>, window: Option<WindowId>, region: Region) -> Self {
        Self {
            parent,
            kind: NodeKind::Leaf { window },
            region,
            preselected: false,
        }
    }

    pub fn is_leaf(&self) -> bool { matches!(self.kind, NodeKind::Leaf { .. }) }

    pub fn window(&self) -> Option<WindowId> {
        match self.kind {
            NodeKind::Leaf { window } => window,
            NodeKind::Split { .. } => None,
        }
    }

    pub fn split(&self) -> Option<Split> {
        match self.kind {
            NodeKind::Split { split, .. } => Some(split),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn ratio(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Split { ratio, .. } => Some(ratio),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self.kind {
            NodeKind::Split { first, second, .. } => Some((first, second)),
            NodeKind::Leaf { .. } => None,
        }
    }
}

/// Which child a newly tiled window becomes when a leaf is split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnPosition {
    Left,
    #[default]
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitSettings {
    pub split: Split,
    pub ratio: f64,
    pub optimal_ratio: f64,
    pub spawn: SpawnPosition,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            split: Split::Optimal,
            ratio: 0.5,
            optimal_ratio: DEFAULT_OPTIMAL_RATIO,
            spawn: SpawnPosition::Right,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
pub enum Rotation {
    #[strum(serialize = "90")]
    Deg90,
    #[strum(serialize = "180")]
    Deg180,
    #[strum(serialize = "270")]
    Deg270,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Zoom {
    /// Show the leaf over the whole space.
    Fullscreen,
    /// Show the leaf over its parent's region.
    Parent,
}

/// Binary layout tree for one virtual space.
///
/// Nodes live in an arena and refer to each other by [`NodeId`]. Every
/// internal node has exactly two children.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BspTree {
    nodes: SlotMap<NodeId, Node>,
    root: Option<NodeId>,
    window_to_node: HashMap<WindowId, NodeId>,
    bounds: Region,
    gap: f64,
    /// Threshold for splits restored as `optimal`.
    optimal_ratio: f64,
}

impl Default for BspTree {
    fn default() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            window_to_node: HashMap::default(),
            bounds: Region::default(),
            gap: 0.0,
            optimal_ratio: DEFAULT_OPTIMAL_RATIO,
        }
    }
}

impl BspTree {
    pub fn new(bounds: Region, gap: f64) -> Self {
        Self {
            bounds,
            gap,
            ..Default::default()
        }
    }

    pub fn with_optimal_ratio(mut self, optimal_ratio: f64) -> Self {
        self.optimal_ratio = optimal_ratio;
        self
    }

    pub fn optimal_ratio(&self) -> f64 { self.optimal_ratio }

    pub fn root(&self) -> Option<NodeId> { self.root }

    pub fn is_empty(&self) -> bool { self.root.is_none() }

    pub fn bounds(&self) -> Region { self.bounds }

    pub fn gap(&self) -> f64 { self.gap }

    pub fn get(&self, node: NodeId) -> Option<&Node> { self.nodes.get(node) }

    pub fn node_count(&self) -> usize { self.nodes.len() }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { self.nodes.get(node)?.parent }

    pub fn children(&self, node: NodeId) -> Option<(NodeId, NodeId)> {
        self.nodes.get(node)?.children()
    }

    pub fn is_leaf(&self, node: NodeId) -> bool { self.nodes.get(node).is_some_and(Node::is_leaf) }

    pub fn region(&self, node: NodeId) -> Option<Region> { self.nodes.get(node).map(|n| n.region) }

    pub fn window(&self, node: NodeId) -> Option<WindowId> { self.nodes.get(node)?.window() }

    pub fn leaf_of(&self, window: WindowId) -> Option<NodeId> {
        self.window_to_node.get(&window).copied()
    }

    pub fn contains(&self, window: WindowId) -> bool { self.window_to_node.contains_key(&window) }

    pub fn window_count(&self) -> usize { self.window_to_node.len() }

    /// Replaces the root rectangle and gap and recomputes every region.
    pub fn set_bounds(&mut self, bounds: Region, gap: f64) {
        self.bounds = bounds;
        self.gap = gap;
        if let Some(root) = self.root {
            self.nodes[root].region = bounds;
            self.recompute_regions(root);
        }
    }

    /// Recomputes the regions of every descendant of `node` from `node`'s own
    /// region. Pending optimal splits are resolved here.
    pub fn recompute_regions(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(current) = self.nodes.get(id) else {
                continue;
            };
            let NodeKind::Split { split, ratio, first, second, .. } = current.kind else {
                continue;
            };
            let parent_rect = current.region.rect;
            let split = match split {
                Split::Optimal => {
                    let resolved = Split::optimal_for(
                        parent_rect.size.width,
                        parent_rect.size.height,
                        self.optimal_ratio,
                    );
                    if let NodeKind::Split { split, .. } = &mut self.nodes[id].kind {
                        *split = resolved;
                    }
                    resolved
                }
                other => other,
            };
            self.nodes[first].region = child_region(&parent_rect, ratio, split, Side::First, self.gap);
            self.nodes[second].region =
                child_region(&parent_rect, ratio, split, Side::Second, self.gap);
            stack.push(first);
            stack.push(second);
        }
    }

    pub fn first_leaf(&self, from: NodeId) -> NodeId {
        let mut node = from;
        while let Some((first, _)) = self.children(node) {
            node = first;
        }
        node
    }

    pub fn last_leaf(&self, from: NodeId) -> NodeId {
        let mut node = from;
        while let Some((_, second)) = self.children(node) {
            node = second;
        }
        node
    }

    /// In-order successor among leaves.
    pub fn next_leaf(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            let (first, second) = self.children(parent)?;
            if first == current {
                return Some(self.first_leaf(second));
            }
            current = parent;
        }
        None
    }

    /// In-order predecessor among leaves.
    pub fn prev_leaf(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            let (first, second) = self.children(parent)?;
            if second == current {
                return Some(self.last_leaf(first));
            }
            current = parent;
        }
        None
    }

    /// Leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<NodeId> { self.leaves_under(self.root) }

    pub fn leaves_under(&self, node: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(start) = node else {
            return out;
        };
        let mut leaf = Some(self.first_leaf(start));
        let last = self.last_leaf(start);
        while let Some(l) = leaf {
            out.push(l);
            if l == last {
                break;
            }
            leaf = self.next_leaf(l);
        }
        out
    }

    pub fn windows(&self) -> Vec<WindowId> {
        self.leaves().into_iter().filter_map(|l| self.window(l)).collect()
    }

    pub fn windows_under(&self, node: NodeId) -> Vec<WindowId> {
        self.leaves_under(Some(node)).into_iter().filter_map(|l| self.window(l)).collect()
    }

    /// Breadth-first search for the shallowest leaf, used to keep the tree
    /// balanced when no insertion point is set.
    pub fn first_min_depth_leaf(&self) -> Option<NodeId> {
        let mut queue = VecDeque::new();
        queue.push_back(self.root?);
        while let Some(node) = queue.pop_front() {
            match self.children(node) {
                None => return Some(node),
                Some((first, second)) => {
                    queue.push_back(first);
                    queue.push_back(second);
                }
            }
        }
        None
    }

    fn first_empty_leaf(&self) -> Option<NodeId> {
        self.leaves()
            .into_iter()
            .find(|&l| matches!(self.nodes[l].kind, NodeKind::Leaf { window: None }))
    }

    /// Strict ancestors of `node`, nearest first.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    pub fn lowest_common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        if !self.nodes.contains_key(a) || !self.nodes.contains_key(b) {
            return None;
        }
        let mut seen = HashSet::default();
        seen.insert(a);
        seen.extend(self.ancestors(a));
        std::iter::once(b).chain(self.ancestors(b)).find(|n| seen.contains(n))
    }

    /// Inserts `window` into the tree and returns the leaf that holds it.
    ///
    /// Placeholder leaves are filled first. Otherwise `insertion` (or the
    /// first minimum-depth leaf) is split in two. Returns `None` if the
    /// window is already tiled.
    pub fn tile_in(
        &mut self,
        window: WindowId,
        insertion: Option<NodeId>,
        settings: &SplitSettings,
    ) -> Option<NodeId> {
        if self.contains(window) {
            trace!(?window, "window already tiled");
            return None;
        }

        let Some(_) = self.root else {
            let root = self.nodes.insert(Node::leaf(None, Some(window), self.bounds));
            self.root = Some(root);
            self.window_to_node.insert(window, root);
            return Some(root);
        };

        if let Some(empty) = self.first_empty_leaf() {
            self.nodes[empty].kind = NodeKind::Leaf { window: Some(window) };
            self.window_to_node.insert(window, empty);
            return Some(empty);
        }

        let target = insertion
            .filter(|n| self.nodes.contains_key(*n))
            .map(|n| self.first_leaf(n))
            .or_else(|| self.first_min_depth_leaf())?;
        Some(self.split_leaf(target, window, settings))
    }

    fn split_leaf(&mut self, target: NodeId, window: WindowId, settings: &SplitSettings) -> NodeId {
        let region = self.nodes[target].region;
        let existing = self.nodes[target].window();
        let split = match settings.split {
            Split::Optimal => Split::optimal_for(
                region.rect.size.width,
                region.rect.size.height,
                settings.optimal_ratio,
            ),
            explicit => explicit,
        };

        let old_leaf = self.nodes.insert(Node::leaf(Some(target), existing, region));
        let new_leaf = self.nodes.insert(Node::leaf(Some(target), Some(window), region));
        let (first, second) = match settings.spawn {
            SpawnPosition::Left => (new_leaf, old_leaf),
            SpawnPosition::Right => (old_leaf, new_leaf),
        };
        self.nodes[target].kind = NodeKind::Split {
            split,
            ratio: settings.ratio,
            first,
            second,
            zoom: None,
        };
        if let Some(w) = existing {
            self.window_to_node.insert(w, old_leaf);
        }
        self.window_to_node.insert(window, new_leaf);
        self.retarget_zoom(target, Some(old_leaf));
        self.recompute_regions(target);
        debug!(?window, ?split, "split leaf for new window");
        new_leaf
    }

    /// Removes `window` and promotes its sibling into the parent's slot.
    /// Returns the node that took the parent's place, if any remains.
    pub fn untile(&mut self, window: WindowId) -> Option<NodeId> {
        let leaf = self.window_to_node.remove(&window)?;
        self.retarget_zoom(leaf, None);

        let Some(parent) = self.nodes[leaf].parent else {
            self.nodes.remove(leaf);
            self.root = None;
            return None;
        };
        let (first, second) = self.children(parent)?;
        let sibling = if first == leaf { second } else { first };

        let sibling_node = self.nodes.remove(sibling)?;
        self.nodes.remove(leaf);

        // A zoom held by the parent outlives the removal; the sibling's own
        // zoom moves up with its content.
        let held = self.zoom_of(parent);
        let zoom = match &sibling_node.kind {
            NodeKind::Split { zoom, .. } => held.or(*zoom),
            NodeKind::Leaf { .. } => None,
        };
        self.nodes[parent].kind = match sibling_node.kind {
            NodeKind::Split { split, ratio, first, second, .. } => {
                self.nodes[first].parent = Some(parent);
                self.nodes[second].parent = Some(parent);
                NodeKind::Split { split, ratio, first, second, zoom }
            }
            NodeKind::Leaf { window } => {
                if let Some(w) = window {
                    self.window_to_node.insert(w, parent);
                }
                NodeKind::Leaf { window }
            }
        };
        self.retarget_zoom(sibling, Some(parent));
        self.recompute_regions(parent);
        Some(parent)
    }

    /// Exchanges the windows of two leaves without altering the shape.
    pub fn swap_ids(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b || !self.is_leaf(a) || !self.is_leaf(b) {
            return false;
        }
        let wa = self.nodes[a].window();
        let wb = self.nodes[b].window();
        self.nodes[a].kind = NodeKind::Leaf { window: wb };
        self.nodes[b].kind = NodeKind::Leaf { window: wa };
        if let Some(w) = wa {
            self.window_to_node.insert(w, b);
        }
        if let Some(w) = wb {
            self.window_to_node.insert(w, a);
        }
        true
    }

    fn internal_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().filter(|(_, n)| !n.is_leaf()).map(|(id, _)| id).collect()
    }

    fn flip_children(&mut self, node: NodeId) {
        if let NodeKind::Split { ratio, first, second, .. } = &mut self.nodes[node].kind {
            std::mem::swap(first, second);
            *ratio = 1.0 - *ratio;
        }
    }

    /// Rotates the whole tree: every split swaps its children and inverts
    /// its ratio, and quarter turns also flip every axis.
    pub fn rotate(&mut self, rotation: Rotation) {
        let Some(root) = self.root else {
            return;
        };
        for node in self.internal_nodes() {
            self.flip_children(node);
            if rotation != Rotation::Deg180 {
                if let NodeKind::Split { split, .. } = &mut self.nodes[node].kind {
                    *split = split.toggled();
                }
            }
        }
        self.recompute_regions(root);
    }

    /// Mirrors the tree across the given split axis: every split of that
    /// axis swaps its children.
    pub fn mirror(&mut self, axis: Split) {
        let Some(root) = self.root else {
            return;
        };
        for node in self.internal_nodes() {
            if self.nodes[node].split() == Some(axis) {
                self.flip_children(node);
            }
        }
        self.recompute_regions(root);
    }

    /// Rewrites every ratio so leaves get equal shares along each axis.
    pub fn equalize(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        self.equalize_counts(root);
        self.recompute_regions(root);
    }

    /// Returns (vertical, horizontal) leaf counts of the subtree.
    fn equalize_counts(&mut self, node: NodeId) -> (usize, usize) {
        let NodeKind::Split { split, first, second, .. } = self.nodes[node].kind else {
            return (1, 1);
        };
        let (v1, h1) = self.equalize_counts(first);
        let (v2, h2) = self.equalize_counts(second);
        let (counts, new_ratio) = match split {
            Split::Horizontal => ((v1.max(v2), h1 + h2), h1 as f64 / (h1 + h2) as f64),
            Split::Vertical | Split::Optimal => ((v1 + v2, h1.max(h2)), v1 as f64 / (v1 + v2) as f64),
        };
        if let NodeKind::Split { ratio, .. } = &mut self.nodes[node].kind {
            *ratio = new_ratio;
        }
        counts
    }

    /// Sets a split ratio. Values outside `[MIN_RATIO, MAX_RATIO]` are
    /// rejected and leave the ratio unchanged.
    pub fn set_ratio(&mut self, node: NodeId, new_ratio: f64) -> bool {
        if !(MIN_RATIO..=MAX_RATIO).contains(&new_ratio) {
            trace!(new_ratio, "ratio out of range");
            return false;
        }
        let Some(Node { kind: NodeKind::Split { ratio, .. }, .. }) = self.nodes.get_mut(node) else {
            return false;
        };
        *ratio = new_ratio;
        self.recompute_regions(node);
        true
    }

    /// Flips the axis of the split directly above `leaf`.
    pub fn toggle_split(&mut self, leaf: NodeId) -> bool {
        let Some(parent) = self.parent(leaf) else {
            return false;
        };
        if let NodeKind::Split { split, .. } = &mut self.nodes[parent].kind {
            *split = split.toggled();
        }
        self.recompute_regions(parent);
        true
    }

    /// Nearest ancestor split that `from` can be resized across in
    /// `direction`: one of the crossed axis where `from` lies on the side
    /// facing away from the boundary.
    pub fn boundary_in_direction(&self, from: NodeId, direction: Direction) -> Option<NodeId> {
        let mut current = from;
        while let Some(parent) = self.parent(current) {
            let node = &self.nodes[parent];
            if let NodeKind::Split { split, first, .. } = node.kind {
                let on_first = first == current;
                if split == direction.crossed_split() && on_first == direction.is_forward() {
                    return Some(parent);
                }
            }
            current = parent;
        }
        None
    }

    pub fn zoom_of(&self, node: NodeId) -> Option<NodeId> {
        match self.nodes.get(node)?.kind {
            NodeKind::Split { zoom, .. } => zoom,
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Toggles zoom of `leaf` to the whole space or to its parent. Returns
    /// whether the leaf is zoomed afterwards.
    pub fn toggle_zoom(&mut self, leaf: NodeId, zoom: Zoom) -> bool {
        if !self.is_leaf(leaf) {
            return false;
        }
        let holder = match zoom {
            Zoom::Fullscreen => self.root,
            Zoom::Parent => self.parent(leaf),
        };
        let Some(holder) = holder.filter(|&h| h != leaf) else {
            return false;
        };
        let NodeKind::Split { zoom: slot, .. } = &mut self.nodes[holder].kind else {
            return false;
        };
        if *slot == Some(leaf) {
            *slot = None;
            false
        } else {
            *slot = Some(leaf);
            true
        }
    }

    /// Replaces every zoom reference to `from` with `to`.
    fn retarget_zoom(&mut self, from: NodeId, to: Option<NodeId>) {
        for node in self.nodes.values_mut() {
            if let NodeKind::Split { zoom, .. } = &mut node.kind {
                if *zoom == Some(from) {
                    *zoom = to;
                }
            }
        }
    }

    /// The region a leaf is displayed at. A zoom on any ancestor wins over
    /// the leaf's own region until the zoom is cleared, even when that
    /// ancestor's region changes.
    pub fn display_region(&self, leaf: NodeId) -> Option<Region> {
        let mut region = self.nodes.get(leaf)?.region;
        for ancestor in self.ancestors(leaf) {
            if self.zoom_of(ancestor) == Some(leaf) {
                region = self.nodes[ancestor].region;
            }
        }
        Some(region)
    }

    /// The leaf whose region contains `point`.
    pub fn leaf_at(&self, point: Point) -> Option<NodeId> {
        let mut node = self.root?;
        if !self.nodes[node].region.rect.contains(point) {
            return None;
        }
        while let Some((first, second)) = self.children(node) {
            node = if self.nodes[first].region.rect.contains(point) {
                first
            } else if self.nodes[second].region.rect.contains(point) {
                second
            } else {
                // Inside the gap.
                return None;
            };
        }
        Some(node)
    }

    /// Window frames for every tiled window under `node`.
    pub fn frames_under(&self, node: NodeId) -> Vec<(WindowId, Rect)> {
        self.leaves_under(Some(node))
            .into_iter()
            .filter_map(|leaf| {
                let window = self.window(leaf)?;
                let region = self.display_region(leaf)?;
                Some((window, window_frame(&region)))
            })
            .collect()
    }

    /// Window frames for the whole tree. In monocle mode every window covers
    /// the full bounds.
    pub fn frames(&self, monocle: bool) -> Vec<(WindowId, Rect)> {
        if monocle {
            let frame = window_frame(&self.bounds);
            return self.windows().into_iter().map(|w| (w, frame)).collect();
        }
        match self.root {
            Some(root) => self.frames_under(root),
            None => Vec::new(),
        }
    }

    pub fn set_preselected(&mut self, node: NodeId, preselected: bool) {
        for leaf in self.leaves_under(Some(node)) {
            self.nodes[leaf].preselected = preselected;
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.preselected = preselected;
        }
    }

    pub fn clear_preselection(&mut self) {
        for node in self.nodes.values_mut() {
            node.preselected = false;
        }
    }

    pub fn draw_tree(&self) -> String {
        fn build(this: &BspTree, node: NodeId) -> ascii_tree::Tree {
            let n = &this.nodes[node];
            match n.kind {
                NodeKind::Leaf { window } => ascii_tree::Tree::Leaf(vec![match window {
                    Some(w) => format!("window {w}"),
                    None => "empty".to_string(),
                }]),
                NodeKind::Split { split, ratio, first, second, zoom } => {
                    let mut label = format!("{split} {ratio:.3}");
                    if let Some(z) = zoom.and_then(|z| this.window(z)) {
                        label.push_str(&format!(" (zoom {z})"));
                    }
                    ascii_tree::Tree::Node(label, vec![build(this, first), build(this, second)])
                }
            }
        }
        let Some(root) = self.root else {
            return "<empty tree>\n".to_string();
        };
        let mut out = String::new();
        let _ = ascii_tree::write_tree(&mut out, &build(self, root));
        out
    }

    /// Builds a tree from a pre-validated shape. Leaves are placeholders.
    pub(crate) fn from_shape(shape: &Shape, bounds: Region, gap: f64, optimal_ratio: f64) -> Self {
        fn insert(tree: &mut BspTree, shape: &Shape, parent: Option<NodeId>) -> NodeId {
            let id = tree.nodes.insert(Node::leaf(parent, None, Region::default()));
            if let Shape::Split { split, ratio, first, second } = shape {
                let f = insert(tree, first, Some(id));
                let s = insert(tree, second, Some(id));
                tree.nodes[id].kind = NodeKind::Split {
                    split: *split,
                    ratio: *ratio,
                    first: f,
                    second: s,
                    zoom: None,
                };
            }
            id
        }
        let mut tree = BspTree::new(bounds, gap).with_optimal_ratio(optimal_ratio);
        let root = insert(&mut tree, shape, None);
        tree.nodes[root].region = bounds;
        tree.root = Some(root);
        // Keep the persisted axes even when the restored bounds would pick a
        // different optimal split.
        tree.recompute_regions(root);
        tree
    }

    pub(crate) fn shape(&self) -> Option<Shape> {
        fn build(this: &BspTree, node: NodeId) -> Shape {
            match this.nodes[node].kind {
                NodeKind::Leaf { .. } => Shape::Leaf,
                NodeKind::Split { split, ratio, first, second, .. } => Shape::Split {
                    split,
                    ratio,
                    first: Box::new(build(this, first)),
                    second: Box::new(build(this, second)),
                },
            }
        }
        self.root.map(|r| build(self, r))
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert!(self.nodes.is_empty());
            assert!(self.window_to_node.is_empty());
            return;
        };
        assert_eq!(self.nodes[root].parent, None);
        let mut reachable = 0;
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            reachable += 1;
            if let Some((first, second)) = self.children(n) {
                assert_ne!(first, second);
                assert_eq!(self.nodes[first].parent, Some(n));
                assert_eq!(self.nodes[second].parent, Some(n));
                stack.push(first);
                stack.push(second);
            }
        }
        assert_eq!(reachable, self.nodes.len(), "unreachable nodes left in arena");
        for (w, node) in &self.window_to_node {
            assert_eq!(self.nodes[*node].window(), Some(*w));
        }
    }
}

/// Structure of a tree without window assignments.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Shape {
    Leaf,
    Split {
        split: Split,
        ratio: f64,
        first: Box<Shape>,
        second: Box<Shape>,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::region::RegionType;

    fn w(id: u32) -> WindowId { WindowId(id) }

    fn screen() -> Region { Region::full(Rect::from_xywh(0., 0., 1920., 1080.)) }

    fn tree_with(windows: &[u32]) -> BspTree {
        let mut tree = BspTree::new(screen(), 0.);
        for &id in windows {
            tree.tile_in(w(id), None, &SplitSettings::default());
        }
        tree
    }

    #[test]
    fn first_window_becomes_root_leaf() {
        let tree = tree_with(&[1]);
        let root = tree.root().unwrap();
        assert_eq!(tree.window(root), Some(w(1)));
        assert_eq!(tree.region(root).unwrap().rect, screen().rect);
        tree.assert_invariants();
    }

    #[test]
    fn three_windows_split_optimally() {
        let mut tree = BspTree::new(screen(), 0.);
        let settings = SplitSettings { optimal_ratio: 1.618, ..Default::default() };
        tree.tile_in(w(1), None, &settings);
        let b = tree.tile_in(w(2), None, &settings).unwrap();
        tree.tile_in(w(3), Some(b), &settings);

        let root = tree.root().unwrap();
        assert_eq!(tree.get(root).unwrap().split(), Some(Split::Vertical));
        let (left, right) = tree.children(root).unwrap();
        assert_eq!(tree.window(left), Some(w(1)));
        assert_eq!(tree.get(right).unwrap().split(), Some(Split::Horizontal));
        assert_eq!(tree.windows_under(right), vec![w(2), w(3)]);
        assert_eq!(tree.windows(), vec![w(1), w(2), w(3)]);
        tree.assert_invariants();
    }

    #[test]
    fn tile_in_is_noop_for_duplicate_window() {
        let mut tree = tree_with(&[1, 2]);
        let before = tree.node_count();
        assert_eq!(tree.tile_in(w(2), None, &SplitSettings::default()), None);
        assert_eq!(tree.node_count(), before);
    }

    #[test]
    fn in_order_traversal_visits_each_window_once() {
        let tree = tree_with(&[1, 2, 3, 4, 5, 6, 7]);
        let mut seen = tree.windows();
        assert_eq!(seen.len(), 7);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 7);

        let first = tree.first_leaf(tree.root().unwrap());
        let mut forward = vec![first];
        while let Some(next) = tree.next_leaf(*forward.last().unwrap()) {
            forward.push(next);
        }
        let last = tree.last_leaf(tree.root().unwrap());
        let mut backward = vec![last];
        while let Some(prev) = tree.prev_leaf(*backward.last().unwrap()) {
            backward.push(prev);
        }
        backward.reverse();
        assert_eq!(forward, backward);
        tree.assert_invariants();
    }

    #[test]
    fn untile_restores_previous_window_set() {
        let mut tree = tree_with(&[1, 2, 3]);
        let mut before = tree.windows();
        tree.tile_in(w(9), None, &SplitSettings::default());
        tree.untile(w(9));
        let mut after = tree.windows();
        before.sort();
        after.sort();
        assert_eq!(before, after);
        tree.assert_invariants();
    }

    #[test]
    fn untile_promotes_sibling_subtree() {
        let mut tree = BspTree::new(screen(), 0.);
        let settings = SplitSettings::default();
        tree.tile_in(w(1), None, &settings);
        let b = tree.tile_in(w(2), None, &settings).unwrap();
        tree.tile_in(w(3), Some(b), &settings);

        let root = tree.root().unwrap();
        tree.untile(w(1));
        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.get(root).unwrap().split(), Some(Split::Horizontal));
        assert_eq!(tree.windows(), vec![w(2), w(3)]);
        let (upper, _) = tree.children(root).unwrap();
        assert_eq!(tree.region(upper).unwrap().rect, Rect::from_xywh(0., 0., 1920., 540.));
        tree.assert_invariants();

        tree.untile(w(2));
        tree.untile(w(3));
        assert!(tree.is_empty());
        tree.assert_invariants();
    }

    #[test]
    fn children_cover_parent_with_gap() {
        let mut tree = BspTree::new(screen(), 12.);
        for id in 1..=6 {
            tree.tile_in(w(id), None, &SplitSettings::default());
        }
        for node in tree.internal_nodes() {
            let parent = tree.region(node).unwrap().rect;
            let (a, b) = tree.children(node).unwrap();
            let (ra, rb) = (tree.region(a).unwrap().rect, tree.region(b).unwrap().rect);
            match tree.get(node).unwrap().split().unwrap() {
                Split::Vertical => {
                    assert!((ra.max_x() + 12. - rb.min_x()).abs() < 1e-9);
                    assert!((rb.max_x() - parent.max_x()).abs() < 1e-9);
                    assert_eq!(ra.min_x(), parent.min_x());
                }
                _ => {
                    assert!((ra.max_y() + 12. - rb.min_y()).abs() < 1e-9);
                    assert!((rb.max_y() - parent.max_y()).abs() < 1e-9);
                    assert_eq!(ra.min_y(), parent.min_y());
                }
            }
        }
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut tree = tree_with(&[1, 2, 3, 4]);
        let root = tree.root().unwrap();
        let before = tree.frames(false);
        tree.recompute_regions(root);
        tree.recompute_regions(root);
        assert_eq!(before, tree.frames(false));
    }

    #[test]
    fn first_min_depth_leaf_is_breadth_first() {
        let mut tree = BspTree::new(screen(), 0.);
        let settings = SplitSettings::default();
        tree.tile_in(w(1), None, &settings);
        let b = tree.tile_in(w(2), None, &settings).unwrap();
        tree.tile_in(w(3), Some(b), &settings);
        let leaf = tree.first_min_depth_leaf().unwrap();
        assert_eq!(tree.window(leaf), Some(w(1)));
        assert_eq!(tree.ancestors(leaf).count(), 1);
    }

    #[test]
    fn lowest_common_ancestor_finds_shared_split() {
        let mut tree = BspTree::new(screen(), 0.);
        let settings = SplitSettings::default();
        tree.tile_in(w(1), None, &settings);
        let b = tree.tile_in(w(2), None, &settings).unwrap();
        let c = tree.tile_in(w(3), Some(b), &settings).unwrap();
        let b = tree.leaf_of(w(2)).unwrap();
        let a = tree.leaf_of(w(1)).unwrap();
        assert_eq!(tree.lowest_common_ancestor(b, c), tree.parent(c));
        assert_eq!(tree.lowest_common_ancestor(a, c), tree.root());
        assert_eq!(tree.lowest_common_ancestor(a, a), Some(a));
    }

    #[test]
    fn swap_ids_keeps_shape() {
        let mut tree = tree_with(&[1, 2, 3]);
        let shape = tree.shape();
        let a = tree.leaf_of(w(1)).unwrap();
        let c = tree.leaf_of(w(3)).unwrap();
        assert!(tree.swap_ids(a, c));
        assert_eq!(tree.shape(), shape);
        assert_eq!(tree.window(a), Some(w(3)));
        assert_eq!(tree.leaf_of(w(1)), Some(c));
        assert!(!tree.swap_ids(a, a));
        tree.assert_invariants();
    }

    #[test]
    fn rotate_180_twice_is_identity() {
        let mut tree = tree_with(&[1, 2, 3, 4]);
        let root = tree.root().unwrap();
        tree.set_ratio(root, 0.25);
        let windows = tree.windows();
        let shape = tree.shape();

        tree.rotate(Rotation::Deg180);
        let mut reversed = windows.clone();
        reversed.reverse();
        assert_eq!(tree.windows(), reversed);
        assert!((tree.get(root).unwrap().ratio().unwrap() - 0.75).abs() < 1e-12);

        tree.rotate(Rotation::Deg180);
        assert_eq!(tree.windows(), windows);
        assert_eq!(tree.shape(), shape);
    }

    #[test]
    fn rotate_90_turns_columns_into_rows() {
        let mut tree = tree_with(&[1, 2]);
        let root = tree.root().unwrap();
        tree.rotate(Rotation::Deg90);
        assert_eq!(tree.get(root).unwrap().split(), Some(Split::Horizontal));
        assert_eq!(tree.windows(), vec![w(2), w(1)]);
        let upper = tree.leaf_of(w(2)).unwrap();
        assert_eq!(tree.region(upper).unwrap().rect, Rect::from_xywh(0., 0., 1920., 540.));
        tree.rotate(Rotation::Deg270);
        assert_eq!(tree.get(root).unwrap().split(), Some(Split::Vertical));
        assert_eq!(tree.windows(), vec![w(1), w(2)]);
    }

    #[test]
    fn mirror_only_touches_matching_axis() {
        let mut tree = BspTree::new(screen(), 0.);
        let settings = SplitSettings::default();
        tree.tile_in(w(1), None, &settings);
        let b = tree.tile_in(w(2), None, &settings).unwrap();
        tree.tile_in(w(3), Some(b), &settings);
        tree.mirror(Split::Horizontal);
        assert_eq!(tree.windows(), vec![w(1), w(3), w(2)]);
        tree.mirror(Split::Vertical);
        assert_eq!(tree.windows(), vec![w(3), w(2), w(1)]);
    }

    #[test]
    fn equalize_gives_equal_shares() {
        let mut tree = BspTree::new(screen(), 0.);
        let settings = SplitSettings {
            split: Split::Vertical,
            ..Default::default()
        };
        tree.tile_in(w(1), None, &settings);
        let b = tree.tile_in(w(2), None, &settings).unwrap();
        tree.tile_in(w(3), Some(b), &settings);
        tree.equalize();
        let root = tree.root().unwrap();
        assert!((tree.get(root).unwrap().ratio().unwrap() - 1.0 / 3.0).abs() < 1e-12);
        let widths: Vec<f64> = tree.frames(false).iter().map(|(_, r)| r.size.width).collect();
        assert_eq!(widths, vec![640., 640., 640.]);
    }

    #[test]
    fn set_ratio_rejects_out_of_range() {
        let mut tree = tree_with(&[1, 2]);
        let root = tree.root().unwrap();
        assert!(!tree.set_ratio(root, 0.95));
        assert!(!tree.set_ratio(root, 0.05));
        assert_eq!(tree.get(root).unwrap().ratio(), Some(0.5));
        assert!(tree.set_ratio(root, 0.9));
        assert_eq!(tree.get(root).unwrap().ratio(), Some(0.9));
    }

    #[test]
    fn zoom_wins_over_ancestor_ratio_changes() {
        let mut tree = tree_with(&[1, 2, 3]);
        let root = tree.root().unwrap();
        let leaf = tree.leaf_of(w(3)).unwrap();
        assert!(tree.toggle_zoom(leaf, Zoom::Fullscreen));
        tree.set_ratio(root, 0.7);
        assert_eq!(tree.display_region(leaf).unwrap().rect, screen().rect);
        assert!(!tree.toggle_zoom(leaf, Zoom::Fullscreen));
        assert_ne!(tree.display_region(leaf).unwrap().rect, screen().rect);
    }

    #[test]
    fn zoom_follows_promoted_sibling() {
        let mut tree = tree_with(&[1, 2]);
        let leaf = tree.leaf_of(w(2)).unwrap();
        tree.tile_in(w(3), Some(leaf), &SplitSettings::default());
        let leaf3 = tree.leaf_of(w(3)).unwrap();
        tree.toggle_zoom(leaf3, Zoom::Fullscreen);
        tree.untile(w(2));
        let leaf3 = tree.leaf_of(w(3)).unwrap();
        assert_eq!(tree.zoom_of(tree.root().unwrap()), Some(leaf3));
        tree.untile(w(3));
        assert_eq!(tree.zoom_of(tree.root().unwrap_or_default()), None);
    }

    #[test]
    fn zoom_survives_removal_of_unrelated_window() {
        let vertical = SplitSettings { split: Split::Vertical, ..Default::default() };
        let horizontal = SplitSettings { split: Split::Horizontal, ..Default::default() };
        let mut tree = BspTree::new(screen(), 0.);
        tree.tile_in(w(1), None, &vertical);
        tree.tile_in(w(2), None, &vertical);
        tree.tile_in(w(3), tree.leaf_of(w(2)), &horizontal);
        tree.tile_in(w(4), tree.leaf_of(w(3)), &horizontal);
        let leaf4 = tree.leaf_of(w(4)).unwrap();
        assert!(tree.toggle_zoom(leaf4, Zoom::Fullscreen));

        tree.untile(w(1));
        tree.assert_invariants();
        let leaf4 = tree.leaf_of(w(4)).unwrap();
        assert_eq!(tree.zoom_of(tree.root().unwrap()), Some(leaf4));
        assert_eq!(tree.display_region(leaf4).unwrap().rect, screen().rect);
    }

    #[test]
    fn leaf_at_ignores_gaps() {
        let mut tree = BspTree::new(screen(), 20.);
        tree.tile_in(w(1), None, &SplitSettings::default());
        tree.tile_in(w(2), None, &SplitSettings::default());
        assert_eq!(tree.leaf_at(Point::new(100., 100.)), tree.leaf_of(w(1)));
        assert_eq!(tree.leaf_at(Point::new(1500., 100.)), tree.leaf_of(w(2)));
        assert_eq!(tree.leaf_at(Point::new(960., 100.)), None);
    }

    #[test]
    fn boundary_in_direction_picks_facing_split() {
        let tree = tree_with(&[1, 2]);
        let left = tree.leaf_of(w(1)).unwrap();
        let right = tree.leaf_of(w(2)).unwrap();
        assert_eq!(tree.boundary_in_direction(left, Direction::East), tree.root());
        assert_eq!(tree.boundary_in_direction(left, Direction::West), None);
        assert_eq!(tree.boundary_in_direction(right, Direction::West), tree.root());
        assert_eq!(tree.boundary_in_direction(right, Direction::North), None);
    }

    #[test]
    fn region_types_follow_split_side() {
        let tree = tree_with(&[1, 2]);
        let left = tree.leaf_of(w(1)).unwrap();
        let right = tree.leaf_of(w(2)).unwrap();
        assert_eq!(tree.region(left).unwrap().kind, RegionType::Left);
        assert_eq!(tree.region(right).unwrap().kind, RegionType::Right);
    }

    #[test]
    fn draw_tree_lists_windows() {
        let tree = tree_with(&[1, 2]);
        let drawn = tree.draw_tree();
        assert!(drawn.contains("vertical 0.500"));
        assert!(drawn.contains("window 1"));
        assert!(drawn.contains("window 2"));
    }
}
