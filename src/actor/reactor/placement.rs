//! Directional neighbour search and placement targets.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::ipc::command::FloatingPosition;
use crate::layout_engine::{BspTree, Direction, NodeId, SpaceMode};
use crate::model::VirtualSpace;
use crate::sys::geometry::{Point, Rect};

/// Angle-weighted distance between the centres of `a` and `b` when moving
/// in `direction`, or `None` when `b` does not lie that way.
///
/// With `wrap`, `b` is shifted by one display width or height in
/// `direction` first, which evaluates it as if the display repeated.
pub fn distance(display: &Rect, a: &Rect, b: &Rect, direction: Direction, wrap: bool) -> Option<f64> {
    let from = a.mid();
    let mut to = b.mid();
    if wrap {
        match direction {
            Direction::East => to.x += display.size.width,
            Direction::West => to.x -= display.size.width,
            Direction::South => to.y += display.size.height,
            Direction::North => to.y -= display.size.height,
        }
    }
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }

    // y grows downward.
    let ideal = match direction {
        Direction::East => 0.0,
        Direction::South => FRAC_PI_2,
        Direction::West => PI,
        Direction::North => -FRAC_PI_2,
    };
    let mut delta = (dy.atan2(dx) - ideal).abs();
    if delta > PI {
        delta = 2.0 * PI - delta;
    }
    if delta >= FRAC_PI_2 {
        return None;
    }
    Some(dx.hypot(dy) * (1.0 + 2.0 * delta / PI))
}

/// Closest window-holding leaf from `from` in `direction`. Wraparound is
/// only considered when nothing lies in that direction on screen.
pub fn closest_in_direction(
    tree: &BspTree,
    display: &Rect,
    from: NodeId,
    direction: Direction,
    wrap: bool,
) -> Option<NodeId> {
    let origin = tree.region(from)?.rect;
    let candidates: Vec<(NodeId, Rect)> = tree
        .leaves()
        .into_iter()
        .filter(|&leaf| leaf != from && tree.window(leaf).is_some())
        .filter_map(|leaf| Some((leaf, tree.region(leaf)?.rect)))
        .collect();
    let best = |wrap: bool| {
        candidates
            .iter()
            .filter_map(|(leaf, rect)| Some((*leaf, distance(display, &origin, rect, direction, wrap)?)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(leaf, _)| leaf)
    };
    best(false).or_else(|| if wrap { best(true) } else { None })
}

/// Next leaf along the monocle chain, wrapping at either end.
pub fn monocle_neighbor(tree: &BspTree, from: NodeId, direction: Direction) -> Option<NodeId> {
    let root = tree.root()?;
    let next = if direction.is_forward() {
        tree.next_leaf(from).unwrap_or_else(|| tree.first_leaf(root))
    } else {
        tree.prev_leaf(from).unwrap_or_else(|| tree.last_leaf(root))
    };
    (next != from).then_some(next)
}

/// Neighbour of `from` in `direction` according to the space's mode.
pub fn neighbor(space: &VirtualSpace, from: NodeId, direction: Direction, wrap: bool) -> Option<NodeId> {
    match space.mode {
        SpaceMode::Monocle => monocle_neighbor(&space.tree, from, direction),
        SpaceMode::Bsp | SpaceMode::Float => {
            closest_in_direction(&space.tree, &space.display().frame, from, direction, wrap)
        }
    }
}

/// The leaf under `point`, or the one whose rectangle is nearest to it when
/// the point falls in a gap or on the padding.
pub fn nearest_leaf(tree: &BspTree, point: Point) -> Option<NodeId> {
    tree.leaf_at(point).or_else(|| {
        tree.leaves()
            .into_iter()
            .filter_map(|leaf| Some((leaf, tree.region(leaf)?.rect)))
            .map(|(leaf, rect)| {
                let dx = (rect.min_x() - point.x).max(point.x - rect.max_x()).max(0.0);
                let dy = (rect.min_y() - point.y).max(point.y - rect.max_y()).max(0.0);
                (leaf, dx.hypot(dy))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(leaf, _)| leaf)
    })
}

/// Frame for a floating window warped to `position` within `area`.
pub fn floating_target(position: FloatingPosition, area: Rect) -> Rect {
    let half_w = area.size.width / 2.0;
    let half_h = area.size.height / 2.0;
    let (x, y) = (area.min_x(), area.min_y());
    match position {
        FloatingPosition::Fullscreen => area,
        FloatingPosition::Left => Rect::from_xywh(x, y, half_w, area.size.height),
        FloatingPosition::Right => Rect::from_xywh(x + half_w, y, half_w, area.size.height),
        FloatingPosition::TopLeft => Rect::from_xywh(x, y, half_w, half_h),
        FloatingPosition::TopRight => Rect::from_xywh(x + half_w, y, half_w, half_h),
        FloatingPosition::BottomLeft => Rect::from_xywh(x, y + half_h, half_w, half_h),
        FloatingPosition::BottomRight => Rect::from_xywh(x + half_w, y + half_h, half_w, half_h),
        FloatingPosition::Center => {
            Rect::from_xywh(x + half_w / 2.0, y + half_h / 2.0, half_w, half_h)
        }
    }
}
