//! Mouse-driven swap and resize.
//!
//! One [`MouseGestures`] value lives on the run-loop thread and receives every
//! pointer event in order. A session starts on a button-down carrying the
//! configured modifiers, tracks drags and commits on button-up. Tree changes
//! during a drag only move preselection borders; windows are laid out once
//! the button is released.

use std::mem;
use std::time::Duration;

use tracing::{debug, trace};

use crate::actor::reactor::Reactor;
use crate::actor::reactor::placement::{closest_in_direction, nearest_leaf};
use crate::layout_engine::binary_tree::{MAX_RATIO, MIN_RATIO};
use crate::layout_engine::{Direction, NodeId, ResizeCorner, SpaceMode, Split};
use crate::model::{Preselection, PreselectionKind, VirtualSpace};
use crate::sys::event::MouseEvent;
use crate::sys::geometry::{Point, Rect, Size};
use crate::sys::screen::SpaceId;
use crate::sys::window_server::WindowId;

/// A split whose ratio follows the cursor during a resize.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ResizeAnchor {
    node: NodeId,
    axis: Split,
    initial_ratio: f64,
    /// Size of the split's region along its axis.
    extent: f64,
}

#[derive(Debug, Default)]
enum Session {
    #[default]
    Idle,
    Swap {
        space: SpaceId,
        anchor: NodeId,
        target: Option<NodeId>,
    },
    Resize {
        space: SpaceId,
        press: Point,
        anchors: Vec<ResizeAnchor>,
    },
    MoveFloating {
        window: WindowId,
        press: Point,
        initial: Rect,
        last_update: Duration,
    },
    ResizeFloating {
        window: WindowId,
        press: Point,
        initial: Rect,
        corner: ResizeCorner,
        last_update: Duration,
    },
}

#[derive(Debug, Default)]
pub struct MouseGestures {
    session: Session,
}

impl MouseGestures {
    pub fn new() -> Self { Self::default() }

    pub fn is_active(&self) -> bool { !matches!(self.session, Session::Idle) }

    pub fn handle(&mut self, reactor: &Reactor, event: MouseEvent) {
        match event {
            MouseEvent::Down { button, modifiers, location, timestamp } => {
                if self.is_active() {
                    trace!(?button, "gesture in progress, ignoring button down");
                    return;
                }
                let mouse = reactor.settings.mouse.clone();
                if modifiers != mouse.modifier_flags() {
                    return;
                }
                let resize = if button == mouse.resize_button {
                    true
                } else if button == mouse.move_button {
                    false
                } else {
                    return;
                };
                self.session = begin(reactor, resize, location, timestamp);
                if self.is_active() {
                    debug!(session = ?self.session, "gesture started");
                }
            }
            MouseEvent::Dragged { location, timestamp } => self.dragged(reactor, location, timestamp),
            MouseEvent::Up { location, .. } => {
                let session = mem::take(&mut self.session);
                finish(reactor, session, location);
            }
        }
    }

    fn dragged(&mut self, reactor: &Reactor, location: Point, timestamp: Duration) {
        match &mut self.session {
            Session::Idle => {}
            Session::Swap { space, anchor, target } => {
                let Some(mut guard) = reactor.registry.get(*space) else {
                    return;
                };
                let hovered = guard
                    .tree
                    .leaf_at(location)
                    .filter(|l| *l != *anchor && guard.tree.window(*l).is_some());
                if hovered == *target {
                    return;
                }
                *target = hovered;
                guard.tree.clear_preselection();
                let rects = match hovered {
                    Some(leaf) => {
                        guard.tree.set_preselected(leaf, true);
                        guard.preselection =
                            Some(Preselection { kind: PreselectionKind::Swap, nodes: vec![leaf] });
                        guard.preselection_rects()
                    }
                    None => {
                        guard.preselection = None;
                        Vec::new()
                    }
                };
                reactor.registry.release(guard);
                show(reactor, &rects);
            }
            Session::Resize { space, press, anchors } => {
                let Some(mut guard) = reactor.registry.get(*space) else {
                    return;
                };
                let threshold = reactor.settings.resize_threshold;
                let dx = location.x - press.x;
                let dy = location.y - press.y;
                let mut changed = false;
                for anchor in anchors.iter() {
                    let delta = match anchor.axis {
                        Split::Horizontal => dy,
                        Split::Vertical | Split::Optimal => dx,
                    };
                    if anchor.extent <= 0.0 {
                        continue;
                    }
                    let ratio = anchor.initial_ratio + delta / anchor.extent;
                    if !(MIN_RATIO..=MAX_RATIO).contains(&ratio) {
                        trace!(ratio, "resize out of range");
                        continue;
                    }
                    let Some(current) = guard.tree.get(anchor.node).and_then(|n| n.ratio()) else {
                        continue;
                    };
                    if (ratio - current).abs() <= threshold {
                        continue;
                    }
                    changed |= guard.tree.set_ratio(anchor.node, ratio);
                }
                if !changed {
                    return;
                }
                let rects = guard.preselection_rects();
                reactor.registry.release(guard);
                show(reactor, &rects);
            }
            Session::MoveFloating { window, press, initial, last_update } => {
                if !throttle_elapsed(reactor, last_update, timestamp) {
                    return;
                }
                let origin = Point::new(
                    initial.origin.x + location.x - press.x,
                    initial.origin.y + location.y - press.y,
                );
                if reactor.window_server.frame(*window).is_some() {
                    reactor.window_server.set_position(*window, origin);
                }
            }
            Session::ResizeFloating { window, press, initial, corner, last_update } => {
                if !throttle_elapsed(reactor, last_update, timestamp) {
                    return;
                }
                let frame = corner.resize(*initial, location.x - press.x, location.y - press.y);
                if reactor.window_server.frame(*window).is_some() {
                    reactor.window_server.set_frame(*window, frame);
                }
            }
        }
    }
}

/// Whether enough event time has passed since the last floating update.
/// Records `now` when it has.
fn throttle_elapsed(reactor: &Reactor, last_update: &mut Duration, now: Duration) -> bool {
    let interval = Duration::from_millis(reactor.settings.float_throttle_ms);
    if now.saturating_sub(*last_update) < interval {
        return false;
    }
    *last_update = now;
    true
}

fn show(reactor: &Reactor, rects: &[Rect]) {
    if rects.is_empty() {
        reactor.overlay.clear_preselection();
    } else {
        reactor.overlay.show_preselection(rects);
    }
}

fn begin(reactor: &Reactor, resize: bool, location: Point, timestamp: Duration) -> Session {
    let ws = &reactor.window_server;
    let Some(display) = ws.display_for_rect(Rect::new(location, Size::default())) else {
        return Session::Idle;
    };
    let Some(info) = ws.active_space(display.id) else {
        return Session::Idle;
    };
    let Some(mut space) = reactor.acquire(info) else {
        return Session::Idle;
    };

    if let Some(window) = ws.window_at_point(location) {
        let floating = space.is_floating(window)
            || (space.mode == SpaceMode::Float && space.contains(window));
        if floating {
            reactor.registry.release(space);
            let Some(initial) = ws.frame(window) else {
                return Session::Idle;
            };
            return if resize {
                let corner = ResizeCorner::from_cursor_position(location, initial.mid());
                Session::ResizeFloating { window, press: location, initial, corner, last_update: timestamp }
            } else {
                Session::MoveFloating { window, press: location, initial, last_update: timestamp }
            };
        }
    }
    if space.mode == SpaceMode::Float {
        return Session::Idle;
    }

    if !resize {
        let Some(anchor) = space.tree.leaf_at(location).filter(|l| space.tree.window(*l).is_some())
        else {
            return Session::Idle;
        };
        return Session::Swap { space: space.id, anchor, target: None };
    }

    let anchors = resize_anchors(&space, location);
    if anchors.is_empty() {
        trace!("nothing to resize under the cursor");
        return Session::Idle;
    }
    for anchor in &anchors {
        space.tree.set_preselected(anchor.node, true);
    }
    space.preselection = Some(Preselection {
        kind: PreselectionKind::Resize,
        nodes: anchors.iter().map(|a| a.node).collect(),
    });
    let rects = space.preselection_rects();
    let id = space.id;
    reactor.registry.release(space);
    show(reactor, &rects);
    Session::Resize { space: id, press: location, anchors }
}

/// Splits governing the boundaries nearest to `location`: one between
/// columns and one between rows, each the common ancestor of the leaf under
/// the cursor and its neighbour across that boundary. A leaf on the edge of
/// the display falls back to the neighbour on its other side.
fn resize_anchors(space: &VirtualSpace, location: Point) -> Vec<ResizeAnchor> {
    let tree = &space.tree;
    let Some(leaf) = nearest_leaf(tree, location) else {
        return Vec::new();
    };
    let Some(region) = tree.region(leaf) else {
        return Vec::new();
    };
    let mid = region.rect.mid();
    let horizontal = if location.x >= mid.x { Direction::East } else { Direction::West };
    let vertical = if location.y >= mid.y { Direction::South } else { Direction::North };

    let display = space.display().frame;
    let mut anchors = Vec::new();
    for direction in [horizontal, vertical] {
        let neighbour = closest_in_direction(tree, &display, leaf, direction, false)
            .or_else(|| closest_in_direction(tree, &display, leaf, direction.opposite(), false));
        let Some(other) = neighbour else {
            continue;
        };
        let axis = direction.crossed_split();
        let governing = tree.lowest_common_ancestor(leaf, other).and_then(|lca| {
            std::iter::once(lca)
                .chain(tree.ancestors(lca))
                .find(|n| tree.get(*n).and_then(|node| node.split()) == Some(axis))
        });
        let Some(node) = governing else {
            continue;
        };
        if anchors.iter().any(|a: &ResizeAnchor| a.node == node) {
            continue;
        }
        let (Some(ratio), Some(region)) =
            (tree.get(node).and_then(|n| n.ratio()), tree.region(node))
        else {
            continue;
        };
        let extent = match axis {
            Split::Horizontal => region.rect.size.height,
            Split::Vertical | Split::Optimal => region.rect.size.width,
        };
        anchors.push(ResizeAnchor { node, axis, initial_ratio: ratio, extent });
    }
    anchors
}

fn finish(reactor: &Reactor, session: Session, location: Point) {
    match session {
        Session::Idle => {}
        Session::Swap { space, anchor, target } => {
            let Some(mut guard) = reactor.registry.get(space) else {
                return;
            };
            guard.tree.clear_preselection();
            guard.preselection = None;
            let swapped = match target {
                Some(target) => guard.tree.swap_ids(anchor, target),
                None => false,
            };
            debug!(swapped, "swap gesture finished");
            reactor.overlay.clear_preselection();
            if swapped {
                reactor.commit(guard);
            }
        }
        Session::Resize { space, .. } => {
            let Some(mut guard) = reactor.registry.get(space) else {
                return;
            };
            guard.tree.clear_preselection();
            guard.preselection = None;
            debug!(space = %space, "resize gesture finished");
            reactor.overlay.clear_preselection();
            reactor.commit(guard);
        }
        Session::MoveFloating { window, press, initial, .. } => {
            let origin = Point::new(
                initial.origin.x + location.x - press.x,
                initial.origin.y + location.y - press.y,
            );
            if reactor.window_server.frame(window).is_some() {
                reactor.window_server.set_position(window, origin);
            }
        }
        Session::ResizeFloating { window, press, initial, corner, .. } => {
            let frame = corner.resize(initial, location.x - press.x, location.y - press.y);
            if reactor.window_server.frame(window).is_some() {
                reactor.window_server.set_frame(window, frame);
            }
        }
    }
}
