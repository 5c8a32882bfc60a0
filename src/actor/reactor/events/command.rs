use tracing::{debug, info};

use crate::actor::reactor::placement::{self, neighbor};
use crate::actor::reactor::query::QueryHandler;
use crate::actor::reactor::{Reactor, ReactorError};
use crate::common::store;
use crate::ipc::command::{
    ConfigCommand, DesktopCommand, DesktopToggle, MonitorCommand, RuleCommand, Target,
    WindowCommand, WindowToggle,
};
use crate::ipc::Command;
use crate::layout_engine::binary_tree::{MAX_RATIO, MIN_RATIO};
use crate::layout_engine::{Direction, RatioAdjustment, SpaceMode, SpawnPosition, Zoom};
use crate::model::virtual_space::resolve_layout_path;
use crate::model::{SpaceConfig, WindowRule};
use crate::sys::screen::{SpaceInfo, order_displays_by_position};
use crate::sys::window_server::WindowId;

type CommandResult = Result<String, ReactorError>;

fn done() -> CommandResult { Ok(String::new()) }

/// Stores `value` in `slot`, reporting whether it differed.
fn replace(slot: &mut f64, value: f64) -> bool {
    let changed = *slot != value;
    *slot = value;
    changed
}

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle(reactor: &Reactor, command: Command) -> CommandResult {
        match command {
            Command::Window(cmd) => Self::handle_window(reactor, cmd),
            Command::Desktop(cmd) => Self::handle_desktop(reactor, cmd),
            Command::Monitor(MonitorCommand::Focus(target)) => Self::focus_monitor(reactor, target),
            Command::Query(query) => QueryHandler::handle(reactor, query),
            Command::Rule(rule) => Self::add_rule(reactor, rule),
            Command::Config(cmd) => Self::handle_config(reactor, cmd),
        }
    }

    fn handle_window(reactor: &Reactor, cmd: WindowCommand) -> CommandResult {
        match cmd {
            WindowCommand::Focus(direction) => Self::focus_window(reactor, direction),
            WindowCommand::Swap(direction) => Self::swap_window(reactor, direction),
            WindowCommand::UseInsertionPoint(direction) => {
                Self::use_insertion_point(reactor, direction)
            }
            WindowCommand::Toggle(toggle) => Self::toggle_window(reactor, toggle),
            WindowCommand::Warp(direction) => Self::warp_window(reactor, direction),
            WindowCommand::WarpFloating(position) => {
                let wid = reactor
                    .window_server
                    .focused_window()
                    .ok_or(ReactorError::NoFocusedWindow)?;
                let space = reactor.active_space()?;
                let floats = space.is_floating(wid)
                    || (space.mode == SpaceMode::Float && space.contains(wid));
                if !floats {
                    return Err(ReactorError::NotFloating(wid));
                }
                let frame = placement::floating_target(position, space.usable_area());
                reactor.registry.release(space);
                reactor.window_server.set_frame(wid, frame);
                done()
            }
            WindowCommand::TemporaryRatio(ratio) => {
                if !(MIN_RATIO..=MAX_RATIO).contains(&ratio) {
                    return Err(ReactorError::RatioOutOfRange(ratio));
                }
                reactor.active_space()?.set_temporary_ratio(ratio);
                done()
            }
            WindowCommand::AdjustRatio { adjustment, amount, direction } => {
                Self::adjust_ratio(reactor, adjustment, amount, direction)
            }
            WindowCommand::SendToDesktop(target) => Self::send_to_desktop(reactor, target),
            WindowCommand::SendToMonitor(target) => Self::send_to_monitor(reactor, target),
        }
    }

    fn wraps(reactor: &Reactor) -> bool { reactor.settings.focus_wraps }

    pub fn focus_window(reactor: &Reactor, direction: Direction) -> CommandResult {
        let (mut space, from) = reactor.command_target()?;
        let target = neighbor(&space, from, direction, Self::wraps(reactor))
            .ok_or(ReactorError::NoNeighbor(direction))?;
        let window = space.tree.window(target).ok_or(ReactorError::NoNeighbor(direction))?;
        space.set_insertion_node(Some(target));
        reactor.registry.release(space);
        reactor.window_server.focus_window(window);
        done()
    }

    pub fn swap_window(reactor: &Reactor, direction: Direction) -> CommandResult {
        let (mut space, from) = reactor.command_target()?;
        let target = neighbor(&space, from, direction, Self::wraps(reactor))
            .ok_or(ReactorError::NoNeighbor(direction))?;
        space.tree.swap_ids(from, target);
        space.set_insertion_node(Some(target));
        reactor.commit(space);
        done()
    }

    /// Moves the insertion point to the neighbour in `direction`. The next
    /// window attaches there, on the side facing the current window. `None`
    /// drops the steering.
    pub fn use_insertion_point(reactor: &Reactor, direction: Option<Direction>) -> CommandResult {
        let (mut space, from) = reactor.command_target()?;
        let Some(direction) = direction else {
            space.set_insertion_direction(from, None);
            reactor.registry.release(space);
            reactor.overlay.clear_preselection();
            return done();
        };
        let target = neighbor(&space, from, direction, Self::wraps(reactor))
            .ok_or(ReactorError::NoNeighbor(direction))?;
        space.set_insertion_direction(target, Some(direction.opposite()));
        let preview = space.insertion_preview();
        reactor.registry.release(space);
        if let Some(region) = preview {
            reactor.overlay.show_preselection(&[region.rect]);
        }
        done()
    }

    fn toggle_window(reactor: &Reactor, toggle: WindowToggle) -> CommandResult {
        let zoom = match toggle {
            WindowToggle::Float => return Self::toggle_float(reactor),
            WindowToggle::Split => None,
            WindowToggle::Fullscreen => Some(Zoom::Fullscreen),
            WindowToggle::Parent => Some(Zoom::Parent),
        };
        let (mut space, leaf) = reactor.command_target()?;
        match zoom {
            Some(zoom) => {
                space.tree.toggle_zoom(leaf, zoom);
            }
            None => {
                if !space.tree.toggle_split(leaf) {
                    return Err(ReactorError::NoSplit);
                }
            }
        }
        reactor.commit(space);
        done()
    }

    fn toggle_float(reactor: &Reactor) -> CommandResult {
        let wid = reactor.window_server.focused_window().ok_or(ReactorError::NoFocusedWindow)?;
        let mut space = reactor.active_space()?;
        if space.is_floating(wid) {
            space.set_floating(wid, false);
            let defaults = reactor.split_settings();
            space.tile(wid, &defaults);
        } else if space.tree.contains(wid) {
            space.forget(wid);
            space.set_floating(wid, true);
        } else {
            return Err(ReactorError::UnknownWindow(wid));
        }
        debug!(%wid, floating = space.is_floating(wid), "toggled float");
        reactor.commit(space);
        done()
    }

    /// Moves the focused window next to its neighbour. Siblings just trade
    /// places.
    pub fn warp_window(reactor: &Reactor, direction: Direction) -> CommandResult {
        let (mut space, from) = reactor.command_target()?;
        let target = neighbor(&space, from, direction, false)
            .ok_or(ReactorError::NoNeighbor(direction))?;
        let window = space.tree.window(from).ok_or(ReactorError::NoFocusedWindow)?;
        let target_window =
            space.tree.window(target).ok_or(ReactorError::NoNeighbor(direction))?;

        if space.tree.parent(from) == space.tree.parent(target) {
            space.tree.swap_ids(from, target);
        } else {
            space.tree.untile(window);
            let mut settings = reactor.split_settings();
            settings.split = direction.crossed_split();
            settings.spawn =
                if direction.is_forward() { SpawnPosition::Left } else { SpawnPosition::Right };
            let anchor = space.tree.leaf_of(target_window);
            space.tree.tile_in(window, anchor, &settings);
        }
        let leaf = space.tree.leaf_of(window);
        space.set_insertion_node(leaf);
        reactor.commit(space);
        done()
    }

    fn adjust_ratio(
        reactor: &Reactor,
        adjustment: RatioAdjustment,
        amount: f64,
        direction: Option<Direction>,
    ) -> CommandResult {
        let (mut space, from) = reactor.command_target()?;
        let tree = &mut space.tree;
        let node = match direction {
            Some(direction) => tree.boundary_in_direction(from, direction),
            None => tree.parent(from),
        }
        .ok_or(ReactorError::NoSplit)?;
        let (first, _) = tree.children(node).ok_or(ReactorError::NoSplit)?;
        let on_first = first == from || tree.is_ancestor(first, from);
        let ratio = tree.get(node).and_then(|n| n.ratio()).ok_or(ReactorError::NoSplit)?;
        let new_ratio = ratio + adjustment.delta(amount, on_first);
        if !tree.set_ratio(node, new_ratio) {
            return Err(ReactorError::RatioOutOfRange(new_ratio));
        }
        reactor.commit(space);
        done()
    }

    fn send_to_desktop(reactor: &Reactor, target: Target) -> CommandResult {
        let wid = reactor.window_server.focused_window().ok_or(ReactorError::NoFocusedWindow)?;
        let source = reactor.space_info_for_window(wid).ok_or(ReactorError::UnknownWindow(wid))?;
        let desktops = reactor.window_server.spaces(source.display);
        let current = desktops.iter().position(|s| s.id == source.id).unwrap_or(0);
        let dest = target
            .resolve(current, desktops.len())
            .map(|i| desktops[i])
            .ok_or(ReactorError::UnknownDesktop(target))?;
        Self::move_window(reactor, wid, source, dest)
    }

    fn send_to_monitor(reactor: &Reactor, target: Target) -> CommandResult {
        let wid = reactor.window_server.focused_window().ok_or(ReactorError::NoFocusedWindow)?;
        let source = reactor.space_info_for_window(wid).ok_or(ReactorError::UnknownWindow(wid))?;
        let mut displays = reactor.window_server.displays();
        order_displays_by_position(&mut displays);
        let current = displays.iter().position(|d| d.id == source.display).unwrap_or(0);
        let dest = target
            .resolve(current, displays.len())
            .and_then(|i| reactor.window_server.active_space(displays[i].id))
            .ok_or(ReactorError::UnknownMonitor(target))?;
        Self::move_window(reactor, wid, source, dest)
    }

    fn move_window(
        reactor: &Reactor,
        wid: WindowId,
        source: SpaceInfo,
        dest: SpaceInfo,
    ) -> CommandResult {
        if source.id == dest.id {
            return done();
        }
        let (mut from, mut to) =
            reactor.acquire_pair(source, dest).ok_or(ReactorError::NoActiveSpace)?;
        let floating = from.is_floating(wid);
        from.forget(wid);
        if floating {
            to.set_floating(wid, true);
        } else {
            let defaults = reactor.split_settings();
            to.tile(wid, &defaults);
        }
        let from_frames = from.frames();
        let to_frames = if reactor.is_visible(dest) { to.frames() } else { Vec::new() };
        reactor.registry.release(from);
        reactor.registry.release(to);

        info!(%wid, from = %source.id, to = %dest.id, "moved window to desktop");
        reactor.window_server.move_window_to_space(wid, dest.id);
        reactor.apply_frames(from_frames);
        reactor.apply_frames(to_frames);
        done()
    }

    fn focus_monitor(reactor: &Reactor, target: Target) -> CommandResult {
        let mut displays = reactor.window_server.displays();
        order_displays_by_position(&mut displays);
        let current = reactor
            .active_display()
            .and_then(|d| displays.iter().position(|x| x.id == d.id))
            .unwrap_or(0);
        let display = target
            .resolve(current, displays.len())
            .map(|i| displays[i].clone())
            .ok_or(ReactorError::UnknownMonitor(target))?;
        let info = reactor
            .window_server
            .active_space(display.id)
            .ok_or(ReactorError::UnknownMonitor(target))?;
        let space = reactor.acquire(info).ok_or(ReactorError::UnknownMonitor(target))?;
        let window = space
            .insertion_point()
            .and_then(|p| space.tree.window(p.node))
            .or_else(|| space.tree.windows().first().copied());
        reactor.registry.release(space);

        if let Some(window) = window {
            reactor.window_server.focus_window(window);
        }
        reactor.window_server.warp_cursor(display.frame.mid());
        done()
    }

    fn handle_desktop(reactor: &Reactor, cmd: DesktopCommand) -> CommandResult {
        let mut space = reactor.active_space()?;
        match cmd {
            DesktopCommand::Rotate(rotation) => space.tree.rotate(rotation),
            DesktopCommand::Layout(mode) => space.set_mode(mode),
            DesktopCommand::Toggle(DesktopToggle::Offset) => space.toggle_offsets(),
            DesktopCommand::Mirror(axis) => space.tree.mirror(axis),
            DesktopCommand::Padding(step) => {
                let amount = reactor.settings.padding_step;
                space.adjust_padding(step.signed(amount));
            }
            DesktopCommand::Gap(step) => {
                let amount = reactor.settings.gap_step;
                space.adjust_gap(step.signed(amount));
            }
            DesktopCommand::Equalize => space.tree.equalize(),
            DesktopCommand::Serialize(path) => {
                let path = resolve_layout_path(&path);
                space.save_layout(&path)?;
                info!(path = %path.display(), "saved layout");
                return done();
            }
            DesktopCommand::Deserialize(path) => {
                let path = resolve_layout_path(&path);
                let defaults = reactor.split_settings();
                space.load_layout(&path, &defaults)?;
                info!(path = %path.display(), "restored layout");
            }
        }
        reactor.commit(space);
        done()
    }

    fn add_rule(reactor: &Reactor, rule: RuleCommand) -> CommandResult {
        let rule = WindowRule::new(
            rule.owner.as_deref(),
            rule.name.as_deref(),
            rule.except.as_deref(),
            rule.action,
        )?;
        reactor.rules.write().add(rule);
        done()
    }

    fn handle_config(reactor: &Reactor, cmd: ConfigCommand) -> CommandResult {
        match cmd {
            ConfigCommand::Get(key) => {
                let value = reactor.store.get(&key).ok_or(ReactorError::UnknownKey(key))?;
                Ok(format!("{value}\n"))
            }
            ConfigCommand::Set(key, value) => {
                reactor.store.set_checked(&key, value)?;
                Self::apply_config_key(reactor, &key);
                done()
            }
            ConfigCommand::List => Ok(reactor
                .store
                .entries()
                .into_iter()
                .map(|(key, value)| format!("{key} = {value}\n"))
                .collect()),
        }
    }

    /// Re-resolves the one setting `key` names on the spaces it covers.
    /// Values changed at runtime through other settings are left alone.
    fn apply_config_key(reactor: &Reactor, key: &str) {
        let (desktop, name) = store::split_key(key);
        for id in reactor.registry.ids() {
            let Some(mut space) = reactor.registry.get(id) else {
                continue;
            };
            if desktop.is_some_and(|d| d != space.desktop_index) {
                continue;
            }
            let config = SpaceConfig::resolve(&reactor.store, space.desktop_index);
            let changed = match name {
                store::MODE => {
                    let changed = space.mode != config.mode;
                    space.set_mode(config.mode);
                    changed
                }
                store::PADDING_TOP => replace(&mut space.padding.top, config.padding.top),
                store::PADDING_BOTTOM => replace(&mut space.padding.bottom, config.padding.bottom),
                store::PADDING_LEFT => replace(&mut space.padding.left, config.padding.left),
                store::PADDING_RIGHT => replace(&mut space.padding.right, config.padding.right),
                store::GAP => replace(&mut space.gap, config.gap),
                _ => false,
            };
            if !changed {
                continue;
            }
            debug!(space = %id, key, "applied config change");
            space.recompute();
            let display = space.display().id;
            if reactor.window_server.active_space(display).is_some_and(|s| s.id == id) {
                reactor.commit(space);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use crate::actor::reactor::testing::Harness;
    use crate::layout_engine::{SpaceMode, Split};
    use crate::sys::geometry::Rect;
    use crate::sys::screen::{DisplayId, SpaceId};

    const LEFT: Rect = Rect::from_xywh(0., 0., 960., 1080.);
    const RIGHT: Rect = Rect::from_xywh(960., 0., 960., 1080.);

    #[test]
    fn focus_east_wraps_to_the_left_column() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        assert_eq!(h.ws.frame_of(b), RIGHT);
        assert_eq!(h.command("window -f east"), "");
        assert_eq!(h.ws.state.lock().focused, Some(a));
    }

    #[test]
    fn focus_without_wrap_reports_missing_neighbor() {
        let mut config = crate::actor::reactor::testing::bare_config();
        config.settings.focus_wraps = false;
        let h = Harness::with_config(config);
        h.open(1, "Term");
        let b = h.open(2, "Term");
        assert_eq!(h.command("window -f east"), "error: no window to the east\n");
        assert_eq!(h.ws.state.lock().focused, Some(b));
    }

    #[test]
    fn swap_exchanges_frames() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        assert_eq!(h.command("window --swap west"), "");
        assert_eq!(h.ws.frame_of(a), RIGHT);
        assert_eq!(h.ws.frame_of(b), LEFT);
    }

    #[test]
    fn monocle_focus_walks_the_chain() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        let c = h.open(3, "Term");
        assert_eq!(h.command("desktop --layout monocle"), "");
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(0., 0., 1920., 1080.));
        h.command("window -f east");
        assert_eq!(h.ws.state.lock().focused, Some(a));
        h.focus(b);
        h.command("window -f west");
        assert_eq!(h.ws.state.lock().focused, Some(a));
        h.command("window -f west");
        assert_eq!(h.ws.state.lock().focused, Some(c));
    }

    #[test]
    fn insertion_point_steers_next_window() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        h.focus(b);
        assert_eq!(h.command("window -i west"), "");
        assert_eq!(h.overlay.last_shown(), Some(vec![Rect::from_xywh(480., 0., 480., 1080.)]));

        let c = h.ws.add_window(3, "Term", SpaceId::new(1));
        h.reactor.handle_event(crate::actor::reactor::Event::WindowCreated(c));
        assert_eq!(h.space(1).tree.windows(), vec![a, c, b]);
        assert_eq!(h.ws.frame_of(c), Rect::from_xywh(480., 0., 480., 1080.));
        assert_eq!(h.overlay.clear_count(), 1);
    }

    #[test]
    fn temporary_ratio_applies_once() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        assert_eq!(h.command("window -r 0.25"), "");
        let b = h.open(2, "Term");
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(0., 0., 480., 1080.));
        assert_eq!(h.ws.frame_of(b), Rect::from_xywh(480., 0., 1440., 1080.));
        assert_eq!(h.command("window -r 0.95"), "error: ratio 0.95 is out of range\n");
    }

    #[test]
    fn adjust_ratio_grows_the_focused_side() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        h.focus(a);
        assert_eq!(h.command("window --adjust-ratio expand 0.25"), "");
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(0., 0., 1440., 1080.));
        h.focus(b);
        assert_eq!(h.command("window --adjust-ratio expand 0.25 west"), "");
        assert_eq!(h.ws.frame_of(b), RIGHT);
        assert!(h.command("window --adjust-ratio reduce 0.5").starts_with("error: ratio"));
        assert_eq!(h.ws.frame_of(b), RIGHT);
    }

    #[test]
    fn zoom_and_float_toggles() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        h.command("window -t fullscreen");
        assert_eq!(h.ws.frame_of(b), Rect::from_xywh(0., 0., 1920., 1080.));
        h.command("window -t fullscreen");
        assert_eq!(h.ws.frame_of(b), RIGHT);

        h.command("window -t float");
        assert!(h.space(1).is_floating(b));
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(0., 0., 1920., 1080.));
        assert_eq!(h.command("window --warp-floating right"), "");
        assert_eq!(h.ws.frame_of(b), RIGHT);
        h.command("window -t float");
        assert!(!h.space(1).is_floating(b));

        h.focus(a);
        assert_eq!(h.command("window --warp-floating left"), "error: window 1 is not floating\n");
    }

    #[test]
    fn toggle_split_flips_parent_axis() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        h.command("window -t split");
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(0., 0., 1920., 540.));
        assert_eq!(h.ws.frame_of(b), Rect::from_xywh(0., 540., 1920., 540.));
    }

    #[test]
    fn warp_moves_window_next_to_neighbor() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        let c = h.open(3, "Term");
        // a | (b / c)
        h.focus(a);
        assert_eq!(h.command("window --warp east"), "");
        let space = h.space(1);
        let root = space.tree.root().unwrap();
        assert_eq!(space.tree.get(root).unwrap().split(), Some(Split::Horizontal));
        drop(space);
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(0., 0., 960., 540.));
        assert_eq!(h.ws.frame_of(b), Rect::from_xywh(960., 0., 960., 540.));
        assert_eq!(h.ws.frame_of(c), Rect::from_xywh(0., 540., 1920., 540.));
    }

    #[test]
    fn desktop_commands_relayout() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        h.command("desktop --rotate 180");
        assert_eq!(h.ws.frame_of(a), RIGHT);
        h.command("desktop -M vertical");
        assert_eq!(h.ws.frame_of(a), LEFT);
        h.command("desktop --padding inc");
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(10., 10., 950., 1060.));
        h.command("desktop --toggle offset");
        assert_eq!(h.ws.frame_of(a), LEFT);
        h.command("desktop --layout float");
        assert_eq!(h.space(1).mode, SpaceMode::Float);
        assert_eq!(h.ws.frame_of(b), RIGHT);
    }

    #[test]
    fn layout_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.bsp");
        let h = Harness::new();
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        h.command("window --adjust-ratio expand 0.25");
        assert_eq!(h.command(&format!("desktop -S \"{}\"", path.display())), "");
        h.command("desktop --equalize");
        assert_eq!(h.ws.frame_of(a), LEFT);
        assert_eq!(h.command(&format!("desktop -D \"{}\"", path.display())), "");
        assert_eq!(h.space(1).tree.windows(), vec![a, b]);
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(0., 0., 480., 1080.));
        assert_eq!(h.ws.frame_of(b), Rect::from_xywh(480., 0., 1440., 1080.));
    }

    #[test]
    fn send_to_desktop_moves_between_trees() {
        let h = Harness::new();
        h.ws.add_space(DisplayId(1), SpaceId::new(2));
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        assert_eq!(h.command("window -d 2"), "");
        assert_eq!(h.space(1).tree.windows(), vec![a]);
        assert_eq!(h.space(2).tree.windows(), vec![b]);
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(0., 0., 1920., 1080.));
        assert!(h.ws.state.lock().window_space.get(&b) == Some(&SpaceId::new(2)));
        assert_eq!(h.command("window -d 3"), "error: no desktop 3\n");
    }

    #[test]
    fn send_to_monitor_and_focus_monitor() {
        let h = Harness::new();
        h.ws.add_display(DisplayId(2), Rect::from_xywh(1920., 0., 1280., 800.), false);
        h.ws.add_space(DisplayId(2), SpaceId::new(3));
        let a = h.open(1, "Term");
        let b = h.open(2, "Term");
        assert_eq!(h.command("window -m next"), "");
        assert_eq!(h.ws.frame_of(b), Rect::from_xywh(1920., 0., 1280., 800.));
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(0., 0., 1920., 1080.));

        h.focus(a);
        assert_eq!(h.command("monitor -f 2"), "");
        assert_eq!(h.ws.state.lock().focused, Some(b));
        assert_eq!(h.ws.state.lock().cursor, Rect::from_xywh(1920., 0., 1280., 800.).mid());
        assert_eq!(h.command("monitor -f 3"), "error: no monitor 3\n");
    }

    #[test]
    fn config_set_updates_spaces() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        assert_eq!(h.command("config --get gap"), "0\n");
        assert_eq!(h.command("config --set 1_padding_left 100"), "");
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(100., 0., 1820., 1080.));
        assert!(h.command("config --list").contains("1_padding_left = 100\n"));
        assert_eq!(h.command("config --get nope"), "error: unknown config key `nope`\n");
    }

    #[test]
    fn config_set_rejects_malformed_values() {
        let h = Harness::new();
        h.open(1, "Term");
        assert_eq!(
            h.command("config --set gap wide"),
            "error: invalid value `wide` for `gap`: expected a non-negative number\n"
        );
        assert_eq!(
            h.command("config --set 1_mode diagonal"),
            "error: invalid value `diagonal` for `1_mode`: expected bsp, monocle or float\n"
        );
        assert_eq!(h.command("config --get gap"), "0\n");
        assert_eq!(h.command("config --get 1_mode"), "error: unknown config key `1_mode`\n");
        assert_eq!(h.space(1).gap, 0.0);
    }

    #[test]
    fn config_set_keeps_runtime_adjustments() {
        let h = Harness::new();
        let a = h.open(1, "Term");
        h.command("desktop --padding inc");
        let padded = Rect::from_xywh(10., 10., 1900., 1060.);
        assert_eq!(h.ws.frame_of(a), padded);

        assert_eq!(h.command("config --set gap 4"), "");
        assert_eq!(h.space(1).gap, 4.0);
        assert_eq!(h.command("config --set 2_padding_top 50"), "");
        assert_eq!(h.ws.frame_of(a), padded);

        assert_eq!(h.command("config --set padding_top 30"), "");
        assert_eq!(h.ws.frame_of(a), Rect::from_xywh(10., 30., 1900., 1040.));
        assert_eq!(h.command("config --set 1_mode monocle"), "");
        assert_eq!(h.space(1).mode, SpaceMode::Monocle);
        assert_eq!(h.space(1).padding.left, 10.0);
    }

    #[test]
    fn bad_rule_is_reported() {
        let h = Harness::new();
        assert!(h.command("rule --owner ( --state float").starts_with("error: invalid owner pattern"));
    }
}
