//! The Reactor keeps the per-desktop tiling state coherent with the window
//! server.
//!
//! It receives lifecycle events from the run-loop thread and command lines
//! from the command server, mutates the virtual space involved while holding
//! its lock, and pushes the resulting frames to windows only after the lock
//! has been released.

mod error;
mod events;
mod placement;
mod query;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

pub use error::ReactorError;
pub use events::drag::MouseGestures;
use events::command::CommandEventHandler;
use events::space::SpaceEventHandler;
use events::window::WindowEventHandler;
pub use placement::distance;

use crate::common::config::{Config, Settings};
use crate::common::log::trace_misc;
use crate::common::store::ConfigStore;
use crate::ipc::Command;
use crate::layout_engine::{NodeId, ScreenInsets, SplitSettings};
use crate::model::{RuleSet, SpaceConfig, SpaceFlags, SpaceGuard, SpaceRegistry, VirtualSpace};
use crate::sys::geometry::{Rect, Size};
use crate::sys::overlay::BorderOverlay;
use crate::sys::screen::{Display, DisplayId, SpaceInfo};
use crate::sys::window_server::{WindowId, WindowInfo, WindowServer};

/// Lifecycle notifications delivered by the accessibility observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    WindowCreated(WindowId),
    WindowDestroyed(WindowId),
    WindowFocused(WindowId),
    WindowMoved(WindowId),
    WindowResized(WindowId),
    WindowMinimized(WindowId),
    WindowDeminimized(WindowId),
    /// The active desktop of a display changed.
    SpaceChanged(DisplayId),
    /// Displays were added, removed or rearranged, or the dock moved.
    DisplaysChanged,
}

pub struct Reactor {
    settings: Settings,
    store: ConfigStore,
    registry: SpaceRegistry,
    rules: RwLock<RuleSet>,
    window_server: Arc<dyn WindowServer>,
    overlay: Arc<dyn BorderOverlay>,
}

impl Reactor {
    pub fn new(
        config: &Config,
        window_server: Arc<dyn WindowServer>,
        overlay: Arc<dyn BorderOverlay>,
    ) -> Self {
        for issue in config.validate() {
            warn!("config: {issue}");
        }
        Self {
            settings: config.settings.clone(),
            store: ConfigStore::from_config(config),
            registry: SpaceRegistry::new(),
            rules: RwLock::new(RuleSet::from_settings(&config.rules)),
            window_server,
            overlay,
        }
    }

    pub fn registry(&self) -> &SpaceRegistry { &self.registry }

    pub fn store(&self) -> &ConfigStore { &self.store }

    pub fn handle_event(&self, event: Event) {
        trace!(?event, "event");
        match event {
            Event::WindowCreated(wid) | Event::WindowDeminimized(wid) => {
                WindowEventHandler::handle_window_created(self, wid)
            }
            Event::WindowDestroyed(wid) | Event::WindowMinimized(wid) => {
                WindowEventHandler::handle_window_destroyed(self, wid)
            }
            Event::WindowFocused(wid) => WindowEventHandler::handle_window_focused(self, wid),
            Event::WindowMoved(wid) | Event::WindowResized(wid) => {
                WindowEventHandler::handle_window_frame_changed(self, wid)
            }
            Event::SpaceChanged(display) => SpaceEventHandler::handle_space_changed(self, display),
            Event::DisplaysChanged => SpaceEventHandler::handle_displays_changed(self),
        }
    }

    /// Parses and runs one command line, returning the text written back to
    /// the client.
    pub fn handle_command(&self, line: &str) -> String {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                debug!(line, "rejected command: {e}");
                return format!("error: {e}\n");
            }
        };
        match trace_misc("command", || self.execute(command)) {
            Ok(response) => response,
            Err(e) => {
                debug!(line, "command failed: {e}");
                format!("error: {e}\n")
            }
        }
    }

    pub fn execute(&self, command: Command) -> Result<String, ReactorError> {
        debug!(?command);
        CommandEventHandler::handle(self, command)
    }

    fn screen_insets(&self) -> ScreenInsets {
        ScreenInsets {
            menu_bar: self.window_server.menu_bar(),
            dock: self.window_server.dock(),
            status_bar_top: self.settings.status_bar.top,
            status_bar_bottom: self.settings.status_bar.bottom,
        }
    }

    fn split_settings(&self) -> SplitSettings { self.settings.split_settings() }

    fn space_factory(
        &self,
        info: SpaceInfo,
        display: Display,
        insets: ScreenInsets,
    ) -> impl FnOnce() -> VirtualSpace + '_ {
        move || {
            VirtualSpace::new(
                info,
                display,
                insets,
                SpaceConfig {
                    optimal_ratio: self.settings.optimal_ratio,
                    ..SpaceConfig::resolve(&self.store, info.desktop_index)
                },
            )
        }
    }

    /// Locks the space described by `info`, creating it on first use. A new
    /// space adopts the windows the window server already reports on it.
    pub(crate) fn acquire(&self, info: SpaceInfo) -> Option<SpaceGuard> {
        let Some(display) = self.window_server.display(info.display) else {
            debug!(space = %info.id, display = %info.display, "display went away");
            return None;
        };
        let insets = self.screen_insets();
        let mut space =
            self.registry.acquire(info.id, self.space_factory(info, display.clone(), insets));
        self.prepare(&mut space, display, insets);
        Some(space)
    }

    /// Locks two distinct spaces without risking a lock-order inversion.
    pub(crate) fn acquire_pair(
        &self,
        a: SpaceInfo,
        b: SpaceInfo,
    ) -> Option<(SpaceGuard, SpaceGuard)> {
        let display_a = self.window_server.display(a.display)?;
        let display_b = self.window_server.display(b.display)?;
        let insets = self.screen_insets();
        let (mut ga, mut gb) = self.registry.acquire_pair(
            a.id,
            self.space_factory(a, display_a.clone(), insets),
            b.id,
            self.space_factory(b, display_b.clone(), insets),
        );
        self.prepare(&mut ga, display_a, insets);
        self.prepare(&mut gb, display_b, insets);
        Some((ga, gb))
    }

    fn prepare(&self, space: &mut VirtualSpace, display: Display, insets: ScreenInsets) {
        space.update_screen(display, insets);
        space.ensure_recomputed();
        if !space.flags.contains(SpaceFlags::INITIALIZED) {
            space.flags.insert(SpaceFlags::INITIALIZED);
            self.adopt_existing(space);
        }
    }

    fn adopt_existing(&self, space: &mut VirtualSpace) {
        let defaults = self.split_settings();
        for wid in self.window_server.windows_on_space(space.id) {
            let Some(info) = self.window_server.window(wid) else {
                continue;
            };
            if info.is_minimized || info.is_fullscreen {
                continue;
            }
            self.place(space, &info, &defaults);
        }
        debug!(space = %space.id, windows = space.windows().len(), "adopted existing windows");
    }

    /// Adds a window to a space, either into the tree or into the floating
    /// set depending on rules.
    fn place(
        &self,
        space: &mut VirtualSpace,
        info: &WindowInfo,
        defaults: &SplitSettings,
    ) -> Option<NodeId> {
        if self.should_float(info) {
            trace!(window = %info.id, "window floats");
            space.set_floating(info.id, true);
            None
        } else {
            space.tile(info.id, defaults)
        }
    }

    fn should_float(&self, info: &WindowInfo) -> bool {
        if self.window_server.is_window_sticky(info.id) {
            return true;
        }
        let float_non_resizable = self.settings.float_non_resizable;
        self.rules.read().should_float(info, float_non_resizable)
    }

    /// The desktop (on any display) that holds `window`.
    fn space_info_for_window(&self, window: WindowId) -> Option<SpaceInfo> {
        self.window_server.displays().iter().find_map(|display| {
            self.window_server
                .spaces(display.id)
                .into_iter()
                .find(|space| self.window_server.space_contains_window(space.id, window))
        })
    }

    /// Locks the registered space that tracks `window`.
    fn locate(&self, window: WindowId) -> Option<SpaceGuard> {
        for id in self.registry.ids() {
            if let Some(space) = self.registry.get(id) {
                if space.contains(window) {
                    return Some(space);
                }
            }
        }
        trace!(%window, "window is not tracked");
        None
    }

    /// Display commands act on: the one holding the focused window, then the
    /// one under the cursor.
    fn active_display(&self) -> Option<Display> {
        let ws = &self.window_server;
        ws.focused_window()
            .and_then(|w| ws.frame(w))
            .or_else(|| Some(Rect::new(ws.cursor_position(), Size::default())))
            .and_then(|rect| ws.display_for_rect(rect))
    }

    fn active_space_info(&self) -> Option<SpaceInfo> {
        let display = self.active_display()?;
        self.window_server.active_space(display.id)
    }

    pub(crate) fn active_space(&self) -> Result<SpaceGuard, ReactorError> {
        self.active_space_info()
            .and_then(|info| self.acquire(info))
            .ok_or(ReactorError::NoActiveSpace)
    }

    /// The active space and the leaf commands operate on: the focused
    /// window's leaf, else the insertion point.
    pub(crate) fn command_target(&self) -> Result<(SpaceGuard, NodeId), ReactorError> {
        let space = self.active_space()?;
        let focused = self.window_server.focused_window().and_then(|w| space.tree.leaf_of(w));
        let leaf = focused
            .or_else(|| space.insertion_point().map(|p| p.node))
            .filter(|n| space.tree.is_leaf(*n))
            .ok_or(ReactorError::NoFocusedWindow)?;
        Ok((space, leaf))
    }

    fn is_visible(&self, info: SpaceInfo) -> bool {
        self.window_server.active_space(info.display).is_some_and(|s| s.id == info.id)
    }

    /// Pushes frames to windows. Must be called without any space lock held.
    fn apply_frames(&self, frames: Vec<(WindowId, Rect)>) {
        for (window, frame) in frames {
            match self.window_server.frame(window) {
                None => trace!(%window, "window vanished before layout"),
                Some(current) if current == frame => {}
                Some(_) => {
                    trace!(%window, ?frame, "set frame");
                    self.window_server.set_frame(window, frame);
                }
            }
        }
    }

    /// Lays out `space` and releases it.
    fn commit(&self, space: SpaceGuard) {
        let frames = space.frames();
        self.registry.release(space);
        self.apply_frames(frames);
    }
}

impl Drop for Reactor {
    fn drop(&mut self) { self.registry.teardown(); }
}
