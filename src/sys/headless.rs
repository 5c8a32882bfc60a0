//! In-memory window server. Drives the tiling core without an OS window
//! server behind it, for the headless daemon and for unit tests.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::common::collections::{HashMap, HashSet};
use crate::sys::geometry::{Point, Rect};
use crate::sys::screen::{Display, DisplayId, Dock, MenuBar, SpaceId, SpaceInfo};
use crate::sys::window_server::{WindowId, WindowInfo, WindowServer};

#[derive(Default)]
pub(crate) struct HeadlessState {
    pub windows: BTreeMap<WindowId, WindowInfo>,
    pub window_space: HashMap<WindowId, SpaceId>,
    pub displays: Vec<Display>,
    pub spaces: HashMap<DisplayId, Vec<SpaceInfo>>,
    pub active: HashMap<DisplayId, SpaceId>,
    pub sticky: HashSet<WindowId>,
    pub focused: Option<WindowId>,
    pub cursor: Point,
    pub menu_bar: MenuBar,
    pub dock: Dock,
    pub frame_writes: Vec<(WindowId, Rect)>,
}

/// Window server that keeps windows, displays and desktops in memory.
/// Frames written by the reactor are queued until taken.
#[derive(Default)]
pub struct HeadlessWindowServer {
    pub(crate) state: Mutex<HeadlessState>,
}

impl HeadlessWindowServer {
    /// One display of the given size with a single desktop (space 1). Menu
    /// bar and dock are hidden so the usable area equals the display bounds.
    pub fn single_display(width: f64, height: f64) -> Self {
        let ws = HeadlessWindowServer::default();
        {
            let mut state = ws.state.lock();
            state.menu_bar = MenuBar { autohide: true, height: 22.0 };
            state.dock = Dock { autohide: true, ..Dock::default() };
        }
        ws.add_display(DisplayId(1), Rect::from_xywh(0., 0., width, height), true);
        ws.add_space(DisplayId(1), SpaceId::new(1));
        ws
    }

    pub fn add_display(&self, id: DisplayId, frame: Rect, is_main: bool) {
        self.state.lock().displays.push(Display { id, frame, is_main });
    }

    /// Adds a desktop to `display`; the first desktop added becomes active.
    pub fn add_space(&self, display: DisplayId, space: SpaceId) {
        let mut state = self.state.lock();
        let list = state.spaces.entry(display).or_default();
        let desktop_index = list.len() + 1;
        list.push(SpaceInfo { id: space, display, desktop_index });
        state.active.entry(display).or_insert(space);
    }

    pub fn set_active_space(&self, display: DisplayId, space: SpaceId) {
        self.state.lock().active.insert(display, space);
    }

    pub fn add_window(&self, id: u32, owner: &str, space: SpaceId) -> WindowId {
        let wid = WindowId(id);
        let mut state = self.state.lock();
        state.windows.insert(wid, WindowInfo {
            id: wid,
            owner: owner.to_string(),
            name: format!("{owner} window {id}"),
            frame: Rect::from_xywh(100., 100., 400., 300.),
            is_fullscreen: false,
            is_minimized: false,
            is_movable: true,
            is_resizable: true,
        });
        state.window_space.insert(wid, space);
        wid
    }

    pub fn remove_window(&self, id: WindowId) {
        let mut state = self.state.lock();
        state.windows.remove(&id);
        state.window_space.remove(&id);
        if state.focused == Some(id) {
            state.focused = None;
        }
    }

    pub fn update_window(&self, id: WindowId, f: impl FnOnce(&mut WindowInfo)) {
        if let Some(info) = self.state.lock().windows.get_mut(&id) {
            f(info);
        }
    }

    pub fn set_focused(&self, id: Option<WindowId>) { self.state.lock().focused = id; }

    pub fn set_cursor(&self, point: Point) { self.state.lock().cursor = point; }

    #[cfg(test)]
    pub fn frame_of(&self, id: WindowId) -> Rect { self.state.lock().windows[&id].frame }

    pub fn take_frame_writes(&self) -> Vec<(WindowId, Rect)> {
        std::mem::take(&mut self.state.lock().frame_writes)
    }
}

impl WindowServer for HeadlessWindowServer {
    fn window(&self, id: WindowId) -> Option<WindowInfo> { self.state.lock().windows.get(&id).cloned() }

    fn windows_on_space(&self, space: SpaceId) -> Vec<WindowId> {
        let state = self.state.lock();
        state
            .windows
            .keys()
            .copied()
            .filter(|w| state.window_space.get(w) == Some(&space))
            .collect()
    }

    fn window_at_point(&self, point: Point) -> Option<WindowId> {
        let state = self.state.lock();
        let active: HashSet<SpaceId> = state.active.values().copied().collect();
        state
            .windows
            .values()
            .filter(|w| state.window_space.get(&w.id).is_some_and(|s| active.contains(s)))
            .find(|w| w.frame.contains(point))
            .map(|w| w.id)
    }

    fn set_frame(&self, id: WindowId, frame: Rect) {
        let mut state = self.state.lock();
        if let Some(info) = state.windows.get_mut(&id) {
            info.frame = frame;
            state.frame_writes.push((id, frame));
        }
    }

    fn set_position(&self, id: WindowId, origin: Point) {
        let mut state = self.state.lock();
        if let Some(info) = state.windows.get_mut(&id) {
            info.frame.origin = origin;
            let frame = info.frame;
            state.frame_writes.push((id, frame));
        }
    }

    fn focused_window(&self) -> Option<WindowId> { self.state.lock().focused }

    fn focus_window(&self, id: WindowId) { self.state.lock().focused = Some(id); }

    fn cursor_position(&self) -> Point { self.state.lock().cursor }

    fn warp_cursor(&self, point: Point) { self.state.lock().cursor = point; }

    fn displays(&self) -> Vec<Display> { self.state.lock().displays.clone() }

    fn active_space(&self, display: DisplayId) -> Option<SpaceInfo> {
        let state = self.state.lock();
        let active = *state.active.get(&display)?;
        state.spaces.get(&display)?.iter().find(|s| s.id == active).copied()
    }

    fn spaces(&self, display: DisplayId) -> Vec<SpaceInfo> {
        self.state.lock().spaces.get(&display).cloned().unwrap_or_default()
    }

    fn space_contains_window(&self, space: SpaceId, window: WindowId) -> bool {
        let state = self.state.lock();
        state.sticky.contains(&window) || state.window_space.get(&window) == Some(&space)
    }

    fn is_window_sticky(&self, window: WindowId) -> bool { self.state.lock().sticky.contains(&window) }

    fn move_window_to_space(&self, window: WindowId, space: SpaceId) {
        self.state.lock().window_space.insert(window, space);
    }

    fn menu_bar(&self) -> MenuBar { self.state.lock().menu_bar }

    fn dock(&self) -> Dock { self.state.lock().dock }
}
