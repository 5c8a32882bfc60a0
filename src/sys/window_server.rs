use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sys::geometry::{Point, Rect};
use crate::sys::screen::{Display, DisplayId, Dock, MenuBar, SpaceId, SpaceInfo};

/// Identifier of an OS window. The tiling core never owns windows, it only
/// stores these.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    /// Name of the owning application.
    pub owner: String,
    /// Window title.
    pub name: String,
    pub frame: Rect,
    pub is_fullscreen: bool,
    pub is_minimized: bool,
    pub is_movable: bool,
    pub is_resizable: bool,
}

/// Accessibility and window-registry collaborator.
///
/// Implementations wrap the OS APIs. Every call may block on IPC with the
/// window server, so callers must not hold a space lock across calls that
/// change OS state.
pub trait WindowServer: Send + Sync {
    fn window(&self, id: WindowId) -> Option<WindowInfo>;
    fn windows_on_space(&self, space: SpaceId) -> Vec<WindowId>;
    fn window_at_point(&self, point: Point) -> Option<WindowId>;

    fn set_frame(&self, id: WindowId, frame: Rect);
    fn set_position(&self, id: WindowId, origin: Point);

    fn focused_window(&self) -> Option<WindowId>;
    fn focus_window(&self, id: WindowId);

    fn cursor_position(&self) -> Point;
    fn warp_cursor(&self, point: Point);

    fn displays(&self) -> Vec<Display>;
    fn active_space(&self, display: DisplayId) -> Option<SpaceInfo>;
    /// All desktops of a display, in desktop order.
    fn spaces(&self, display: DisplayId) -> Vec<SpaceInfo>;
    fn space_contains_window(&self, space: SpaceId, window: WindowId) -> bool;
    fn is_window_sticky(&self, window: WindowId) -> bool;
    fn move_window_to_space(&self, window: WindowId, space: SpaceId);

    fn menu_bar(&self) -> MenuBar;
    fn dock(&self) -> Dock;

    fn frame(&self, id: WindowId) -> Option<Rect> { self.window(id).map(|w| w.frame) }

    fn display(&self, id: DisplayId) -> Option<Display> {
        self.displays().into_iter().find(|d| d.id == id)
    }

    /// The display whose bounds contain the centre of `rect`, falling back to
    /// the main display.
    fn display_for_rect(&self, rect: Rect) -> Option<Display> {
        let displays = self.displays();
        let center = rect.mid();
        displays
            .iter()
            .find(|d| d.frame.contains(center))
            .or_else(|| displays.iter().find(|d| d.is_main))
            .or_else(|| displays.first())
            .cloned()
    }
}
