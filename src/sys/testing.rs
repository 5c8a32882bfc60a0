//! Recording doubles used by unit tests.

use parking_lot::Mutex;

use crate::sys::geometry::Rect;
use crate::sys::overlay::BorderOverlay;

#[derive(Default)]
pub(crate) struct RecordingOverlay {
    pub shown: Mutex<Vec<Vec<Rect>>>,
    pub cleared: Mutex<usize>,
}

impl RecordingOverlay {
    pub fn last_shown(&self) -> Option<Vec<Rect>> { self.shown.lock().last().cloned() }

    pub fn clear_count(&self) -> usize { *self.cleared.lock() }
}

impl BorderOverlay for RecordingOverlay {
    fn show_preselection(&self, rects: &[Rect]) { self.shown.lock().push(rects.to_vec()); }

    fn clear_preselection(&self) { *self.cleared.lock() += 1; }
}
