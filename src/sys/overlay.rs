use crate::sys::geometry::Rect;

/// Border windows drawn over regions while a drag is in progress. Purely
/// visual, implementations must tolerate redundant calls.
pub trait BorderOverlay: Send + Sync {
    fn show_preselection(&self, rects: &[Rect]);
    fn clear_preselection(&self);
}

#[derive(Default, Debug, Clone, Copy)]
pub struct NoOverlay;

impl BorderOverlay for NoOverlay {
    fn show_preselection(&self, _rects: &[Rect]) {}

    fn clear_preselection(&self) {}
}
