use tracing::{debug, trace};

use crate::actor::reactor::Reactor;
use crate::sys::window_server::WindowId;

pub struct WindowEventHandler;

impl WindowEventHandler {
    pub fn handle_window_created(reactor: &Reactor, wid: WindowId) {
        let Some(info) = reactor.window_server.window(wid) else {
            trace!(%wid, "created window already gone");
            return;
        };
        if info.is_minimized || info.is_fullscreen {
            trace!(%wid, "not tiling minimized or fullscreen window");
            return;
        }
        let Some(space_info) = reactor.space_info_for_window(wid) else {
            debug!(%wid, "window is not on any known desktop");
            return;
        };
        let Some(mut space) = reactor.acquire(space_info) else {
            return;
        };

        let steered = space.insertion_point().is_some_and(|p| p.direction.is_some());
        if !space.contains(wid) {
            let defaults = reactor.split_settings();
            reactor.place(&mut space, &info, &defaults);
        }
        let visible = reactor.is_visible(space_info);
        let frames = if visible { space.frames() } else { Vec::new() };
        reactor.registry.release(space);

        if steered {
            reactor.overlay.clear_preselection();
        }
        reactor.apply_frames(frames);
    }

    /// Also used for minimized windows, which give up their slot.
    pub fn handle_window_destroyed(reactor: &Reactor, wid: WindowId) {
        let Some(mut space) = reactor.locate(wid) else {
            return;
        };
        space.forget(wid);
        debug!(%wid, space = %space.id, "window left the layout");
        reactor.commit(space);
    }

    pub fn handle_window_focused(reactor: &Reactor, wid: WindowId) {
        let Some(space_info) = reactor.space_info_for_window(wid) else {
            return;
        };
        let Some(mut space) = reactor.acquire(space_info) else {
            return;
        };
        if let Some(leaf) = space.tree.leaf_of(wid) {
            space.set_insertion_node(Some(leaf));
        }
        reactor.commit(space);
    }

    /// Tiled windows moved or resized by anything but the layout are put back
    /// in their slot.
    pub fn handle_window_frame_changed(reactor: &Reactor, wid: WindowId) {
        let Some(space) = reactor.locate(wid) else {
            return;
        };
        if space.is_floating(wid) {
            return;
        }
        let frame = space.frames().into_iter().find(|(w, _)| *w == wid);
        reactor.registry.release(space);
        if let Some(frame) = frame {
            reactor.apply_frames(vec![frame]);
        }
    }
}
