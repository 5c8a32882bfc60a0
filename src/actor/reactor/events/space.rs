use tracing::{debug, trace};

use crate::actor::reactor::Reactor;
use crate::sys::screen::DisplayId;

pub struct SpaceEventHandler;

impl SpaceEventHandler {
    /// Brings the newly visible desktop of `display_id` in line with the
    /// windows the window server reports on it, then lays it out.
    pub fn handle_space_changed(reactor: &Reactor, display_id: DisplayId) {
        let ws = &reactor.window_server;
        let Some(info) = ws.active_space(display_id) else {
            trace!(display = %display_id, "display has no active desktop");
            return;
        };
        let Some(mut space) = reactor.acquire(info) else {
            return;
        };

        let present: Vec<_> = ws
            .windows_on_space(info.id)
            .into_iter()
            .filter_map(|w| ws.window(w))
            .filter(|w| !w.is_minimized && !w.is_fullscreen)
            .collect();

        for gone in space.windows() {
            if !present.iter().any(|w| w.id == gone) {
                space.forget(gone);
            }
        }
        let defaults = reactor.split_settings();
        for window in &present {
            if !space.contains(window.id) {
                reactor.place(&mut space, window, &defaults);
            }
        }
        debug!(space = %info.id, windows = present.len(), "desktop became active");
        reactor.commit(space);
    }

    pub fn handle_displays_changed(reactor: &Reactor) {
        let insets = reactor.screen_insets();
        for id in reactor.registry.ids() {
            let Some(mut space) = reactor.registry.get(id) else {
                continue;
            };
            let display_id = space.display().id;
            let Some(display) = reactor.window_server.display(display_id) else {
                debug!(space = %id, display = %display_id, "display of space is gone");
                continue;
            };
            space.update_screen(display, insets);
            space.ensure_recomputed();
            let visible =
                reactor.window_server.active_space(display_id).is_some_and(|s| s.id == id);
            if visible {
                reactor.commit(space);
            }
        }
    }
}
