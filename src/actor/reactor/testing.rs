use std::sync::Arc;
use std::time::Duration;

use crate::actor::reactor::{Event, MouseGestures, Reactor};
use crate::common::config::{Config, PaddingSettings};
use crate::model::SpaceGuard;
use crate::sys::event::{Modifiers, MouseButton, MouseEvent};
use crate::sys::geometry::Point;
use crate::sys::headless::HeadlessWindowServer;
use crate::sys::screen::SpaceId;
use crate::sys::testing::RecordingOverlay;
use crate::sys::window_server::WindowId;

/// Defaults without padding or gaps, so frames are easy to read.
pub fn bare_config() -> Config {
    let mut config = Config::default();
    config.space.padding = PaddingSettings { top: 0.0, bottom: 0.0, left: 0.0, right: 0.0 };
    config.space.gap = 0.0;
    config
}

pub struct Harness {
    pub ws: Arc<HeadlessWindowServer>,
    pub overlay: Arc<RecordingOverlay>,
    pub reactor: Reactor,
    pub gestures: MouseGestures,
}

impl Harness {
    pub fn new() -> Self { Self::with_config(bare_config()) }

    pub fn with_config(config: Config) -> Self {
        let ws = Arc::new(HeadlessWindowServer::single_display(1920., 1080.));
        let overlay = Arc::new(RecordingOverlay::default());
        let reactor = Reactor::new(&config, ws.clone(), overlay.clone());
        Self { ws, overlay, reactor, gestures: MouseGestures::new() }
    }

    /// Creates a window on the first desktop and focuses it, the way a newly
    /// launched window normally is.
    pub fn open(&self, id: u32, owner: &str) -> WindowId {
        self.open_on(id, owner, SpaceId::new(1))
    }

    pub fn open_on(&self, id: u32, owner: &str, space: SpaceId) -> WindowId {
        let wid = self.ws.add_window(id, owner, space);
        self.reactor.handle_event(Event::WindowCreated(wid));
        self.focus(wid);
        wid
    }

    pub fn focus(&self, wid: WindowId) {
        self.ws.set_focused(Some(wid));
        self.reactor.handle_event(Event::WindowFocused(wid));
    }

    pub fn command(&self, line: &str) -> String { self.reactor.handle_command(line) }

    pub fn space(&self, id: u64) -> SpaceGuard {
        self.reactor.registry().get(SpaceId::new(id)).expect("space should be registered")
    }

    pub fn mouse_down(&mut self, button: MouseButton, x: f64, y: f64, ms: u64) {
        self.gestures.handle(&self.reactor, MouseEvent::Down {
            button,
            modifiers: Modifiers::ALT,
            location: Point::new(x, y),
            timestamp: Duration::from_millis(ms),
        });
    }

    pub fn mouse_drag(&mut self, x: f64, y: f64, ms: u64) {
        self.gestures.handle(&self.reactor, MouseEvent::Dragged {
            location: Point::new(x, y),
            timestamp: Duration::from_millis(ms),
        });
    }

    pub fn mouse_up(&mut self, x: f64, y: f64, ms: u64) {
        self.gestures.handle(&self.reactor, MouseEvent::Up {
            location: Point::new(x, y),
            timestamp: Duration::from_millis(ms),
        });
    }
}
