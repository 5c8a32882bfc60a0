//! Line-oriented event feed for the headless daemon.
//!
//! Each input line is one JSON object naming a window-server change or a
//! pointer event:
//!
//! ```text
//! {"open": {"id": 1, "owner": "Terminal"}}
//! {"mouse_down": {"button": "right", "modifiers": ["alt"], "x": 960, "y": 540, "ms": 0}}
//! {"command": {"line": "desktop --rotate 90"}}
//! ```
//!
//! The change is applied to the in-memory window server, the matching
//! reactor event is delivered, and every frame the reactor wrote since the
//! previous line is reported as one JSON object per line. Frames changed by
//! commands arriving over the command server are reported with the next
//! input line.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actor::reactor::{Event, MouseGestures, Reactor};
use crate::sys::event::{ModifierKey, Modifiers, MouseButton, MouseEvent};
use crate::sys::geometry::{Point, Rect};
use crate::sys::headless::HeadlessWindowServer;
use crate::sys::screen::{DisplayId, SpaceId};
use crate::sys::window_server::{WindowId, WindowServer};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Input {
    Open {
        id: u32,
        owner: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "first_space")]
        space: u64,
        #[serde(default = "resizable")]
        resizable: bool,
    },
    Close {
        id: u32,
    },
    Minimize {
        id: u32,
    },
    Restore {
        id: u32,
    },
    Focus {
        id: u32,
    },
    /// Makes `space` the active desktop of `display`.
    Desktop {
        display: u32,
        space: u64,
    },
    MouseDown {
        button: MouseButton,
        #[serde(default)]
        modifiers: Vec<ModifierKey>,
        x: f64,
        y: f64,
        ms: u64,
    },
    MouseDrag {
        x: f64,
        y: f64,
        ms: u64,
    },
    MouseUp {
        x: f64,
        y: f64,
        ms: u64,
    },
    Command {
        line: String,
    },
}

fn first_space() -> u64 { 1 }

fn resizable() -> bool { true }

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Output {
    Frame { window: WindowId, frame: Rect },
    Response { text: String },
    Error { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("invalid input: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("space id 0 is reserved")]
    ReservedSpace,
    #[error("window {0} does not exist")]
    UnknownWindow(WindowId),
}

pub struct EventFeed {
    reactor: Arc<Reactor>,
    window_server: Arc<HeadlessWindowServer>,
    gestures: MouseGestures,
}

impl EventFeed {
    pub fn new(reactor: Arc<Reactor>, window_server: Arc<HeadlessWindowServer>) -> Self {
        Self {
            reactor,
            window_server,
            gestures: MouseGestures::new(),
        }
    }

    /// Parses and applies one input line. Blank lines and `#` comments only
    /// flush pending frames.
    pub fn feed(&mut self, line: &str) -> Vec<Output> {
        let line = line.trim();
        let mut out = Vec::new();
        if !line.is_empty() && !line.starts_with('#') {
            let applied = serde_json::from_str::<Input>(line)
                .map_err(FeedError::from)
                .and_then(|input| self.apply(input));
            match applied {
                Ok(Some(text)) => out.push(Output::Response { text }),
                Ok(None) => {}
                Err(e) => {
                    warn!(line, "dropping input: {e}");
                    out.push(Output::Error { message: e.to_string() });
                }
            }
        }
        out.extend(
            self.window_server
                .take_frame_writes()
                .into_iter()
                .map(|(window, frame)| Output::Frame { window, frame }),
        );
        out
    }

    /// Feeds every line of `input`, writing outputs as JSON lines.
    pub fn run(&mut self, input: impl BufRead, mut output: impl Write) -> anyhow::Result<()> {
        for line in input.lines() {
            for out in self.feed(&line?) {
                serde_json::to_writer(&mut output, &out)?;
                output.write_all(b"\n")?;
            }
            output.flush()?;
        }
        debug!("event feed closed");
        Ok(())
    }

    fn apply(&mut self, input: Input) -> Result<Option<String>, FeedError> {
        let ws = &self.window_server;
        let event = match input {
            Input::Open { id, owner, name, space, resizable } => {
                let space = SpaceId::try_new(space).ok_or(FeedError::ReservedSpace)?;
                let wid = ws.add_window(id, &owner, space);
                ws.update_window(wid, |info| {
                    if let Some(name) = name {
                        info.name = name;
                    }
                    info.is_resizable = resizable;
                });
                ws.set_focused(Some(wid));
                self.reactor.handle_event(Event::WindowCreated(wid));
                Event::WindowFocused(wid)
            }
            Input::Close { id } => {
                let wid = self.existing(id)?;
                ws.remove_window(wid);
                Event::WindowDestroyed(wid)
            }
            Input::Minimize { id } => {
                let wid = self.existing(id)?;
                ws.update_window(wid, |info| info.is_minimized = true);
                Event::WindowMinimized(wid)
            }
            Input::Restore { id } => {
                let wid = self.existing(id)?;
                ws.update_window(wid, |info| info.is_minimized = false);
                Event::WindowDeminimized(wid)
            }
            Input::Focus { id } => {
                let wid = self.existing(id)?;
                ws.set_focused(Some(wid));
                Event::WindowFocused(wid)
            }
            Input::Desktop { display, space } => {
                let space = SpaceId::try_new(space).ok_or(FeedError::ReservedSpace)?;
                ws.set_active_space(DisplayId(display), space);
                Event::SpaceChanged(DisplayId(display))
            }
            Input::MouseDown { button, modifiers, x, y, ms } => {
                let location = self.pointer(x, y);
                self.gestures.handle(&self.reactor, MouseEvent::Down {
                    button,
                    modifiers: Modifiers::from_keys(&modifiers),
                    location,
                    timestamp: Duration::from_millis(ms),
                });
                return Ok(None);
            }
            Input::MouseDrag { x, y, ms } => {
                let location = self.pointer(x, y);
                self.gestures.handle(&self.reactor, MouseEvent::Dragged {
                    location,
                    timestamp: Duration::from_millis(ms),
                });
                return Ok(None);
            }
            Input::MouseUp { x, y, ms } => {
                let location = self.pointer(x, y);
                self.gestures.handle(&self.reactor, MouseEvent::Up {
                    location,
                    timestamp: Duration::from_millis(ms),
                });
                return Ok(None);
            }
            Input::Command { line } => return Ok(Some(self.reactor.handle_command(&line))),
        };
        self.reactor.handle_event(event);
        Ok(None)
    }

    fn existing(&self, id: u32) -> Result<WindowId, FeedError> {
        let wid = WindowId(id);
        self.window_server.window(wid).map(|_| wid).ok_or(FeedError::UnknownWindow(wid))
    }

    fn pointer(&self, x: f64, y: f64) -> Point {
        let location = Point::new(x, y);
        self.window_server.set_cursor(location);
        location
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::actor::reactor::testing::bare_config;
    use crate::sys::overlay::NoOverlay;

    fn feed() -> EventFeed {
        let ws = Arc::new(HeadlessWindowServer::single_display(1920., 1080.));
        let reactor = Arc::new(Reactor::new(&bare_config(), ws.clone(), Arc::new(NoOverlay)));
        EventFeed::new(reactor, ws)
    }

    fn frames(out: &[Output]) -> Vec<(u32, Rect)> {
        out.iter()
            .filter_map(|o| match o {
                Output::Frame { window, frame } => Some((window.0, *frame)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn opened_windows_are_tiled() {
        let mut feed = feed();
        let out = feed.feed(r#"{"open": {"id": 1, "owner": "Term"}}"#);
        assert_eq!(frames(&out), vec![(1, Rect::from_xywh(0., 0., 1920., 1080.))]);
        let out = feed.feed(r#"{"open": {"id": 2, "owner": "Term", "name": "logs"}}"#);
        assert_eq!(frames(&out), vec![
            (1, Rect::from_xywh(0., 0., 960., 1080.)),
            (2, Rect::from_xywh(960., 0., 960., 1080.)),
        ]);
        let out = feed.feed(r#"{"close": {"id": 1}}"#);
        assert_eq!(frames(&out), vec![(2, Rect::from_xywh(0., 0., 1920., 1080.))]);
    }

    #[test]
    fn commands_answer_inline() {
        let mut feed = feed();
        feed.feed(r#"{"open": {"id": 1, "owner": "Term"}}"#);
        feed.feed(r#"{"open": {"id": 2, "owner": "Term"}}"#);
        let out = feed.feed(r#"{"command": {"line": "query desktop windows"}}"#);
        assert_eq!(out, vec![Output::Response { text: "1 2\n".into() }]);
    }

    #[test]
    fn pointer_drag_resizes_columns() {
        let mut feed = feed();
        feed.feed(r#"{"open": {"id": 1, "owner": "Term"}}"#);
        feed.feed(r#"{"open": {"id": 2, "owner": "Term"}}"#);
        feed.feed(
            r#"{"mouse_down": {"button": "right", "modifiers": ["alt"], "x": 960, "y": 540, "ms": 0}}"#,
        );
        feed.feed(r#"{"mouse_drag": {"x": 1060, "y": 540, "ms": 10}}"#);
        let out = feed.feed(r#"{"mouse_up": {"x": 1060, "y": 540, "ms": 20}}"#);
        assert_eq!(frames(&out), vec![
            (1, Rect::from_xywh(0., 0., 1060., 1080.)),
            (2, Rect::from_xywh(1060., 0., 860., 1080.)),
        ]);
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let mut feed = feed();
        let input = concat!(
            "# comment\n",
            "not json\n",
            "{\"close\": {\"id\": 9}}\n",
            "{\"open\": {\"id\": 1, \"owner\": \"Term\", \"space\": 0}}\n",
            "{\"open\": {\"id\": 1, \"owner\": \"Term\"}}\n",
        );
        let mut output = Vec::new();
        feed.run(Cursor::new(input), &mut output).unwrap();
        let lines: Vec<_> = String::from_utf8(output).unwrap().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(r#"{"error":{"message":"invalid input"#), "{}", lines[0]);
        assert_eq!(lines[1], r#"{"error":{"message":"window 9 does not exist"}}"#);
        assert_eq!(lines[2], r#"{"error":{"message":"space id 0 is reserved"}}"#);
        assert!(lines[3].starts_with(r#"{"frame":{"window":1,"#), "{}", lines[3]);
    }
}
