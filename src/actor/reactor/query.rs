//! Read-only state reports for the `query` command family.

use serde::Serialize;

use crate::actor::reactor::{Reactor, ReactorError};
use crate::ipc::command::QueryCommand;
use crate::sys::geometry::Rect;
use crate::sys::window_server::WindowId;

#[derive(Serialize, Debug, Clone, PartialEq)]
struct WindowSummary {
    id: WindowId,
    owner: String,
    name: String,
    frame: Rect,
    floating: bool,
}

impl WindowSummary {
    fn line(&self) -> String { format!("{}, {}, {}\n", self.id, self.owner, self.name) }
}

pub struct QueryHandler;

impl QueryHandler {
    pub fn handle(reactor: &Reactor, query: QueryCommand) -> Result<String, ReactorError> {
        match query {
            QueryCommand::WindowDetails(id) => Self::window_details(reactor, id),
            QueryCommand::WindowList { json } => {
                let windows = Self::window_list(reactor)?;
                if json {
                    Ok(serde_json::to_string(&windows)? + "\n")
                } else {
                    Ok(windows.iter().map(WindowSummary::line).collect())
                }
            }
            QueryCommand::WindowFocused => {
                let id = reactor
                    .window_server
                    .focused_window()
                    .ok_or(ReactorError::NoFocusedWindow)?;
                Ok(format!("{id}\n"))
            }
            QueryCommand::DesktopTree => Ok(reactor.active_space()?.tree.draw_tree()),
            QueryCommand::DesktopMode => Ok(format!("{}\n", reactor.active_space()?.mode)),
            QueryCommand::DesktopWindows => {
                let windows = reactor.active_space()?.windows();
                let ids: Vec<String> = windows.iter().map(ToString::to_string).collect();
                Ok(format!("{}\n", ids.join(" ")))
            }
        }
    }

    fn window_details(reactor: &Reactor, id: WindowId) -> Result<String, ReactorError> {
        let info = reactor.window_server.window(id).ok_or(ReactorError::UnknownWindow(id))?;
        let (space, state) = match reactor.locate(id) {
            Some(space) => {
                let state = if space.is_floating(id) { "floating" } else { "tiled" };
                (space.id.to_string(), state)
            }
            None => ("-".to_string(), "unmanaged"),
        };
        let f = info.frame;
        Ok(format!(
            "id: {}\nowner: {}\nname: {}\nframe: {} {} {} {}\nspace: {space}\nstate: {state}\n",
            info.id,
            info.owner,
            info.name,
            f.min_x(),
            f.min_y(),
            f.size.width,
            f.size.height,
        ))
    }

    /// Windows of the active desktop, tiled ones in tree order first.
    fn window_list(reactor: &Reactor) -> Result<Vec<WindowSummary>, ReactorError> {
        let space = reactor.active_space()?;
        let ids = space.windows();
        let floating: Vec<bool> = ids.iter().map(|w| space.is_floating(*w)).collect();
        reactor.registry.release(space);

        Ok(ids
            .into_iter()
            .zip(floating)
            .filter_map(|(id, floating)| {
                let info = reactor.window_server.window(id)?;
                Some(WindowSummary {
                    id,
                    owner: info.owner,
                    name: info.name,
                    frame: info.frame,
                    floating,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::actor::reactor::testing::Harness;

    #[test]
    fn window_queries() {
        let h = Harness::new();
        h.open(1, "Term");
        h.open(2, "Mail");
        assert_eq!(h.command("query window focused"), "2\n");
        assert_eq!(
            h.command("query window list"),
            "1, Term, Term window 1\n2, Mail, Mail window 2\n"
        );
        assert_eq!(
            h.command("query window details 2"),
            "id: 2\nowner: Mail\nname: Mail window 2\nframe: 960 0 960 1080\nspace: 1\nstate: tiled\n"
        );
        assert_eq!(h.command("query window details 9"), "error: window 9 does not exist\n");
    }

    #[test]
    fn window_list_as_json() {
        let h = Harness::new();
        h.open(1, "Term");
        let out = h.command("query window list --json");
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["id"], 1);
        assert_eq!(parsed[0]["owner"], "Term");
        assert_eq!(parsed[0]["floating"], false);
        assert_eq!(parsed[0]["frame"]["size"]["width"], 1920.0);
    }

    #[test]
    fn desktop_queries() {
        let h = Harness::new();
        assert_eq!(h.command("query desktop tree"), "<empty tree>\n");
        h.open(1, "Term");
        h.open(2, "Term");
        assert_eq!(h.command("query desktop mode"), "bsp\n");
        assert_eq!(h.command("query desktop windows"), "1 2\n");
        let tree = h.command("query desktop tree");
        assert!(tree.contains("vertical 0.500"), "{tree}");
        assert!(tree.contains("window 2"), "{tree}");
    }
}
