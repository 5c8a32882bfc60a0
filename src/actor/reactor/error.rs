use thiserror::Error;

use crate::common::store::StoreError;
use crate::ipc::command::Target;
use crate::layout_engine::{Direction, LayoutFileError};
use crate::model::RuleError;
use crate::sys::window_server::WindowId;

/// Failure of a command that parsed but could not be carried out. The
/// message is written back to the client.
#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("no active desktop")]
    NoActiveSpace,
    #[error("no focused window")]
    NoFocusedWindow,
    #[error("window {0} does not exist")]
    UnknownWindow(WindowId),
    #[error("window {0} is not floating")]
    NotFloating(WindowId),
    #[error("no window to the {0}")]
    NoNeighbor(Direction),
    #[error("no split to adjust")]
    NoSplit,
    #[error("ratio {0} is out of range")]
    RatioOutOfRange(f64),
    #[error("no desktop {0}")]
    UnknownDesktop(Target),
    #[error("no monitor {0}")]
    UnknownMonitor(Target),
    #[error("unknown config key `{0}`")]
    UnknownKey(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Layout(#[from] LayoutFileError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("could not encode response: {0}")]
    Json(#[from] serde_json::Error),
}
