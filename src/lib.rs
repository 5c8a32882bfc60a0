pub mod actor;
pub mod common;
pub mod ipc;
pub mod layout_engine;
pub mod model;
pub mod replay;
pub mod server;
pub mod sys;
