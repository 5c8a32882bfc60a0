pub mod command;

pub use command::{
    Command, CommandError, ConfigCommand, DesktopCommand, DesktopToggle, FloatingPosition,
    MonitorCommand, QueryCommand, RuleCommand, Step, Target, WindowCommand, WindowToggle,
};
