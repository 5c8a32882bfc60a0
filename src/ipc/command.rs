//! Text command protocol.
//!
//! A line is split into tokens (double quotes group words), parsed by a clap
//! grammar and converted into an immutable [`Command`]. Parsing is
//! all-or-nothing: nothing is executed unless the whole line is valid.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use strum::{Display, EnumString};

use crate::common::store::Value;
use crate::layout_engine::{Direction, RatioAdjustment, Rotation, SpaceMode, Split};
use crate::model::rules::RuleAction;
use crate::sys::window_server::WindowId;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unterminated quote")]
    UnterminatedQuote,
    #[error("{0}")]
    Syntax(String),
    #[error("invalid argument: {0}")]
    Invalid(String),
}

/// `prev`, `next` or a 1-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Prev,
    Next,
    Index(usize),
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prev" => Ok(Target::Prev),
            "next" => Ok(Target::Next),
            _ => match s.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Target::Index(n)),
                _ => Err(format!("expected prev, next or an index starting at 1, got `{s}`")),
            },
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Prev => f.write_str("prev"),
            Target::Next => f.write_str("next"),
            Target::Index(n) => write!(f, "{n}"),
        }
    }
}

impl Target {
    /// Resolves the target against `len` entries with `current` selected.
    /// `prev` and `next` wrap around.
    pub fn resolve(self, current: usize, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        match self {
            Target::Prev => Some((current + len - 1) % len),
            Target::Next => Some((current + 1) % len),
            Target::Index(n) => (n <= len).then(|| n - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WindowToggle {
    Fullscreen,
    Parent,
    Float,
    Split,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum FloatingPosition {
    Fullscreen,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Step {
    Inc,
    Dec,
}

impl Step {
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            Step::Inc => amount,
            Step::Dec => -amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DesktopToggle {
    Offset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowCommand {
    Focus(Direction),
    Swap(Direction),
    /// `None` clears a pending insertion direction.
    UseInsertionPoint(Option<Direction>),
    Toggle(WindowToggle),
    Warp(Direction),
    WarpFloating(FloatingPosition),
    TemporaryRatio(f64),
    AdjustRatio {
        adjustment: RatioAdjustment,
        amount: f64,
        direction: Option<Direction>,
    },
    SendToDesktop(Target),
    SendToMonitor(Target),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DesktopCommand {
    Rotate(Rotation),
    Layout(SpaceMode),
    Toggle(DesktopToggle),
    Mirror(Split),
    Padding(Step),
    Gap(Step),
    Equalize,
    Serialize(PathBuf),
    Deserialize(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorCommand {
    Focus(Target),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryCommand {
    WindowDetails(WindowId),
    WindowList { json: bool },
    WindowFocused,
    DesktopTree,
    DesktopMode,
    DesktopWindows,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleCommand {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub except: Option<String>,
    pub action: RuleAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigCommand {
    Get(String),
    Set(String, Value),
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Window(WindowCommand),
    Desktop(DesktopCommand),
    Monitor(MonitorCommand),
    Query(QueryCommand),
    Rule(RuleCommand),
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
#[command(name = "riftc", no_binary_name = true, disable_help_subcommand = true)]
struct CommandLine {
    #[command(subcommand)]
    family: Family,
}

#[derive(Subcommand, Debug)]
enum Family {
    /// Act on the focused window
    Window(WindowArgs),
    /// Act on the active desktop
    Desktop(DesktopArgs),
    /// Act on monitors
    Monitor(MonitorArgs),
    /// Report state
    Query {
        #[command(subcommand)]
        target: QueryTarget,
    },
    /// Register a window rule
    Rule(RuleArgs),
    /// Read or change runtime settings
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct WindowArgs {
    #[arg(short = 'f', long, value_name = "DIR")]
    focus: Option<Direction>,
    #[arg(short = 's', long, value_name = "DIR")]
    swap: Option<Direction>,
    /// Direction, or `none` to clear
    #[arg(short = 'i', long = "use-insertion-point", value_name = "DIR")]
    insertion_point: Option<String>,
    #[arg(short = 't', long, value_name = "fullscreen|parent|float|split")]
    toggle: Option<WindowToggle>,
    #[arg(short = 'w', long, value_name = "DIR")]
    warp: Option<Direction>,
    #[arg(long, value_name = "POSITION")]
    warp_floating: Option<FloatingPosition>,
    #[arg(short = 'r', long, value_name = "RATIO")]
    temporary_ratio: Option<f64>,
    #[arg(long, num_args = 2..=3, value_names = ["expand|reduce", "AMOUNT", "DIR"])]
    adjust_ratio: Option<Vec<String>>,
    #[arg(short = 'd', long = "send-to-desktop", value_name = "prev|next|N")]
    desktop: Option<Target>,
    #[arg(short = 'm', long = "send-to-monitor", value_name = "prev|next|N")]
    monitor: Option<Target>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct DesktopArgs {
    #[arg(short = 'r', long, value_name = "90|180|270")]
    rotate: Option<Rotation>,
    #[arg(short = 'l', long, value_name = "bsp|monocle|float")]
    layout: Option<SpaceMode>,
    #[arg(short = 't', long, value_name = "offset")]
    toggle: Option<DesktopToggle>,
    #[arg(short = 'M', long, value_name = "vertical|horizontal")]
    mirror: Option<Split>,
    #[arg(short = 'p', long, value_name = "inc|dec")]
    padding: Option<Step>,
    #[arg(short = 'g', long, value_name = "inc|dec")]
    gap: Option<Step>,
    #[arg(short = 'e', long)]
    equalize: bool,
    #[arg(short = 'S', long, value_name = "PATH")]
    serialize: Option<PathBuf>,
    #[arg(short = 'D', long, value_name = "PATH")]
    deserialize: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MonitorArgs {
    #[arg(short = 'f', long, value_name = "prev|next|N")]
    focus: Target,
}

#[derive(Subcommand, Debug)]
enum QueryTarget {
    Window {
        #[command(subcommand)]
        what: WindowQuery,
    },
    Desktop {
        #[command(subcommand)]
        what: DesktopQuery,
    },
}

#[derive(Subcommand, Debug)]
enum WindowQuery {
    Details { id: u32 },
    List {
        #[arg(long)]
        json: bool,
    },
    Focused,
}

#[derive(Subcommand, Debug)]
enum DesktopQuery {
    Tree,
    Mode,
    Windows,
}

#[derive(Args, Debug)]
struct RuleArgs {
    #[arg(short = 'o', long)]
    owner: Option<String>,
    #[arg(short = 'n', long)]
    name: Option<String>,
    #[arg(short = 'e', long)]
    except: Option<String>,
    #[arg(long = "state", value_name = "float|tile")]
    action: RuleAction,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ConfigArgs {
    #[arg(long, value_name = "KEY")]
    get: Option<String>,
    #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
    set: Option<Vec<String>>,
    #[arg(long)]
    list: bool,
}

/// Splits a command line on whitespace. Double quotes group words into one
/// token.
pub fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if quoted {
        return Err(CommandError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_direction(raw: &str) -> Result<Direction, CommandError> {
    Direction::from_str(raw).map_err(|_| CommandError::Invalid(format!("unknown direction `{raw}`")))
}

fn ratio(raw: f64, what: &str) -> Result<f64, CommandError> {
    if raw > 0.0 && raw < 1.0 {
        Ok(raw)
    } else {
        Err(CommandError::Invalid(format!("{what} must be between 0 and 1, got {raw}")))
    }
}

impl WindowArgs {
    fn into_command(self) -> Result<WindowCommand, CommandError> {
        Ok(if let Some(d) = self.focus {
            WindowCommand::Focus(d)
        } else if let Some(d) = self.swap {
            WindowCommand::Swap(d)
        } else if let Some(raw) = self.insertion_point {
            match raw.as_str() {
                "none" | "clear" => WindowCommand::UseInsertionPoint(None),
                _ => WindowCommand::UseInsertionPoint(Some(parse_direction(&raw)?)),
            }
        } else if let Some(t) = self.toggle {
            WindowCommand::Toggle(t)
        } else if let Some(d) = self.warp {
            WindowCommand::Warp(d)
        } else if let Some(p) = self.warp_floating {
            WindowCommand::WarpFloating(p)
        } else if let Some(r) = self.temporary_ratio {
            WindowCommand::TemporaryRatio(ratio(r, "temporary ratio")?)
        } else if let Some(values) = self.adjust_ratio {
            let adjustment = RatioAdjustment::from_str(&values[0]).map_err(|_| {
                CommandError::Invalid(format!("expected expand or reduce, got `{}`", values[0]))
            })?;
            let amount = values[1]
                .parse::<f64>()
                .map_err(|_| CommandError::Invalid(format!("invalid amount `{}`", values[1])))
                .and_then(|a| ratio(a, "amount"))?;
            let direction = values.get(2).map(|d| parse_direction(d)).transpose()?;
            WindowCommand::AdjustRatio { adjustment, amount, direction }
        } else if let Some(t) = self.desktop {
            WindowCommand::SendToDesktop(t)
        } else if let Some(t) = self.monitor {
            WindowCommand::SendToMonitor(t)
        } else {
            return Err(CommandError::Syntax("window: missing action".into()));
        })
    }
}

impl DesktopArgs {
    fn into_command(self) -> Result<DesktopCommand, CommandError> {
        Ok(if let Some(r) = self.rotate {
            DesktopCommand::Rotate(r)
        } else if let Some(m) = self.layout {
            DesktopCommand::Layout(m)
        } else if let Some(t) = self.toggle {
            DesktopCommand::Toggle(t)
        } else if let Some(axis) = self.mirror {
            if axis == Split::Optimal {
                return Err(CommandError::Invalid("mirror needs vertical or horizontal".into()));
            }
            DesktopCommand::Mirror(axis)
        } else if let Some(s) = self.padding {
            DesktopCommand::Padding(s)
        } else if let Some(s) = self.gap {
            DesktopCommand::Gap(s)
        } else if self.equalize {
            DesktopCommand::Equalize
        } else if let Some(p) = self.serialize {
            DesktopCommand::Serialize(p)
        } else if let Some(p) = self.deserialize {
            DesktopCommand::Deserialize(p)
        } else {
            return Err(CommandError::Syntax("desktop: missing action".into()));
        })
    }
}

impl Command {
    /// Parses one command line.
    pub fn parse(line: &str) -> Result<Command, CommandError> {
        let tokens = tokenize(line)?;
        if tokens.is_empty() {
            return Err(CommandError::Empty);
        }
        let parsed = CommandLine::try_parse_from(&tokens)
            .map_err(|e| CommandError::Syntax(e.render().to_string().trim_end().to_string()))?;

        Ok(match parsed.family {
            Family::Window(args) => Command::Window(args.into_command()?),
            Family::Desktop(args) => Command::Desktop(args.into_command()?),
            Family::Monitor(args) => Command::Monitor(MonitorCommand::Focus(args.focus)),
            Family::Query { target } => Command::Query(match target {
                QueryTarget::Window { what } => match what {
                    WindowQuery::Details { id } => QueryCommand::WindowDetails(WindowId(id)),
                    WindowQuery::List { json } => QueryCommand::WindowList { json },
                    WindowQuery::Focused => QueryCommand::WindowFocused,
                },
                QueryTarget::Desktop { what } => match what {
                    DesktopQuery::Tree => QueryCommand::DesktopTree,
                    DesktopQuery::Mode => QueryCommand::DesktopMode,
                    DesktopQuery::Windows => QueryCommand::DesktopWindows,
                },
            }),
            Family::Rule(args) => {
                if args.owner.is_none() && args.name.is_none() {
                    return Err(CommandError::Invalid("rule needs --owner or --name".into()));
                }
                Command::Rule(RuleCommand {
                    owner: args.owner,
                    name: args.name,
                    except: args.except,
                    action: args.action,
                })
            }
            Family::Config(args) => Command::Config(if let Some(key) = args.get {
                ConfigCommand::Get(key)
            } else if let Some(mut kv) = args.set {
                let value = kv.pop().unwrap_or_default();
                let key = kv.pop().unwrap_or_default();
                let Ok(value) = value.parse::<Value>();
                ConfigCommand::Set(key, value)
            } else {
                ConfigCommand::List
            }),
        })
    }
}
