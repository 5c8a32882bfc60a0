use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::collections::BTreeMap;
use crate::layout_engine::{
    DEFAULT_OPTIMAL_RATIO, Padding, SpaceMode, SpawnPosition, Split, SplitSettings,
};
use crate::model::rules::RuleAction;
use crate::sys::event::{ModifierKey, Modifiers, MouseButton};

pub fn data_dir() -> PathBuf { dirs::home_dir().unwrap_or_default().join(".rift-tiler") }
pub fn layouts_dir() -> PathBuf { data_dir().join("layouts") }
pub fn config_file() -> PathBuf { dirs::home_dir().unwrap_or_default().join(".rift-tiler.toml") }

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub space: SpaceSettings,
    #[serde(default)]
    pub rules: Vec<RuleSettings>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Ratio given to the first child of a new split.
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,
    /// Width/height ratio at or above which an optimal split is vertical.
    #[serde(default = "default_optimal_ratio")]
    pub optimal_ratio: f64,
    #[serde(default)]
    pub split: Split,
    /// Whether a new window becomes the left or the right child.
    #[serde(default)]
    pub spawn: SpawnPosition,
    /// Directional focus and swap wrap around the display edges.
    #[serde(default = "yes")]
    pub focus_wraps: bool,
    /// Windows that cannot be resized float unless a `tile` rule matches.
    #[serde(default = "yes")]
    pub float_non_resizable: bool,
    /// Minimum time between floating move/resize updates during a drag.
    #[serde(default = "default_float_throttle_ms")]
    pub float_throttle_ms: u64,
    /// Smallest ratio change a drag resize will apply.
    #[serde(default = "default_resize_threshold")]
    pub resize_threshold: f64,
    #[serde(default = "default_step")]
    pub padding_step: f64,
    #[serde(default = "default_step")]
    pub gap_step: f64,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default)]
    pub status_bar: StatusBarSettings,
    #[serde(default)]
    pub mouse: MouseSettings,
}

/// Space reserved for a third-party status bar on every display.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct StatusBarSettings {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub bottom: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct MouseSettings {
    /// Modifiers that must be held for a drag to start a gesture.
    #[serde(default = "default_mouse_modifiers")]
    pub modifiers: Vec<ModifierKey>,
    /// Swaps tiled windows, moves floating ones.
    #[serde(default = "default_move_button")]
    pub move_button: MouseButton,
    /// Resizes tiled splits and floating windows.
    #[serde(default = "default_resize_button")]
    pub resize_button: MouseButton,
}

impl MouseSettings {
    pub fn modifier_flags(&self) -> Modifiers { Modifiers::from_keys(&self.modifiers) }
}

impl Default for MouseSettings {
    fn default() -> Self {
        Self {
            modifiers: default_mouse_modifiers(),
            move_button: default_move_button(),
            resize_button: default_resize_button(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct PaddingSettings {
    #[serde(default = "default_padding")]
    pub top: f64,
    #[serde(default = "default_padding")]
    pub bottom: f64,
    #[serde(default = "default_padding")]
    pub left: f64,
    #[serde(default = "default_padding")]
    pub right: f64,
}

impl Default for PaddingSettings {
    fn default() -> Self {
        let p = default_padding();
        Self { top: p, bottom: p, left: p, right: p }
    }
}

impl From<&PaddingSettings> for Padding {
    fn from(p: &PaddingSettings) -> Self {
        Padding {
            top: p.top,
            bottom: p.bottom,
            left: p.left,
            right: p.right,
        }
    }
}

/// Defaults for every space. Individual desktops can override them under
/// `[space.overrides.<desktop index>]`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SpaceSettings {
    #[serde(default)]
    pub mode: SpaceMode,
    #[serde(default)]
    pub padding: PaddingSettings,
    #[serde(default = "default_gap")]
    pub gap: f64,
    /// Layout file restored when the space is first seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, SpaceOverride>,
}

impl Default for SpaceSettings {
    fn default() -> Self {
        Self {
            mode: SpaceMode::default(),
            padding: PaddingSettings::default(),
            gap: default_gap(),
            layout: None,
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct SpaceOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SpaceMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<PaddingSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<PathBuf>,
}

/// A window rule as written in the config file. Patterns are regular
/// expressions matched against the owning application and the title.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct RuleSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Titles matching this pattern are excluded from the rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub except: Option<String>,
    pub action: RuleAction,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            split_ratio: default_split_ratio(),
            optimal_ratio: default_optimal_ratio(),
            split: Split::default(),
            spawn: SpawnPosition::default(),
            focus_wraps: true,
            float_non_resizable: true,
            float_throttle_ms: default_float_throttle_ms(),
            resize_threshold: default_resize_threshold(),
            padding_step: default_step(),
            gap_step: default_step(),
            server_port: default_server_port(),
            status_bar: StatusBarSettings::default(),
            mouse: MouseSettings::default(),
        }
    }
}

impl Settings {
    pub fn split_settings(&self) -> SplitSettings {
        SplitSettings {
            split: self.split,
            ratio: self.split_ratio,
            optimal_ratio: self.optimal_ratio,
            spawn: self.spawn,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            issues.push(format!("split_ratio must be between 0 and 1, got {}", self.split_ratio));
        }
        if self.optimal_ratio <= 0.0 {
            issues.push(format!("optimal_ratio must be positive, got {}", self.optimal_ratio));
        }
        if !(0.0..0.5).contains(&self.resize_threshold) {
            issues.push(format!(
                "resize_threshold must be in [0, 0.5), got {}",
                self.resize_threshold
            ));
        }
        if self.padding_step <= 0.0 {
            issues.push(format!("padding_step must be positive, got {}", self.padding_step));
        }
        if self.gap_step <= 0.0 {
            issues.push(format!("gap_step must be positive, got {}", self.gap_step));
        }
        if self.status_bar.top < 0.0 || self.status_bar.bottom < 0.0 {
            issues.push("status_bar insets must be non-negative".to_string());
        }
        if self.mouse.move_button == self.mouse.resize_button {
            issues.push("mouse.move_button and mouse.resize_button must differ".to_string());
        }

        issues
    }
}

impl PaddingSettings {
    fn validate(&self, context: &str) -> Vec<String> {
        [("top", self.top), ("bottom", self.bottom), ("left", self.left), ("right", self.right)]
            .into_iter()
            .filter(|(_, v)| *v < 0.0)
            .map(|(edge, v)| format!("{context}.padding.{edge} must be non-negative, got {v}"))
            .collect()
    }
}

impl SpaceSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.padding.validate("space");

        if self.gap < 0.0 {
            issues.push(format!("space.gap must be non-negative, got {}", self.gap));
        }

        for (key, o) in &self.overrides {
            let context = format!("space.overrides.{key}");
            if key.parse::<usize>().map_or(true, |n| n == 0) {
                issues.push(format!("{context}: key must be a desktop index starting at 1"));
            }
            if let Some(padding) = &o.padding {
                issues.extend(padding.validate(&context));
            }
            if o.gap.is_some_and(|g| g < 0.0) {
                issues.push(format!("{context}.gap must be non-negative"));
            }
        }

        issues
    }
}

impl RuleSettings {
    pub fn validate(&self, index: usize) -> Vec<String> {
        let mut issues = Vec::new();
        if self.owner.is_none() && self.name.is_none() {
            issues.push(format!("Rule {index} has no owner or name pattern"));
        }
        for pattern in [&self.owner, &self.name, &self.except].into_iter().flatten() {
            if let Err(e) = regex::Regex::new(pattern) {
                issues.push(format!("Rule {index} has invalid pattern '{pattern}': {e}"));
            }
        }
        issues
    }
}

fn yes() -> bool { true }

fn default_split_ratio() -> f64 { 0.5 }

fn default_optimal_ratio() -> f64 { DEFAULT_OPTIMAL_RATIO }

fn default_float_throttle_ms() -> u64 { 16 }

fn default_resize_threshold() -> f64 { 0.005 }

fn default_step() -> f64 { 10.0 }

fn default_server_port() -> u16 { 3020 }

fn default_padding() -> f64 { 20.0 }

fn default_gap() -> f64 { 10.0 }

fn default_mouse_modifiers() -> Vec<ModifierKey> { vec![ModifierKey::Alt] }

fn default_move_button() -> MouseButton { MouseButton::Left }

fn default_resize_button() -> MouseButton { MouseButton::Right }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, otherwise returns the defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Config::default()) }
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.settings.validate());
        issues.extend(self.space.validate());
        for (index, rule) in self.rules.iter().enumerate() {
            issues.extend(rule.validate(index));
        }

        issues
    }
}
