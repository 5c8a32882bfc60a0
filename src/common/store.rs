//! Runtime key/value settings that can be read and changed over the command
//! socket. Per-desktop values use the key `<desktop index>_<name>` and take
//! precedence over the plain `<name>`.

use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use serde::Serialize;

use crate::common::collections::HashMap;
use crate::common::config::{Config, PaddingSettings, SpaceOverride, SpaceSettings};
use crate::layout_engine::SpaceMode;

pub const MODE: &str = "mode";
pub const PADDING_TOP: &str = "padding_top";
pub const PADDING_BOTTOM: &str = "padding_bottom";
pub const PADDING_LEFT: &str = "padding_left";
pub const PADDING_RIGHT: &str = "padding_right";
pub const GAP: &str = "gap";
pub const LAYOUT: &str = "layout";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid value `{value}` for `{key}`: expected {expected}")]
    InvalidValue {
        key: String,
        value: Value,
        expected: &'static str,
    },
}

/// Splits `<desktop index>_<name>` into its parts. Keys without a numeric
/// prefix apply to every desktop.
pub fn split_key(key: &str) -> (Option<usize>, &str) {
    match key.split_once('_') {
        Some((index, name)) => match index.parse() {
            Ok(index) => (Some(index), name),
            Err(_) => (None, key),
        },
        None => (None, key),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

/// Integers first, then floats, everything else is a string.
impl FromStr for Value {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Value::Integer(i));
        }
        if let Ok(f) = s.parse::<f64>() {
            return Ok(Value::Float(f));
        }
        Ok(Value::String(s.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct ConfigStore {
    values: Mutex<HashMap<String, Value>>,
}

impl ConfigStore {
    pub fn new() -> Self { Self::default() }

    /// Seeds the per-space keys from the config file.
    pub fn from_config(config: &Config) -> Self {
        let store = Self::new();
        store.seed_space(None, &config.space);
        for (index, o) in &config.space.overrides {
            store.seed_override(index, o);
        }
        store
    }

    fn seed_space(&self, prefix: Option<&str>, space: &SpaceSettings) {
        let key = |name: &str| scoped(prefix, name);
        self.set(&key(MODE), Value::String(space.mode.to_string()));
        self.seed_padding(prefix, &space.padding);
        self.set(&key(GAP), Value::Float(space.gap));
        if let Some(layout) = &space.layout {
            self.set(&key(LAYOUT), Value::String(layout.display().to_string()));
        }
    }

    fn seed_padding(&self, prefix: Option<&str>, p: &PaddingSettings) {
        self.set(&scoped(prefix, PADDING_TOP), Value::Float(p.top));
        self.set(&scoped(prefix, PADDING_BOTTOM), Value::Float(p.bottom));
        self.set(&scoped(prefix, PADDING_LEFT), Value::Float(p.left));
        self.set(&scoped(prefix, PADDING_RIGHT), Value::Float(p.right));
    }

    fn seed_override(&self, index: &str, o: &SpaceOverride) {
        let prefix = Some(index);
        if let Some(mode) = o.mode {
            self.set(&scoped(prefix, MODE), Value::String(mode.to_string()));
        }
        if let Some(padding) = &o.padding {
            self.seed_padding(prefix, padding);
        }
        if let Some(gap) = o.gap {
            self.set(&scoped(prefix, GAP), Value::Float(gap));
        }
        if let Some(layout) = &o.layout {
            self.set(&scoped(prefix, LAYOUT), Value::String(layout.display().to_string()));
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> { self.values.lock().get(key).cloned() }

    pub fn exists(&self, key: &str) -> bool { self.values.lock().contains_key(key) }

    pub fn set(&self, key: &str, value: Value) { self.values.lock().insert(key.to_string(), value); }

    /// Stores `value` after checking it fits the kind of setting `key` names.
    /// Keys the store does not know are kept as given.
    pub fn set_checked(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let (_, name) = split_key(key);
        let checked = match name {
            MODE => value
                .as_str()
                .and_then(|raw| SpaceMode::from_str(raw).ok())
                .map(|mode| Value::String(mode.to_string()))
                .ok_or("bsp, monocle or float"),
            GAP | PADDING_TOP | PADDING_BOTTOM | PADDING_LEFT | PADDING_RIGHT => {
                match value.as_float() {
                    Some(v) if v.is_finite() && v >= 0.0 => Ok(value.clone()),
                    _ => Err("a non-negative number"),
                }
            }
            LAYOUT => Ok(Value::String(value.to_string())),
            _ => Ok(value.clone()),
        };
        match checked {
            Ok(checked) => {
                self.set(key, checked);
                Ok(())
            }
            Err(expected) => Err(StoreError::InvalidValue { key: key.to_string(), value, expected }),
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> { self.get(key)?.as_int() }

    pub fn get_float(&self, key: &str) -> Option<f64> { self.get(key)?.as_float() }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)?.as_str().map(str::to_string)
    }

    /// Looks up `<desktop_index>_<name>` and falls back to `<name>`.
    pub fn resolve(&self, desktop_index: usize, name: &str) -> Option<Value> {
        let values = self.values.lock();
        values
            .get(&format!("{desktop_index}_{name}"))
            .or_else(|| values.get(name))
            .cloned()
    }

    pub fn resolve_float(&self, desktop_index: usize, name: &str) -> Option<f64> {
        self.resolve(desktop_index, name)?.as_float()
    }

    pub fn resolve_string(&self, desktop_index: usize, name: &str) -> Option<String> {
        self.resolve(desktop_index, name)?.as_str().map(str::to_string)
    }

    /// Sorted snapshot of every key, for `config` queries.
    pub fn entries(&self) -> Vec<(String, Value)> {
        let mut entries: Vec<_> =
            self.values.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

fn scoped(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}_{name}"),
        None => name.to_string(),
    }
}
