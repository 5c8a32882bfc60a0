use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::common::config::RuleSettings;
use crate::sys::window_server::WindowInfo;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RuleAction {
    Float,
    Tile,
}

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule needs an owner or name pattern")]
    NoPattern,
    #[error("invalid {field} pattern `{pattern}`: {source}")]
    Pattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Owner/title filter mapped to an action, applied when a window is tiled
/// in.
#[derive(Debug, Clone)]
pub struct WindowRule {
    owner: Option<Regex>,
    name: Option<Regex>,
    except: Option<Regex>,
    pub action: RuleAction,
}

fn compile(field: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, RuleError> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|source| RuleError::Pattern {
                field,
                pattern: p.to_string(),
                source,
            })
        })
        .transpose()
}

impl WindowRule {
    pub fn new(
        owner: Option<&str>,
        name: Option<&str>,
        except: Option<&str>,
        action: RuleAction,
    ) -> Result<Self, RuleError> {
        if owner.is_none() && name.is_none() {
            return Err(RuleError::NoPattern);
        }
        Ok(Self {
            owner: compile("owner", owner)?,
            name: compile("name", name)?,
            except: compile("except", except)?,
            action,
        })
    }

    pub fn from_settings(settings: &RuleSettings) -> Result<Self, RuleError> {
        Self::new(
            settings.owner.as_deref(),
            settings.name.as_deref(),
            settings.except.as_deref(),
            settings.action,
        )
    }

    pub fn matches(&self, window: &WindowInfo) -> bool {
        self.owner.as_ref().is_none_or(|re| re.is_match(&window.owner))
            && self.name.as_ref().is_none_or(|re| re.is_match(&window.name))
            && !self.except.as_ref().is_some_and(|re| re.is_match(&window.name))
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(re) = &self.owner {
            parts.push(format!("owner={}", re.as_str()));
        }
        if let Some(re) = &self.name {
            parts.push(format!("name={}", re.as_str()));
        }
        if let Some(re) = &self.except {
            parts.push(format!("except={}", re.as_str()));
        }
        parts.push(format!("action={}", self.action));
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<WindowRule>,
}

impl RuleSet {
    /// Builds the rule set from config. Rules that fail to compile are
    /// dropped.
    pub fn from_settings(settings: &[RuleSettings]) -> Self {
        let mut set = Self::default();
        for (index, s) in settings.iter().enumerate() {
            match WindowRule::from_settings(s) {
                Ok(rule) => set.add(rule),
                Err(e) => warn!(index, "dropping rule: {e}"),
            }
        }
        set
    }

    pub fn add(&mut self, rule: WindowRule) {
        debug!(rule = %rule.describe(), "registered rule");
        self.rules.push(rule);
    }

    /// Action of the first rule matching `window`.
    pub fn action_for(&self, window: &WindowInfo) -> Option<RuleAction> {
        self.rules.iter().find(|r| r.matches(window)).map(|r| r.action)
    }

    /// Whether `window` should stay out of the tree.
    pub fn should_float(&self, window: &WindowInfo, float_non_resizable: bool) -> bool {
        match self.action_for(window) {
            Some(RuleAction::Float) => true,
            Some(RuleAction::Tile) => false,
            None => float_non_resizable && !window.is_resizable,
        }
    }
}
