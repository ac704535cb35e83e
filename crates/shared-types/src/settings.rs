//! The persisted settings record.
//!
//! Stored and loaded as a whole. Every field carries a default so a partial or
//! older file still loads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// What `unclut run` does with the selected senders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPreference {
    #[default]
    Unsubscribe,
    Delete,
    Both,
}

impl ActionPreference {
    pub fn as_str(&self) -> &str {
        match self {
            ActionPreference::Unsubscribe => "unsubscribe",
            ActionPreference::Delete => "delete",
            ActionPreference::Both => "both",
        }
    }

    pub fn unsubscribes(&self) -> bool {
        matches!(self, ActionPreference::Unsubscribe | ActionPreference::Both)
    }

    pub fn deletes(&self) -> bool {
        matches!(self, ActionPreference::Delete | ActionPreference::Both)
    }
}

impl fmt::Display for ActionPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionPreference {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unsubscribe" => Ok(ActionPreference::Unsubscribe),
            "delete" => Ok(ActionPreference::Delete),
            "both" => Ok(ActionPreference::Both),
            _ => Err(ParseEnumError {
                kind: "action",
                value: s.to_string(),
                expected: "unsubscribe, delete, both",
            }),
        }
    }
}

/// Terminal colour theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Plain,
}

impl Theme {
    pub fn as_str(&self) -> &str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Plain => "plain",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            "plain" => Ok(Theme::Plain),
            _ => Err(ParseEnumError {
                kind: "theme",
                value: s.to_string(),
                expected: "dark, light, plain",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default action for `unclut run`
    pub action: ActionPreference,

    /// Maximum number of unique senders shown in the preview
    pub max_senders: u32,

    /// Maximum number of messages scanned while looking for senders
    pub max_emails_to_scan: u32,

    /// Ask before running destructive actions
    pub confirm: bool,

    pub theme: Theme,

    /// Simulate unsubscribes and deletions instead of executing them
    pub dry_run: bool,

    /// Gmail user id; "me" is the authenticated user
    pub user_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            action: ActionPreference::default(),
            max_senders: 50,
            max_emails_to_scan: 100,
            confirm: true,
            theme: Theme::default(),
            dry_run: false,
            user_id: "me".to_string(),
        }
    }
}
