//! GitHub milestone event payloads
//!
//! Only the fields the relay renders are modelled; everything else in the
//! payload is ignored. See <https://docs.github.com/webhooks/webhook-events-and-payloads#milestone>.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// The body was authenticated but is not a usable milestone event
#[derive(Debug, Error)]
#[error("malformed milestone event: {0}")]
pub struct MalformedEventError(#[from] serde_json::Error);

/// What happened to the milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Closed,
    Opened,
    Edited,
    Deleted,
}

impl Action {
    /// Upper-case name used in notifications
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Created => "CREATED",
            Action::Closed => "CLOSED",
            Action::Opened => "OPENED",
            Action::Edited => "EDITED",
            Action::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" => Ok(Action::Created),
            "closed" => Ok(Action::Closed),
            "opened" => Ok(Action::Opened),
            "edited" => Ok(Action::Edited),
            "deleted" => Ok(Action::Deleted),
            other => Err(format!("unknown milestone action `{other}`")),
        }
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

/// Previous value of a single milestone property
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChangeProperty {
    /// The payload did not mention this property.
    #[default]
    Unchanged,
    /// The property changed; `from` is what it was before, if GitHub sent it.
    Changed { from: Option<String> },
}

impl ChangeProperty {
    /// A change whose previous value is known
    pub fn changed(from: impl Into<String>) -> Self {
        ChangeProperty::Changed {
            from: Some(from.into()),
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, ChangeProperty::Changed { .. })
    }

    /// Look up `name` in a `changes` object.
    fn lookup(changes: &Map<String, Value>, name: &str) -> Self {
        match changes.get(name) {
            None => ChangeProperty::Unchanged,
            Some(entry) => ChangeProperty::Changed {
                from: entry.get("from").and_then(Value::as_str).map(String::from),
            },
        }
    }
}

/// The tracked subset of a milestone `changes` object
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Changes {
    pub title: ChangeProperty,
    pub description: ChangeProperty,
    pub due_on: ChangeProperty,
}

impl<'de> Deserialize<'de> for Changes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let changes = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Changes {
            title: ChangeProperty::lookup(&changes, "title"),
            description: ChangeProperty::lookup(&changes, "description"),
            due_on: ChangeProperty::lookup(&changes, "due_on"),
        })
    }
}

/// A `milestone` webhook delivery
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MilestoneEvent {
    pub action: Action,
    pub milestone: Milestone,
    pub repository: Repository,
    #[serde(default)]
    pub changes: Option<Changes>,
}

impl MilestoneEvent {
    /// Decode a milestone event from a raw JSON body.
    pub fn parse(body: &[u8]) -> Result<Self, MalformedEventError> {
        Ok(serde_json::from_slice(body)?)
    }
}
