//! Onboarding message and checklist step models.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// Appended to the title of a completed step.
pub const COMPLETED_SUFFIX: &str = " :white_check_mark:";
/// Attachment color of a completed step.
pub const COMPLETED_COLOR: &str = "#2ab27b";

/// One checklist item, rendered as a Slack attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Tracked event that completes this step, e.g. `"pin_added"`.
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub completed: bool,
    /// Remaining attachment fields (`text`, `fields`, `mrkdwn_in`, ...), passed through as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Step {
    pub fn new(title: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: None,
            event: event.into(),
            completed: false,
            extra: Map::new(),
        }
    }

    /// Mark the step done. No-op on a step that is already completed, so the
    /// title suffix is never appended twice.
    pub fn mark_completed(&mut self) {
        if self.completed {
            return;
        }
        self.title.push_str(COMPLETED_SUFFIX);
        self.color = Some(COMPLETED_COLOR.to_string());
        self.completed = true;
    }
}

/// A user's onboarding status message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingMessage {
    /// Destination: a user id before the first send, the DM channel after it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "deserialize_steps")]
    pub attachments: Vec<Step>,
    /// Timestamp of the sent message; present once Slack has accepted it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OnboardingMessage {
    /// Overlay `later` onto `self`: scalar fields set in `later` win, the step
    /// list is replaced wholesale and extra fields are overridden key by key.
    pub fn overlay(&mut self, later: &OnboardingMessage) {
        if later.channel.is_some() {
            self.channel.clone_from(&later.channel);
        }
        if later.text.is_some() {
            self.text.clone_from(&later.text);
        }
        if later.ts.is_some() {
            self.ts.clone_from(&later.ts);
        }
        self.attachments.clone_from(&later.attachments);
        for (key, value) in &later.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// Number of completed steps.
    pub fn completed_count(&self) -> usize {
        self.attachments.iter().filter(|s| s.completed).count()
    }
}

/// The step list arrives either structured or as serialized JSON text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSteps {
    Structured(Vec<Step>),
    Serialized(String),
    Null,
}

/// Decode a step list exactly once, at the boundary.
pub fn parse_step_list(raw: &str) -> Result<Vec<Step>, PayloadError> {
    serde_json::from_str(raw).map_err(|e| PayloadError::StepList(e.to_string()))
}

fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<Step>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawSteps::deserialize(deserializer)? {
        RawSteps::Structured(steps) => Ok(steps),
        RawSteps::Serialized(raw) => parse_step_list(&raw).map_err(serde::de::Error::custom),
        RawSteps::Null => Ok(Vec::new()),
    }
}
