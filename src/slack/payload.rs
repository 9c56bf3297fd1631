//! Inbound Slack payloads: slash commands and Events API envelopes.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// A slash command invocation (form-encoded).
#[derive(Debug, Clone, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    pub user_id: String,
    pub response_url: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Outer Events API envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Endpoint ownership check sent when the events URL is configured.
    UrlVerification { challenge: String },
    EventCallback { event: EventPayload },
    #[serde(other)]
    Unsupported,
}

/// The `event` object of an `event_callback`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventPayload {
    #[serde(rename = "type")]
    pub kind: String,
    /// Acting user.
    #[serde(default)]
    pub user: Option<String>,
    /// The starred / pinned / reacted-to item.
    #[serde(default)]
    pub item: Option<Value>,
}

impl EventPayload {
    /// The tracked event this payload represents, if it is one.
    pub fn tracked(&self) -> Option<TrackedEvent> {
        TrackedEvent::parse(&self.kind)
    }
}

/// User actions that can complete an onboarding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedEvent {
    StarAdded,
    PinAdded,
    ReactionAdded,
}

impl TrackedEvent {
    pub const ALL: [TrackedEvent; 3] = [Self::StarAdded, Self::PinAdded, Self::ReactionAdded];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StarAdded => "star_added",
            Self::PinAdded => "pin_added",
            Self::ReactionAdded => "reaction_added",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == kind)
    }
}

impl fmt::Display for TrackedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
