//! Slack integration: outbound Web API client, inbound payload types and
//! request signature verification.

pub mod client;
pub mod payload;
pub mod signature;

pub use client::SlackClient;
pub use payload::{EventEnvelope, EventPayload, SlashCommand, TrackedEvent};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SlackError;
use crate::onboarding::OnboardingMessage;

/// Where Slack says a message ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub ts: String,
    pub channel: String,
}

/// Outbound messaging interface.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send `message` to `message.channel`. A message that already carries a
    /// `ts` is edited in place instead of posted again.
    async fn post_message(&self, message: &OnboardingMessage) -> Result<SentMessage, SlackError>;

    /// Reply through a slash command's one-time response URL.
    async fn respond(
        &self,
        response_url: &str,
        message: &OnboardingMessage,
    ) -> Result<(), SlackError>;
}
