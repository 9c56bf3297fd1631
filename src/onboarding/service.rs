//! Onboarding service — binds slash commands and tracked events to the state
//! builder and the reconciler.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::builder;
use super::model::OnboardingMessage;
use super::reconciler::{ReconcileOutcome, Reconciler};
use super::state::{MessageCache, UserLocks};
use super::templates::Templates;
use crate::config::DEFAULT_COMMAND;
use crate::error::Result;
use crate::slack::{Messenger, SlashCommand, TrackedEvent};
use crate::store::KeyValueStore;

/// Fixed command that replies with the satellite welcome.
pub const SATELLITE_COMMAND: &str = "/satellite";

/// What a slash command resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Onboarding,
    Satellite,
}

pub struct OnboardingService {
    templates: Templates,
    messenger: Arc<dyn Messenger>,
    cache: Arc<MessageCache>,
    locks: UserLocks,
    reconciler: Reconciler,
    onboarding_command: String,
}

impl OnboardingService {
    pub fn new(
        templates: Templates,
        store: Arc<dyn KeyValueStore>,
        messenger: Arc<dyn Messenger>,
        cache: Arc<MessageCache>,
    ) -> Self {
        let reconciler = Reconciler::new(store, Arc::clone(&messenger), Arc::clone(&cache));
        Self {
            templates,
            messenger,
            cache,
            locks: UserLocks::new(),
            reconciler,
            onboarding_command: DEFAULT_COMMAND.to_string(),
        }
    }

    /// Answer to `command` instead of the default onboarding command.
    pub fn with_onboarding_command(mut self, command: impl Into<String>) -> Self {
        self.onboarding_command = command.into();
        self
    }

    pub fn onboarding_command(&self) -> &str {
        &self.onboarding_command
    }

    pub fn command_kind(&self, command: &str) -> Option<CommandKind> {
        if command == self.onboarding_command {
            Some(CommandKind::Onboarding)
        } else if command == SATELLITE_COMMAND {
            Some(CommandKind::Satellite)
        } else {
            None
        }
    }

    /// The user's current onboarding message: template, addressed to the
    /// user, overlaid with whatever was last sent to them.
    pub async fn build_status(&self, user: &str) -> OnboardingMessage {
        let saved = self.cache.get(user).await;
        builder::build_status(&self.templates.welcome, user, saved.as_ref())
    }

    /// Reply to a slash command through its response URL. The onboarding
    /// status waits for any in-flight reconciliation for the same user.
    ///
    /// Returns `Ok(None)` for commands the bot does not handle.
    pub async fn handle_command(&self, cmd: &SlashCommand) -> Result<Option<CommandKind>> {
        let Some(kind) = self.command_kind(&cmd.command) else {
            debug!(command = %cmd.command, "Ignoring unknown command");
            return Ok(None);
        };

        let message = match kind {
            CommandKind::Onboarding => {
                let _guard = self.locks.acquire(&cmd.user_id).await;
                self.build_status(&cmd.user_id).await
            }
            CommandKind::Satellite => self.templates.satellite.clone(),
        };
        self.messenger.respond(&cmd.response_url, &message).await?;
        info!(command = %cmd.command, user = %cmd.user_id, "Answered command");
        Ok(Some(kind))
    }

    /// Reconcile the user's checklist after `event` and send the result.
    ///
    /// Work for one user is serialized; the lock covers build, reconcile and
    /// the cache update.
    pub async fn handle_event(&self, event: TrackedEvent, user: &str) -> Result<ReconcileOutcome> {
        let _guard = self.locks.acquire(user).await;
        let message = self.build_status(user).await;
        let outcome = self.reconciler.reconcile(user, event.as_str(), message).await?;
        info!(
            event = %event,
            user = %user,
            completed = outcome.message.completed_count(),
            total = outcome.message.attachments.len(),
            "Onboarding status sent"
        );
        Ok(outcome)
    }

    /// [`handle_command`](Self::handle_command), logging instead of returning
    /// failures. Used from detached tasks.
    pub async fn run_command(&self, cmd: &SlashCommand) {
        if let Err(e) = self.handle_command(cmd).await {
            warn!(command = %cmd.command, user = %cmd.user_id, "Failed to answer command: {e}");
        }
    }

    /// [`handle_event`](Self::handle_event), logging instead of returning
    /// failures. Used from detached tasks.
    pub async fn run_event(&self, event: TrackedEvent, user: &str) {
        if let Err(e) = self.handle_event(event, user).await {
            warn!(event = %event, user = %user, "Failed to send onboarding status: {e}");
        }
    }
}
