//! Step reconciliation — brings a message's checklist in line with the
//! user's completion flags, records a newly completed step, then sends the
//! message and remembers it for later edits.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::model::{OnboardingMessage, Step};
use super::state::MessageCache;
use crate::error::{Result, StoreError};
use crate::slack::{Messenger, SentMessage};
use crate::store::{KeyValueStore, completion_key, is_truthy};

/// What a reconciliation did.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// The message as sent, including the `ts` and `channel` Slack returned.
    pub message: OnboardingMessage,
    /// Completion flags written during this run.
    pub persisted: Vec<String>,
    /// Number of store lookups made.
    pub lookups: usize,
}

/// Per-step result of [`mark_steps`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StepWalk {
    pub persisted: Vec<String>,
    pub lookups: usize,
}

/// Walk `steps` in order, one store lookup per step.
///
/// A step whose flag is already set is marked without a write. A step whose
/// event is `completed_event` is marked and its flag written. The lookup for
/// step N+1 starts only once step N has been resolved and updated. A failed
/// write is logged and does not stop the walk; a failed lookup does.
pub async fn mark_steps(
    store: &dyn KeyValueStore,
    user: &str,
    completed_event: &str,
    steps: &mut [Step],
) -> std::result::Result<StepWalk, StoreError> {
    let mut walk = StepWalk::default();

    for step in steps.iter_mut() {
        let key = completion_key(user, &step.event);
        let stored = store.get(&key).await?;
        walk.lookups += 1;

        if stored.as_ref().is_some_and(is_truthy) {
            step.mark_completed();
        } else if step.event == completed_event {
            step.mark_completed();
            match store.set(&key, &Value::Bool(true)).await {
                Ok(()) => {
                    info!(key = %key, "Saved completion flag");
                    walk.persisted.push(key);
                }
                Err(e) => warn!(key = %key, "Failed to save completion flag: {e}"),
            }
        }
    }

    Ok(walk)
}

/// Runs reconciliation and the final send.
pub struct Reconciler {
    store: Arc<dyn KeyValueStore>,
    messenger: Arc<dyn Messenger>,
    cache: Arc<MessageCache>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        messenger: Arc<dyn Messenger>,
        cache: Arc<MessageCache>,
    ) -> Self {
        Self {
            store,
            messenger,
            cache,
        }
    }

    /// Reconcile `message` for `user` after `completed_event`, send it, and
    /// save it (with Slack's `ts`/`channel`) as the user's current message.
    ///
    /// Nothing is saved when the send fails.
    pub async fn reconcile(
        &self,
        user: &str,
        completed_event: &str,
        mut message: OnboardingMessage,
    ) -> Result<ReconcileOutcome> {
        let walk = mark_steps(
            self.store.as_ref(),
            user,
            completed_event,
            &mut message.attachments,
        )
        .await?;

        debug!(
            user = %user,
            steps = message.attachments.len(),
            lookups = walk.lookups,
            "Got all completion flags, sending status"
        );

        let SentMessage { ts, channel } = self.messenger.post_message(&message).await?;
        message.ts = Some(ts);
        message.channel = Some(channel);
        self.cache.insert(user, message.clone()).await;

        Ok(ReconcileOutcome {
            message,
            persisted: walk.persisted,
            lookups: walk.lookups,
        })
    }
}
