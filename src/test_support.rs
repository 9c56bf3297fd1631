//! In-memory test doubles for the store and messenger traits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{SlackError, StoreError};
use crate::onboarding::OnboardingMessage;
use crate::slack::{Messenger, SentMessage};
use crate::store::KeyValueStore;

/// Map-backed store that records every call.
#[derive(Default)]
pub struct RecordingStore {
    values: Mutex<HashMap<String, Value>>,
    gets: Mutex<Vec<String>>,
    sets: Mutex<Vec<(String, Value)>>,
    fail_reads: bool,
    fail_writes: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        let store = Self::new();
        store.values.lock().unwrap().extend(
            values
                .into_iter()
                .map(|(key, value)| (key.to_string(), value)),
        );
        store
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }

    /// Successful writes, in order.
    pub fn sets(&self) -> Vec<(String, Value)> {
        self.sets.lock().unwrap().clone()
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn connect(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.gets.lock().unwrap().push(key.to_string());
        if self.fail_reads {
            return Err(StoreError::Query(format!("read of {key} refused")));
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Query(format!("write of {key} refused")));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        self.sets
            .lock()
            .unwrap()
            .push((key.to_string(), value.clone()));
        Ok(())
    }
}

/// Messenger that records what would have been sent.
#[derive(Default)]
pub struct RecordingMessenger {
    posted: Mutex<Vec<OnboardingMessage>>,
    responses: Mutex<Vec<(String, OnboardingMessage)>>,
    fail: bool,
}

impl RecordingMessenger {
    pub const TS: &'static str = "1700000000.000100";
    pub const CHANNEL: &'static str = "D0000001";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn posted(&self) -> Vec<OnboardingMessage> {
        self.posted.lock().unwrap().clone()
    }

    pub fn responses(&self) -> Vec<(String, OnboardingMessage)> {
        self.responses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn post_message(&self, message: &OnboardingMessage) -> Result<SentMessage, SlackError> {
        if self.fail {
            return Err(SlackError::Api {
                method: "chat.postMessage".into(),
                error: "channel_not_found".into(),
            });
        }
        self.posted.lock().unwrap().push(message.clone());
        Ok(SentMessage {
            ts: message.ts.clone().unwrap_or_else(|| Self::TS.to_string()),
            channel: Self::CHANNEL.to_string(),
        })
    }

    async fn respond(
        &self,
        response_url: &str,
        message: &OnboardingMessage,
    ) -> Result<(), SlackError> {
        if self.fail {
            return Err(SlackError::Status {
                method: "response_url".into(),
                status: 404,
                body: "expired_url".into(),
            });
        }
        self.responses
            .lock()
            .unwrap()
            .push((response_url.to_string(), message.clone()));
        Ok(())
    }
}
