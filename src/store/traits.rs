//! Key-value store trait — the minimal persistence interface the bot needs.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Well-known store keys.
pub mod keys {
    /// Bot OAuth token written by the install flow.
    pub const BOT_TOKEN: &str = "bot_token";
}

/// Backend-agnostic key-value store.
///
/// Values are JSON. There is deliberately no delete: completion flags are
/// append-only.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Establish connectivity. Implementations memoize the connection, so
    /// calling this more than once is cheap.
    async fn connect(&self) -> Result<(), StoreError>;

    /// Read a value, `None` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}

/// Store key of the completion flag for one user and one tracked event.
pub fn completion_key(user: &str, event: &str) -> String {
    format!("{user}{event}")
}

/// Whether a stored value counts as "set" (JSON truthiness).
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
