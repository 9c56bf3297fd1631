//! Persistence layer — durable key-value store for completion flags and the
//! bot credential.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::{KeyValueStore, completion_key, is_truthy, keys};

use std::time::Duration;

use secrecy::SecretString;
use serde_json::Value;

use crate::error::StoreError;

/// Connect to the store, retrying with linear backoff.
///
/// Returns the last error once `attempts` connection attempts have failed.
pub async fn connect_with_retry(
    store: &dyn KeyValueStore,
    attempts: u32,
    backoff: Duration,
) -> Result<(), StoreError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match store.connect().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                let delay = retry_delay(backoff, attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Store connection failed: {e}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempts, "Giving up on store connection: {e}");
                return Err(e);
            }
        }
    }
}

/// Linear backoff for the given 1-based attempt, saturating at `Duration::MAX`.
fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    backoff.saturating_mul(attempt)
}

/// Read the bot token written by the OAuth install, if any.
///
/// A stored value that is not a non-empty string is treated as absent.
pub async fn load_bot_token(store: &dyn KeyValueStore) -> Result<Option<SecretString>, StoreError> {
    let token = match store.get(keys::BOT_TOKEN).await? {
        Some(Value::String(token)) if !token.is_empty() => Some(SecretString::from(token)),
        Some(other) => {
            tracing::warn!(kind = %value_kind(&other), "Ignoring non-string bot_token value");
            None
        }
        None => None,
    };
    Ok(token)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
