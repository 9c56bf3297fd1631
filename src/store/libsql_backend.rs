//! libSQL backend — async `KeyValueStore` implementation.
//!
//! Supports local file, in-memory and remote (`libsql://`) databases. The
//! connection is opened on first use and reused for every operation after
//! that; `connect()` only forces that first open.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::migrations;
use crate::store::traits::KeyValueStore;

/// Where the database lives.
#[derive(Debug, Clone)]
enum Target {
    Local(PathBuf),
    Memory,
    Remote { url: String, auth_token: SecretString },
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Memory => write!(f, ":memory:"),
            Self::Remote { url, .. } => write!(f, "{url}"),
        }
    }
}

/// Open database plus the single connection used for all queries.
struct Handle {
    // Dropping the database closes in-memory stores, so it lives as long as
    // the connection.
    _db: Database,
    conn: Connection,
}

/// libSQL key-value store.
pub struct LibSqlStore {
    target: Target,
    handle: OnceCell<Handle>,
}

impl LibSqlStore {
    /// A store backed by a local database file (created on connect).
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::with_target(Target::Local(path.as_ref().to_path_buf()))
    }

    /// A private in-memory store (for tests).
    pub fn memory() -> Self {
        Self::with_target(Target::Memory)
    }

    /// A store backed by a remote libSQL server.
    pub fn remote(url: impl Into<String>, auth_token: SecretString) -> Self {
        Self::with_target(Target::Remote {
            url: url.into(),
            auth_token,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        match config {
            StoreConfig::Local { path } => Self::local(path),
            StoreConfig::Remote { url, auth_token } => Self::remote(url.clone(), auth_token.clone()),
        }
    }

    fn with_target(target: Target) -> Self {
        Self {
            target,
            handle: OnceCell::new(),
        }
    }

    /// Whether the connection has been opened.
    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }

    async fn conn(&self) -> Result<&Connection, StoreError> {
        let handle = self.handle.get_or_try_init(|| self.open()).await?;
        Ok(&handle.conn)
    }

    async fn open(&self) -> Result<Handle, StoreError> {
        let db = match &self.target {
            Target::Local(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::Connection(format!("Failed to create database directory: {e}"))
                    })?;
                }
                libsql::Builder::new_local(path).build().await
            }
            Target::Memory => libsql::Builder::new_local(":memory:").build().await,
            Target::Remote { url, auth_token } => {
                libsql::Builder::new_remote(url.clone(), auth_token.expose_secret().to_string())
                    .build()
                    .await
            }
        }
        .map_err(|e| StoreError::Connection(format!("Failed to open {}: {e}", self.target)))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(location = %self.target, "Store connected");
        Ok(Handle { _db: db, conn })
    }
}

#[async_trait]
impl KeyValueStore for LibSqlStore {
    async fn connect(&self) -> Result<(), StoreError> {
        self.conn().await.map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query("SELECT value FROM kv_store WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("get {key}: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("get {key}: {e}")))?;
                let value = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Serialization(format!("get {key}: {e}")))?;
                debug!(key, "Store hit");
                Ok(Some(value))
            }
            Ok(None) => {
                debug!(key, "Store miss");
                Ok(None)
            }
            Err(e) => Err(StoreError::Query(format!("get {key}: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let conn = self.conn().await?;
        let raw =
            serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, raw, now],
        )
        .await
        .map_err(|e| StoreError::Query(format!("set {key}: {e}")))?;

        debug!(key, "Store write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let store = LibSqlStore::memory();
        assert_eq!(store.get("U1pin_added").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = LibSqlStore::memory();
        store.set("U1pin_added", &json!(true)).await.unwrap();
        store.set("bot_token", &json!("xoxb-123")).await.unwrap();

        assert_eq!(store.get("U1pin_added").await.unwrap(), Some(json!(true)));
        assert_eq!(store.get("bot_token").await.unwrap(), Some(json!("xoxb-123")));
    }

    #[tokio::test]
    async fn set_overwrites() {
        let store = LibSqlStore::memory();
        store.set("k", &json!(1)).await.unwrap();
        store.set("k", &json!({"a": [1, 2]})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": [1, 2]})));
    }

    #[tokio::test]
    async fn store_calls_run_on_spawned_tasks() {
        let store: std::sync::Arc<dyn KeyValueStore> = std::sync::Arc::new(LibSqlStore::memory());

        let task_store = std::sync::Arc::clone(&store);
        tokio::spawn(async move {
            task_store.connect().await?;
            task_store.set("U1pin_added", &json!(true)).await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(store.get("U1pin_added").await.unwrap(), Some(json!(true)));
    }

    #[tokio::test]
    async fn connect_is_lazy_and_memoized() {
        let store = LibSqlStore::memory();
        assert!(!store.is_connected());

        store.connect().await.unwrap();
        store.set("k", &json!(true)).await.unwrap();
        assert!(store.is_connected());

        // A second connect must reuse the same in-memory database.
        store.connect().await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!(true)));
    }

    #[tokio::test]
    async fn local_file_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("bot.db");

        {
            let store = LibSqlStore::local(&path);
            store.set("U1star_added", &json!(true)).await.unwrap();
        }
        assert!(path.exists());

        let reopened = LibSqlStore::local(&path);
        assert_eq!(reopened.get("U1star_added").await.unwrap(), Some(json!(true)));
    }
}
