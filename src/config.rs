//! Configuration types.
//!
//! Everything is read from environment variables. `from_lookup` takes the
//! variable source as a closure so tests never touch the process environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default HTTP listener port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default name of the onboarding slash command.
pub const DEFAULT_COMMAND: &str = "/onboarding";
/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Where the key-value store lives.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// Local libSQL file.
    Local { path: PathBuf },
    /// Remote libSQL / Turso database.
    Remote { url: String, auth_token: SecretString },
}

/// Slack app credentials for the "Add to Slack" OAuth install.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: Option<String>,
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Port the HTTP listener binds on all interfaces.
    pub port: u16,
    /// Name of the configurable onboarding slash command (always starts with `/`).
    pub onboarding_command: String,
    pub store: StoreConfig,
    /// Number of connection attempts at startup before giving up.
    pub store_connect_attempts: u32,
    /// Backoff step between connection attempts (multiplied by the attempt number).
    pub store_retry_backoff: Duration,
    /// Maximum number of users whose last onboarding message is kept for editing.
    pub message_cache_capacity: usize,
    /// Optional directory overriding the built-in message templates.
    pub template_dir: Option<PathBuf>,
    pub slack_api_base: String,
    /// When set, inbound Slack requests must carry a valid signature.
    pub signing_secret: Option<SecretString>,
    /// When set, the OAuth install route is enabled.
    pub oauth: Option<OAuthConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            onboarding_command: DEFAULT_COMMAND.to_string(),
            store: StoreConfig::Local {
                path: PathBuf::from("./data/onboarding-bot.db"),
            },
            store_connect_attempts: 5,
            store_retry_backoff: Duration::from_millis(2000),
            message_cache_capacity: 1024,
            template_dir: None,
            slack_api_base: DEFAULT_SLACK_API_BASE.to_string(),
            signing_secret: None,
            oauth: None,
        }
    }
}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(&var, "ONBOARDING_BOT_PORT", defaults.port)?;

        let onboarding_command = var("ONBOARDING_BOT_COMMAND")
            .map(|c| normalize_command(&c))
            .unwrap_or(defaults.onboarding_command);

        let store = match var("ONBOARDING_BOT_DB_URL") {
            Some(url) => StoreConfig::Remote {
                url,
                auth_token: SecretString::from(
                    var("ONBOARDING_BOT_DB_AUTH_TOKEN").unwrap_or_default(),
                ),
            },
            None => match var("ONBOARDING_BOT_DB_PATH") {
                Some(path) => StoreConfig::Local {
                    path: PathBuf::from(path),
                },
                None => defaults.store,
            },
        };

        let store_connect_attempts: u32 = parse_or(
            &var,
            "ONBOARDING_BOT_STORE_CONNECT_ATTEMPTS",
            defaults.store_connect_attempts,
        )?;
        let retry_ms: u64 = parse_or(
            &var,
            "ONBOARDING_BOT_STORE_RETRY_MS",
            defaults.store_retry_backoff.as_millis() as u64,
        )?;
        let message_cache_capacity: usize = parse_or(
            &var,
            "ONBOARDING_BOT_CACHE_CAPACITY",
            defaults.message_cache_capacity,
        )?;

        let oauth = match (var("SLACK_CLIENT_ID"), var("SLACK_CLIENT_SECRET")) {
            (Some(client_id), Some(secret)) => Some(OAuthConfig {
                client_id,
                client_secret: SecretString::from(secret),
                redirect_uri: var("SLACK_REDIRECT_URI"),
            }),
            _ => None,
        };

        Ok(Self {
            port,
            onboarding_command,
            store,
            store_connect_attempts: store_connect_attempts.max(1),
            store_retry_backoff: Duration::from_millis(retry_ms),
            message_cache_capacity: message_cache_capacity.max(1),
            template_dir: var("ONBOARDING_BOT_TEMPLATE_DIR").map(PathBuf::from),
            slack_api_base: var("SLACK_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.slack_api_base),
            signing_secret: var("SLACK_SIGNING_SECRET").map(SecretString::from),
            oauth,
        })
    }
}

/// Ensure a slash command name carries its leading `/`.
pub fn normalize_command(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        None => Ok(default),
    }
}
