//! OAuth install flow: trade the authorization code Slack redirects with for a
//! bot token, persist it, and hand it to the running client.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde_json::Value;

use crate::config::OAuthConfig;
use crate::error::Result;
use crate::slack::SlackClient;
use crate::store::{KeyValueStore, keys};

pub struct Installer {
    oauth: OAuthConfig,
    slack: Arc<SlackClient>,
    store: Arc<dyn KeyValueStore>,
}

impl Installer {
    pub fn new(oauth: OAuthConfig, slack: Arc<SlackClient>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            oauth,
            slack,
            store,
        }
    }

    /// Complete an install with the `code` from the OAuth redirect.
    ///
    /// The token is stored before the client switches to it, so a restart
    /// right after an install still finds it.
    pub async fn install(&self, code: &str) -> Result<()> {
        let token = self.slack.exchange_oauth_code(&self.oauth, code).await?;
        self.store
            .set(keys::BOT_TOKEN, &Value::String(token.expose_secret().to_string()))
            .await?;
        self.slack.set_token(token).await;
        tracing::info!("Bot installed, token stored");
        Ok(())
    }
}
