//! Slack Web API client.
//!
//! Posts and edits messages with the bot token, replies through slash
//! command response URLs, and exchanges OAuth install codes. The token can be
//! swapped at runtime once an install completes.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{Messenger, SentMessage};
use crate::config::{DEFAULT_SLACK_API_BASE, OAuthConfig};
use crate::error::SlackError;
use crate::onboarding::OnboardingMessage;

const POST_MESSAGE: &str = "chat.postMessage";
const UPDATE_MESSAGE: &str = "chat.update";
const OAUTH_ACCESS: &str = "oauth.v2.access";

/// Common shape of Web API responses.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Slack Web API client.
pub struct SlackClient {
    client: reqwest::Client,
    api_base: String,
    token: RwLock<Option<SecretString>>,
}

impl SlackClient {
    pub fn new(api_base: impl Into<String>, token: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: RwLock::new(token),
        }
    }

    /// Client for the public Slack API.
    pub fn with_default_base(token: Option<SecretString>) -> Self {
        Self::new(DEFAULT_SLACK_API_BASE, token)
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Switch to a new bot token (after an OAuth install).
    pub async fn set_token(&self, token: SecretString) {
        *self.token.write().await = Some(token);
        tracing::info!("Slack client is now authenticated");
    }

    /// Exchange an OAuth authorization code for a bot token.
    pub async fn exchange_oauth_code(
        &self,
        oauth: &OAuthConfig,
        code: &str,
    ) -> Result<SecretString, SlackError> {
        let mut form = vec![
            ("client_id", oauth.client_id.clone()),
            ("client_secret", oauth.client_secret.expose_secret().to_string()),
            ("code", code.to_string()),
        ];
        if let Some(ref redirect_uri) = oauth.redirect_uri {
            form.push(("redirect_uri", redirect_uri.clone()));
        }

        let resp = self
            .client
            .post(self.api_url(OAUTH_ACCESS))
            .form(&form)
            .send()
            .await
            .map_err(|e| request_failed(OAUTH_ACCESS, e))?;

        let body = read_api_response(OAUTH_ACCESS, resp).await?;
        body.access_token
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| SlackError::InvalidResponse {
                method: OAUTH_ACCESS.into(),
                reason: "missing access_token".into(),
            })
    }
}

#[async_trait]
impl Messenger for SlackClient {
    async fn post_message(&self, message: &OnboardingMessage) -> Result<SentMessage, SlackError> {
        let method = if message.ts.is_some() {
            UPDATE_MESSAGE
        } else {
            POST_MESSAGE
        };

        let token = self
            .token
            .read()
            .await
            .as_ref()
            .map(|t| t.expose_secret().to_string())
            .ok_or_else(|| SlackError::NotAuthenticated {
                method: method.into(),
            })?;

        let resp = self
            .client
            .post(self.api_url(method))
            .bearer_auth(token)
            .json(message)
            .send()
            .await
            .map_err(|e| request_failed(method, e))?;

        let body = read_api_response(method, resp).await?;
        match (body.ts, body.channel) {
            (Some(ts), Some(channel)) => {
                tracing::debug!(method, %channel, %ts, "Slack message sent");
                Ok(SentMessage { ts, channel })
            }
            _ => Err(SlackError::InvalidResponse {
                method: method.into(),
                reason: "missing ts or channel".into(),
            }),
        }
    }

    async fn respond(
        &self,
        response_url: &str,
        message: &OnboardingMessage,
    ) -> Result<(), SlackError> {
        const METHOD: &str = "response_url";

        let resp = self
            .client
            .post(response_url)
            .json(message)
            .send()
            .await
            .map_err(|e| request_failed(METHOD, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SlackError::Status {
                method: METHOD.into(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

fn request_failed(method: &str, e: reqwest::Error) -> SlackError {
    SlackError::RequestFailed {
        method: method.into(),
        reason: e.to_string(),
    }
}

/// Check the HTTP status and the `ok` flag of a Web API response.
async fn read_api_response(
    method: &str,
    resp: reqwest::Response,
) -> Result<ApiResponse, SlackError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SlackError::Status {
            method: method.into(),
            status: status.as_u16(),
            body,
        });
    }

    let body: ApiResponse = resp.json().await.map_err(|e| SlackError::InvalidResponse {
        method: method.into(),
        reason: e.to_string(),
    })?;

    if !body.ok {
        return Err(SlackError::Api {
            method: method.into(),
            error: body.error.unwrap_or_else(|| "unknown_error".into()),
        });
    }
    Ok(body)
}
