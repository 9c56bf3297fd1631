//! HTTP surface: Slack slash commands and events, the OAuth redirect and a
//! health check.
//!
//! Slack expects an answer within three seconds, so command and event work is
//! spawned and the request acknowledged right away.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::error::VerificationError;
use crate::oauth::Installer;
use crate::onboarding::OnboardingService;
use crate::slack::signature::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::slack::{EventEnvelope, SlashCommand};

/// Largest request body accepted for signature checking.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OnboardingService>,
    /// Present when OAuth client credentials are configured.
    pub installer: Option<Arc<Installer>>,
    /// Present when Slack request signing is enforced.
    pub signing_secret: Option<Arc<SecretString>>,
}

/// Build the bot's router.
pub fn bot_routes(state: AppState) -> Router {
    let slack = Router::new()
        .route("/slack/commands", post(slash_command))
        .route("/slack/events", post(slack_event))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_signature,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/oauth/callback", get(oauth_callback))
        .merge(slack)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "onboarding-bot"
    }))
}

// ── Slack ───────────────────────────────────────────────────────────────

async fn slash_command(
    State(state): State<AppState>,
    Form(cmd): Form<SlashCommand>,
) -> StatusCode {
    debug!(command = %cmd.command, user = %cmd.user_id, "Slash command received");
    let service = Arc::clone(&state.service);
    tokio::spawn(async move {
        service.run_command(&cmd).await;
    });
    StatusCode::OK
}

async fn slack_event(
    State(state): State<AppState>,
    Json(envelope): Json<EventEnvelope>,
) -> Response {
    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            info!("Answering url_verification challenge");
            Json(serde_json::json!({ "challenge": challenge })).into_response()
        }
        EventEnvelope::EventCallback { event } => {
            let tracked = event.tracked();
            match (tracked, event.user) {
                (Some(tracked), Some(user)) => {
                    debug!(event = %tracked, user = %user, "Tracked event received");
                    let service = Arc::clone(&state.service);
                    tokio::spawn(async move {
                        service.run_event(tracked, &user).await;
                    });
                }
                _ => debug!(kind = %event.kind, "Ignoring event"),
            }
            StatusCode::OK.into_response()
        }
        EventEnvelope::Unsupported => {
            debug!("Ignoring unsupported envelope");
            StatusCode::OK.into_response()
        }
    }
}

/// Rejects `/slack/*` requests without a valid signature when a signing
/// secret is configured.
async fn verify_signature(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(secret) = state.signing_secret.as_ref() else {
        return next.run(request).await;
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read request body: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = check_signature(secret.expose_secret(), &parts.headers, &bytes, now) {
        warn!(path = %parts.uri.path(), "Rejected Slack request: {e}");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn check_signature(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
    now: i64,
) -> Result<(), VerificationError> {
    let header = |name: &'static str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or(VerificationError::MissingHeader(name))
    };
    let timestamp = header(TIMESTAMP_HEADER)?;
    let signature = header(SIGNATURE_HEADER)?;
    signature::verify(secret, timestamp, body, signature, now)
}

// ── OAuth ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OAuthCallback {
    code: Option<String>,
    error: Option<String>,
}

async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallback>,
) -> Response {
    let Some(installer) = state.installer.as_ref() else {
        return (StatusCode::NOT_FOUND, "OAuth install is not configured").into_response();
    };
    let Some(code) = params.code else {
        let reason = params.error.unwrap_or_else(|| "missing code".into());
        warn!(reason = %reason, "OAuth install cancelled");
        return (StatusCode::BAD_REQUEST, format!("Install cancelled: {reason}")).into_response();
    };

    match installer.install(&code).await {
        Ok(()) => (StatusCode::OK, "Onboarding bot installed.").into_response(),
        Err(e) => {
            warn!("OAuth install failed: {e}");
            (StatusCode::BAD_GATEWAY, "Install failed").into_response()
        }
    }
}
