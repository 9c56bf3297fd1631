use std::sync::Arc;

use anyhow::Context;
use onboarding_bot::config::{BotConfig, StoreConfig};
use onboarding_bot::oauth::Installer;
use onboarding_bot::onboarding::{MessageCache, OnboardingService, Templates};
use onboarding_bot::routes::{AppState, bot_routes};
use onboarding_bot::slack::SlackClient;
use onboarding_bot::store::{self, KeyValueStore, LibSqlStore};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().context("Invalid configuration")?;
    let templates =
        Templates::load(config.template_dir.as_deref()).context("Failed to load templates")?;

    eprintln!("🤖 Onboarding Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Command: {}", config.onboarding_command);
    eprintln!("   Slack API: {}", config.slack_api_base);

    // ── Store ───────────────────────────────────────────────────────────
    let store: Arc<dyn KeyValueStore> = Arc::new(LibSqlStore::from_config(&config.store));
    store::connect_with_retry(
        store.as_ref(),
        config.store_connect_attempts,
        config.store_retry_backoff,
    )
    .await
    .context("Failed to connect to the store")?;

    match &config.store {
        StoreConfig::Local { path } => eprintln!("   Database: {}", path.display()),
        StoreConfig::Remote { url, .. } => eprintln!("   Database: {url}"),
    }

    // ── Slack ───────────────────────────────────────────────────────────
    let token = store::load_bot_token(store.as_ref())
        .await
        .context("Failed to read the bot token")?;
    if token.is_some() {
        tracing::info!("Using bot token from the store");
    } else {
        tracing::info!("There's no bot token stored; install the app to authenticate");
    }
    let slack = Arc::new(SlackClient::new(config.slack_api_base.clone(), token));

    let installer = config.oauth.clone().map(|oauth| {
        Arc::new(Installer::new(
            oauth,
            Arc::clone(&slack),
            Arc::clone(&store),
        ))
    });
    eprintln!(
        "   OAuth install: {}",
        if installer.is_some() { "enabled" } else { "disabled" }
    );
    eprintln!(
        "   Request signing: {}",
        if config.signing_secret.is_some() { "enforced" } else { "off" }
    );

    // ── Onboarding ──────────────────────────────────────────────────────
    let service = OnboardingService::new(
        templates,
        Arc::clone(&store),
        slack,
        Arc::new(MessageCache::new(config.message_cache_capacity)),
    )
    .with_onboarding_command(config.onboarding_command.clone());

    let app = bot_routes(AppState {
        service: Arc::new(service),
        installer,
        signing_secret: config.signing_secret.clone().map(Arc::new),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    eprintln!("   Listening: http://{addr}\n");
    tracing::info!(port = config.port, "Onboarding bot started");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
