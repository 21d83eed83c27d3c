use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use joinguard_bot::config::{BotConfig, sqlite_url_for_path};
use joinguard_bot::db::pool::{create_pool, run_migrations};
use joinguard_bot::engine::bot_engine::BotEngine;
use joinguard_bot::engine::settings_store::SettingsStore;
use joinguard_bot::telegram::client::TelegramClient;
use joinguard_bot::telegram::poller::run_polling;

/// Telegram bot that mutes new group members for a configurable time.
#[derive(Parser)]
#[command(name = "joinguard", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "joinguard.toml")]
    config: String,

    /// Bot API token. Overrides the config file and TELEGRAM_BOT_API_TOKEN.
    #[arg(long)]
    token: Option<String>,

    /// SQLite file holding the bot settings. Overrides the config file and environment.
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = BotConfig::load(&cli.config)?;
    if let Some(token) = cli.token {
        config.telegram.token = token;
    }
    if let Some(path) = cli.database {
        config.database.url = sqlite_url_for_path(&path);
    }
    config.validate()?;

    // Settings must be durable before anything else happens
    let pool = create_pool(&config.database.url)
        .await
        .context("failed to open settings database")?;
    run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;
    let store = Arc::new(SettingsStore::new(pool));
    store
        .initialize()
        .await
        .context("failed to initialize bot settings")?;

    let client = Arc::new(TelegramClient::new(
        &config.telegram.api_url,
        &config.telegram.token,
        config.poll_timeout(),
    )?);
    let me = client
        .get_me()
        .await
        .context("failed to authenticate with Telegram")?;
    info!(bot_id = me.id, username = ?me.username, "authenticated with Telegram");

    let engine = Arc::new(BotEngine::new(
        store,
        client.clone(),
        config.admin.admin_user_ids.iter().copied(),
    ));

    // Stop polling on Ctrl-C
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    info!("joinguard starting");
    run_polling(client, engine.clone(), me.username, config.poll_timeout(), cancel).await;

    engine.shutdown().await;
    info!("joinguard stopped");
    Ok(())
}
