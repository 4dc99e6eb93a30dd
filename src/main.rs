//! # MunaLuna Tracker Bot Main Entry Point
//!
//! Initializes logging, loads configuration, opens the tracker store,
//! and runs the Telegram bot next to the health check server.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use munaluna_tracker_bot::bot::commands::Command;
use munaluna_tracker_bot::bot::dispatcher::CommandDispatcher;
use munaluna_tracker_bot::bot::handlers::BotHandler;
use munaluna_tracker_bot::config::{Config, StorageBackend};
use munaluna_tracker_bot::database::connection::DatabaseManager;
use munaluna_tracker_bot::services::health::HealthService;
use munaluna_tracker_bot::store::{MemoryStore, SqliteStore, TrackerStore};
use munaluna_tracker_bot::utils::logging::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "munaluna_tracker_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting MunaLuna Tracker Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded - Storage: {:?}, HTTP Port: {}",
        config.storage_backend, config.http_port);

    let store = open_store(&config).await?;
    log_system_event("store ready", Some(store.backend()));

    // Initialize bot
    info!("Initializing Telegram bot...");
    let bot = Bot::new(&config.telegram_bot_token);
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!("Failed to register bot commands: {}", e);
    }
    let handler = BotHandler::new(CommandDispatcher::new(store.clone()));
    info!("Telegram bot initialized successfully");

    let health_service = HealthService::new(store);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    // Run both the bot and health server concurrently
    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    // Wait for either task to complete (which would indicate shutdown)
    tokio::select! {
        result1 = bot_task => {
            if let Err(e) = result1 {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result2 = health_task => {
            if let Err(e) = result2 {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    info!("Application stopped");
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn TrackerStore>> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; progress is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            info!("Initializing database connection...");
            let db = DatabaseManager::with_timeout(&config.database_url, config.storage_timeout).await?;
            info!("Running database migrations...");
            db.run_migrations().await?;
            info!("Database initialized successfully");
            Ok(Arc::new(SqliteStore::new(db, config.storage_timeout)))
        }
    }
}
