use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;

use abonbot::cli::{Cli, Commands};
use abonbot::core::{config, init_logger};
use abonbot::storage::create_pool;
use abonbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use abonbot::TicketService;

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the run mode.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up global panic handler so a panicking dispatcher task is logged
    // instead of dying silently
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Load environment variables from .env if present; config statics are
    // lazy, so this must happen before anything reads them
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { webhook }) => {
            log::info!("Running bot (webhook: {})", webhook);
            run_bot(webhook).await
        }
        None => {
            // No command specified - default to polling mode
            log::info!("No command specified, running bot in polling mode");
            run_bot(false).await
        }
    }
}

/// Run the Telegram bot
async fn run_bot(use_webhook: bool) -> Result<()> {
    log::info!("Starting bot...");

    // Create bot instance
    let bot = create_bot()?;

    // Register commands in the Telegram UI
    setup_bot_commands(&bot).await?;

    // Create database connection pool; schema is bootstrapped here
    let db_pool = Arc::new(create_pool(&config::DATABASE_PATH)?);
    let tickets = Arc::new(TicketService::new(Arc::clone(&db_pool)));

    // Create the dispatcher handler tree
    let handler = schema(HandlerDeps::new(tickets));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build();

    let webhook_url = if use_webhook { config::WEBHOOK_URL.clone() } else { None };
    if use_webhook && webhook_url.is_none() {
        log::warn!("--webhook given but WEBHOOK_URL is not set; falling back to long polling");
    }

    if let Some(url) = webhook_url {
        // Webhook mode: teloxide's axum listener registers the webhook
        // with Telegram and serves the update endpoint. Telegram echoes
        // the secret token back on every delivery; requests without it
        // are rejected before they reach the handler tree.
        use teloxide::update_listeners::webhooks;

        log::info!("Starting bot in webhook mode at {}", url);

        let addr = ([0, 0, 0, 0], *config::WEBHOOK_PORT).into();
        let mut options = webhooks::Options::new(addr, url::Url::parse(&url)?);
        if let Some(secret) = config::WEBHOOK_SECRET.clone() {
            options = options.secret_token(secret);
        }

        let listener = webhooks::axum(bot, options).await?;
        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;
    } else {
        // Long polling mode (default)
        log::info!("Starting bot in long polling mode");
        dispatcher.dispatch().await;
    }

    Ok(())
}
