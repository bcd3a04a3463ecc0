//! Bot initialization and command definitions
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command registration in the Telegram UI

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
///
/// Command names are matched verbatim, so `/lessonsLeft` keeps its original
/// camel-case spelling. Anything outside this set falls through the
/// dispatch tree unanswered.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "I can:")]
pub enum Command {
    #[command(description = "check that the bot is alive")]
    Start,
    #[command(description = "show your Telegram username")]
    Whoami,
    #[command(description = "show the current server time")]
    Ping,
    #[command(description = "buy a season ticket")]
    Buy,
    #[command(rename = "lessonsLeft", description = "show how many lessons remain on your season ticket")]
    LessonsLeft,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (missing token, invalid URL)
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;

    // Check if local Bot API server is configured
    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        Bot::with_client(config::BOT_TOKEN.clone(), client).set_api_url(url)
    } else {
        Bot::with_client(config::BOT_TOKEN.clone(), client)
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "check that the bot is alive"),
        BotCommand::new("whoami", "show your Telegram username"),
        BotCommand::new("ping", "show the current server time"),
        BotCommand::new("buy", "buy a season ticket"),
        BotCommand::new("lessonsLeft", "show how many lessons remain on your season ticket"),
    ])
    .await?;

    Ok(())
}
