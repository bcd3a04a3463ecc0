//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{
    handle_buy_command, handle_lessons_left_command, handle_ping_command, handle_start_command, handle_whoami_command,
};
use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// This function returns a handler tree that can be used with teloxide's
/// Dispatcher. The same schema is used in production and in integration
/// tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry().branch(command_handler(deps))
}

/// Handler for bot commands.
///
/// Unrecognized command names fail the `filter_command` parse and fall
/// through the tree unanswered.
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start => handle_start_command(&bot, &msg).await?,
                    Command::Whoami => handle_whoami_command(&bot, &msg).await?,
                    Command::Ping => handle_ping_command(&bot, &msg).await?,
                    Command::Buy => handle_buy_command(&bot, &msg, &deps).await?,
                    Command::LessonsLeft => handle_lessons_left_command(&bot, &msg, &deps).await?,
                }
                Ok(())
            }
        },
    ))
}
