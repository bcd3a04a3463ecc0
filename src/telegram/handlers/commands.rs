//! Command handler implementations (/start, /whoami, /ping, /buy, /lessonsLeft)

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{ensure_registered, HandlerDeps, HandlerError, UserInfo};
use crate::core::error::{AppError, AppResult};
use crate::storage::db::Ticket;
use crate::telegram::Bot;
use crate::utils::lessons_phrase;

/// Generic failure reply, shown whenever a stateful command hits an
/// internal error. The real cause goes to the log, never to the user.
const FAILURE_REPLY: &str = "Something went wrong, please try again later.";

/// Handle /start command
pub(super) async fn handle_start_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    bot.send_message(msg.chat.id, "Welcome! The bot is up and running.").await?;
    Ok(())
}

/// Handle /whoami command
pub(super) async fn handle_whoami_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    let username = msg
        .from
        .as_ref()
        .and_then(|u| u.username.as_deref())
        .unwrap_or("unknown");
    bot.send_message(msg.chat.id, format!("Your username is {}", username))
        .await?;
    Ok(())
}

/// Handle /ping command
pub(super) async fn handle_ping_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    let now = Utc::now();
    bot.send_message(
        msg.chat.id,
        format!(
            "Pong! {} {}",
            now.format("%Y-%m-%d %H:%M:%S UTC"),
            now.timestamp_millis()
        ),
    )
    .await?;
    Ok(())
}

/// Handle /buy command
pub(super) async fn handle_buy_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let caller = UserInfo::from_message(msg).ok_or(AppError::MissingCaller)?;

    if let Err(e) = buy_season_ticket(bot, msg, &caller, deps).await {
        log::error!("/buy failed for user {}: {}", caller.telegram_id, e);
        let _ = bot.send_message(msg.chat.id, FAILURE_REPLY).await;
    }
    Ok(())
}

/// The purchase flow proper.
///
/// Any error short-circuits back to `handle_buy_command`, which replies
/// with the generic failure text; a success reply is never sent once
/// something has gone wrong.
async fn buy_season_ticket(bot: &Bot, msg: &Message, caller: &UserInfo, deps: &HandlerDeps) -> AppResult<()> {
    ensure_registered(bot, msg.chat.id, caller, &deps.tickets).await?;

    // Check-then-act: a concurrent /buy from the same user can slip
    // between the lookup and the insert and double-issue. Accepted as a
    // best-effort semantic; the store gives no cross-statement atomicity.
    if let Some(ticket) = deps.tickets.latest_ticket(caller.telegram_id)? {
        if ticket.is_active() {
            bot.send_message(msg.chat.id, active_ticket_reply(ticket.lessons_left()))
                .await?;
            return Ok(());
        }
    }

    deps.tickets.create_default_ticket(caller.telegram_id)?;
    bot.send_message(msg.chat.id, "You successfully bought a season ticket!")
        .await?;
    Ok(())
}

/// Handle /lessonsLeft command
pub(super) async fn handle_lessons_left_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let caller = UserInfo::from_message(msg).ok_or(AppError::MissingCaller)?;

    if let Err(e) = report_lessons_left(bot, msg, &caller, deps).await {
        log::error!("/lessonsLeft failed for user {}: {}", caller.telegram_id, e);
        let _ = bot.send_message(msg.chat.id, FAILURE_REPLY).await;
    }
    Ok(())
}

async fn report_lessons_left(bot: &Bot, msg: &Message, caller: &UserInfo, deps: &HandlerDeps) -> AppResult<()> {
    ensure_registered(bot, msg.chat.id, caller, &deps.tickets).await?;

    let latest = deps.tickets.latest_ticket(caller.telegram_id)?;
    bot.send_message(msg.chat.id, lessons_left_reply(latest.as_ref()))
        .await?;
    Ok(())
}

/// Reply for /buy when the latest ticket still has capacity.
fn active_ticket_reply(lessons_left: i64) -> String {
    format!(
        "You still have a valid season ticket: {} left.",
        lessons_phrase(lessons_left)
    )
}

/// Reply for /lessonsLeft given the latest ticket, if any.
///
/// "No ticket at all" and "ticket fully claimed" are distinct replies;
/// both point at /buy.
fn lessons_left_reply(latest: Option<&Ticket>) -> String {
    match latest {
        None => "You don't have a season ticket yet. Use /buy to get one.".to_string(),
        Some(t) if t.lessons_left() == 0 => {
            "Your season ticket is fully claimed. Use /buy to purchase a new one.".to_string()
        }
        Some(t) => format!("You have {} left.", lessons_phrase(t.lessons_left())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ticket(total: i64, used: i64) -> Ticket {
        Ticket {
            id: 1,
            user_id: 42,
            lessons_total: total,
            lessons_used: used,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_active_ticket_reply_pluralization() {
        assert_eq!(
            active_ticket_reply(4),
            "You still have a valid season ticket: 4 lessons left."
        );
        assert_eq!(
            active_ticket_reply(1),
            "You still have a valid season ticket: 1 lesson left."
        );
    }

    #[test]
    fn test_lessons_left_reply_without_ticket() {
        assert_eq!(
            lessons_left_reply(None),
            "You don't have a season ticket yet. Use /buy to get one."
        );
    }

    #[test]
    fn test_lessons_left_reply_fully_claimed() {
        let t = ticket(4, 4);
        assert_eq!(
            lessons_left_reply(Some(&t)),
            "Your season ticket is fully claimed. Use /buy to purchase a new one."
        );
    }

    #[test]
    fn test_lessons_left_reply_distinct_from_no_ticket() {
        let t = ticket(4, 4);
        assert_ne!(lessons_left_reply(Some(&t)), lessons_left_reply(None));
    }

    #[test]
    fn test_lessons_left_reply_with_capacity() {
        assert_eq!(lessons_left_reply(Some(&ticket(4, 0))), "You have 4 lessons left.");
        assert_eq!(lessons_left_reply(Some(&ticket(4, 3))), "You have 1 lesson left.");
    }
}
