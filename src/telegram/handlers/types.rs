//! Handler types, dependencies, and registration helpers

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::Message;

use crate::core::error::AppResult;
use crate::telegram::Bot;
use crate::tickets::TicketService;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
///
/// Constructed once at startup and cloned into each dispatch branch.
#[derive(Clone)]
pub struct HandlerDeps {
    pub tickets: Arc<TicketService>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(tickets: Arc<TicketService>) -> Self {
        Self { tickets }
    }
}

/// Caller identity extracted from an inbound message
#[derive(Clone)]
pub struct UserInfo {
    pub telegram_id: i64,
    pub username: Option<String>,
}

impl UserInfo {
    /// Extract the caller from a Telegram message.
    ///
    /// Returns `None` when the message carries no sender (channel posts,
    /// some service messages); stateful handlers abort that invocation
    /// before touching persistence.
    pub fn from_message(msg: &Message) -> Option<Self> {
        let from = msg.from.as_ref()?;
        let telegram_id = i64::try_from(from.id.0).ok()?;
        Some(Self {
            telegram_id,
            username: from.username.clone(),
        })
    }
}

/// Ensures the caller is registered, greeting them on first contact.
///
/// New users get an informational notice before the record is created.
/// This step always runs first in `/buy` and `/lessonsLeft`, so any
/// stateful command doubles as registration. A lost registration race is
/// absorbed inside `register_user`; the caller never sees it.
pub async fn ensure_registered(
    bot: &Bot,
    chat_id: ChatId,
    caller: &UserInfo,
    tickets: &TicketService,
) -> AppResult<()> {
    if tickets.user_exists(caller.telegram_id)? {
        return Ok(());
    }

    log::info!("New user {}: registering on first command", caller.telegram_id);
    bot.send_message(chat_id, "Looks like you're new here, I've signed you up.")
        .await?;
    tickets.register_user(caller.telegram_id, caller.username.clone())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Real Telegram update payloads are the simplest way to get a
    /// `Message` value in tests; teloxide's types are not hand-buildable.
    fn message_from_json(json: &str) -> Message {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_user_info_from_message() {
        let msg = message_from_json(
            r#"{
                "message_id": 1,
                "date": 1718000000,
                "chat": {"id": 42, "type": "private", "first_name": "Alice"},
                "from": {"id": 42, "is_bot": false, "first_name": "Alice", "username": "alice"},
                "text": "/buy"
            }"#,
        );

        let info = UserInfo::from_message(&msg).unwrap();
        assert_eq!(info.telegram_id, 42);
        assert_eq!(info.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_user_info_without_sender() {
        // Channel-style message without a `from` field
        let msg = message_from_json(
            r#"{
                "message_id": 2,
                "date": 1718000000,
                "chat": {"id": -100123, "type": "channel", "title": "news"},
                "text": "/buy"
            }"#,
        );

        assert!(UserInfo::from_message(&msg).is_none());
    }
}
