//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;

/// Bot type used throughout the crate
pub use teloxide::Bot;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
