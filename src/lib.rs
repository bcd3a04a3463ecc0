//! Abonbot - Telegram bot for selling and tracking lesson season tickets
//!
//! A season ticket grants a user a fixed number of lessons. The bot
//! registers users lazily on their first stateful command, sells tickets
//! via `/buy`, and reports remaining capacity via `/lessonsLeft`.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, and logging
//! - `storage`: SQLite persistence for users and tickets
//! - `tickets`: business rules over the store
//! - `telegram`: bot integration and command handlers

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;
pub mod tickets;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
pub use tickets::TicketService;
