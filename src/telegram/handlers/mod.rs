//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the bot. The
//! handlers are organized so integration tests can exercise the same
//! handler tree as production code.

mod commands;
mod schema;
mod types;

pub use schema::schema;
pub use types::{ensure_registered, HandlerDeps, HandlerError, UserInfo};
