use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: database.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "database.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Public URL Telegram delivers webhook updates to
/// Read from WEBHOOK_URL environment variable; unset means polling only
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_URL").ok());

/// Local port the webhook listener binds to
/// Read from WEBHOOK_PORT environment variable
/// Default: 8443
pub static WEBHOOK_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("WEBHOOK_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8443)
});

/// Secret token Telegram echoes back in the X-Telegram-Bot-Api-Secret-Token
/// header; requests without it are rejected by the webhook listener
pub static WEBHOOK_SECRET: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_SECRET").ok());

/// Season ticket configuration
pub mod tickets {
    /// Number of lessons a freshly issued season ticket grants
    pub const DEFAULT_LESSONS: i64 = 4;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
