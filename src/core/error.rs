use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent
/// error handling. Uses `thiserror` for automatic error conversion and
/// display formatting.
///
/// An absent user or ticket is not an error; those are `Option::None` on the
/// lookup path. `MissingCaller` covers updates that carry no sender identity
/// and aborts the invocation before any persistence call.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Inbound message without a sender
    #[error("message has no sender identity")]
    MissingCaller,
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
