//! Business rules over the user/ticket store
//!
//! Everything that touches ticket state goes through [`TicketService`].
//! The service decides nothing about purchase eligibility itself; handlers
//! own that decision and the service gives them the primitives: existence
//! checks, idempotent registration, latest-ticket lookup, and unconditional
//! issuance.

use std::sync::Arc;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::storage::db::{self, Ticket};
use crate::storage::{get_connection, DbConnection, DbPool};

/// Stateless service over the persistent store.
///
/// Constructed once at startup and shared across request handlers; every
/// call borrows a pooled connection for its own duration, so concurrent
/// invocations never contend on in-process state.
pub struct TicketService {
    db_pool: Arc<DbPool>,
}

impl TicketService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    fn conn(&self) -> AppResult<DbConnection> {
        get_connection(&self.db_pool).map_err(AppError::DatabasePool)
    }

    /// Whether a user record exists for this Telegram ID.
    pub fn user_exists(&self, telegram_id: i64) -> AppResult<bool> {
        let conn = self.conn()?;
        Ok(db::get_user(&conn, telegram_id)?.is_some())
    }

    /// Register a user, treating "already registered" as success.
    ///
    /// Two concurrent invocations for the same new user may both attempt
    /// the insert; the loser hits the primary-key constraint and the
    /// desired end state (user exists) is already reached, so that failure
    /// is absorbed here rather than surfaced.
    pub fn register_user(&self, telegram_id: i64, username: Option<String>) -> AppResult<()> {
        let conn = self.conn()?;
        match db::create_user(&conn, telegram_id, username) {
            Ok(()) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                log::debug!("User {} already registered, treating as success", telegram_id);
                Ok(())
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// The most recently created ticket for a user, if any.
    pub fn latest_ticket(&self, telegram_id: i64) -> AppResult<Option<Ticket>> {
        let conn = self.conn()?;
        Ok(db::get_latest_ticket(&conn, telegram_id)?)
    }

    /// Issue a new season ticket unconditionally.
    ///
    /// Eligibility (no active ticket left) is checked by the caller before
    /// this point. Two near-simultaneous `/buy` invocations can therefore
    /// both land here; that double issuance is an accepted best-effort
    /// semantic, not a guaranteed at-most-one.
    pub fn create_ticket(&self, telegram_id: i64, lessons_total: i64) -> AppResult<()> {
        let conn = self.conn()?;
        db::create_ticket(&conn, telegram_id, lessons_total)?;
        log::info!(
            "Issued season ticket for user {} ({} lessons)",
            telegram_id,
            lessons_total
        );
        Ok(())
    }

    /// Issue a ticket with the default capacity.
    pub fn create_default_ticket(&self, telegram_id: i64) -> AppResult<()> {
        self.create_ticket(telegram_id, config::tickets::DEFAULT_LESSONS)
    }
}

/// True for any SQLite constraint failure (duplicate key on our inserts).
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::create_pool;

    fn test_service() -> (tempfile::TempDir, TicketService) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let pool = Arc::new(create_pool(path.to_str().unwrap()).unwrap());
        (dir, TicketService::new(pool))
    }

    #[test]
    fn test_register_user_is_idempotent() {
        let (_dir, service) = test_service();

        assert!(!service.user_exists(42).unwrap());
        service.register_user(42, Some("alice".to_string())).unwrap();
        assert!(service.user_exists(42).unwrap());

        // Second registration races are absorbed, never surfaced.
        service.register_user(42, Some("alice".to_string())).unwrap();
        assert!(service.user_exists(42).unwrap());
    }

    #[test]
    fn test_latest_ticket_absent_for_new_user() {
        let (_dir, service) = test_service();
        service.register_user(1, None).unwrap();
        assert!(service.latest_ticket(1).unwrap().is_none());
    }

    #[test]
    fn test_create_default_ticket_capacity() {
        let (_dir, service) = test_service();
        service.register_user(1, None).unwrap();
        service.create_default_ticket(1).unwrap();

        let ticket = service.latest_ticket(1).unwrap().unwrap();
        assert_eq!(ticket.lessons_total, 4);
        assert_eq!(ticket.lessons_used, 0);
        assert_eq!(ticket.lessons_left(), 4);
    }

    #[test]
    fn test_create_ticket_is_unconditional() {
        let (_dir, service) = test_service();
        service.register_user(1, None).unwrap();

        // The service itself never refuses; the eligibility rule lives in
        // the command handler.
        service.create_default_ticket(1).unwrap();
        service.create_default_ticket(1).unwrap();

        let conn = get_connection(service.db_pool.as_ref()).unwrap();
        assert_eq!(db::count_tickets(&conn, 1).unwrap(), 2);
    }
}
