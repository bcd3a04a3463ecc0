use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Result;

use crate::core::error::{AppError, AppResult};

/// A registered user.
///
/// Created exactly once, lazily, the first time a stateful command needs
/// the caller's record. Never updated or deleted.
pub struct User {
    /// Telegram ID of the user
    pub telegram_id: i64,
    /// Telegram username, if available
    pub username: Option<String>,
}

/// A season ticket: a grant of `lessons_total` lessons to one user.
///
/// Tickets are only ever inserted; nothing in the bot mutates or deletes
/// them. A user accumulates tickets over time and only the most recently
/// created one counts as their entitlement.
#[derive(Debug, Clone)]
pub struct Ticket {
    /// Row id, assigned by SQLite
    pub id: i64,
    /// Owning user's Telegram ID
    pub user_id: i64,
    /// Capacity at issuance
    pub lessons_total: i64,
    /// Consumed count
    pub lessons_used: i64,
    /// Issuance timestamp (UTC, as stored by SQLite)
    pub created_at: String,
}

impl Ticket {
    /// Remaining capacity on this ticket.
    ///
    /// The schema CHECK constraint keeps `lessons_used` within
    /// `[0, lessons_total]`, so this never goes negative.
    pub fn lessons_left(&self) -> i64 {
        self.lessons_total - self.lessons_used
    }

    /// Whether this ticket still grants lessons.
    pub fn is_active(&self) -> bool {
        self.lessons_left() > 0
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and ensures the
/// schema exists on the first connection.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Errors
///
/// Returns an error if the pool cannot be built or the schema cannot be
/// created.
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)
        .map_err(AppError::DatabasePool)?;

    let conn = pool.get().map_err(AppError::DatabasePool)?;
    init_schema(&conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Create the users and tickets tables if they do not exist yet.
///
/// `CREATE TABLE IF NOT EXISTS` keeps this idempotent, so concurrent
/// instances starting against the same file are harmless.
fn init_schema(conn: &DbConnection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            telegram_id INTEGER PRIMARY KEY,
            username TEXT
        );
        CREATE TABLE IF NOT EXISTS tickets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(telegram_id),
            lessons_total INTEGER NOT NULL,
            lessons_used INTEGER NOT NULL DEFAULT 0
                CHECK (lessons_used >= 0 AND lessons_used <= lessons_total),
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_tickets_user_created ON tickets(user_id, created_at);",
    )?;
    Ok(())
}

/// Insert a new user.
///
/// # Errors
///
/// Returns a constraint-violation error if a user with this Telegram ID
/// already exists; callers that tolerate concurrent registration absorb
/// that case (see `TicketService::register_user`).
pub fn create_user(conn: &DbConnection, telegram_id: i64, username: Option<String>) -> Result<()> {
    conn.execute(
        "INSERT INTO users (telegram_id, username) VALUES (?1, ?2)",
        &[&telegram_id as &dyn rusqlite::ToSql, &username as &dyn rusqlite::ToSql],
    )?;
    Ok(())
}

/// Fetch a user by Telegram ID.
///
/// Returns `Ok(None)` when the user is not registered.
pub fn get_user(conn: &DbConnection, telegram_id: i64) -> Result<Option<User>> {
    let mut stmt = conn.prepare("SELECT telegram_id, username FROM users WHERE telegram_id = ?")?;
    let mut rows = stmt.query(&[&telegram_id as &dyn rusqlite::ToSql])?;

    if let Some(row) = rows.next()? {
        Ok(Some(User {
            telegram_id: row.get(0)?,
            username: row.get(1)?,
        }))
    } else {
        Ok(None)
    }
}

/// Insert a new season ticket for a user with the given capacity.
///
/// No eligibility check happens here; deciding whether a new ticket may be
/// issued is the caller's job.
pub fn create_ticket(conn: &DbConnection, user_id: i64, lessons_total: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO tickets (user_id, lessons_total, lessons_used) VALUES (?1, ?2, 0)",
        &[&user_id as &dyn rusqlite::ToSql, &lessons_total as &dyn rusqlite::ToSql],
    )?;
    Ok(())
}

/// Fetch the most recently created ticket for a user.
///
/// `created_at` has second granularity, so the row id breaks ties between
/// tickets issued within the same second.
pub fn get_latest_ticket(conn: &DbConnection, user_id: i64) -> Result<Option<Ticket>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, lessons_total, lessons_used, created_at
         FROM tickets WHERE user_id = ?
         ORDER BY created_at DESC, id DESC LIMIT 1",
    )?;
    let mut rows = stmt.query(&[&user_id as &dyn rusqlite::ToSql])?;

    if let Some(row) = rows.next()? {
        Ok(Some(Ticket {
            id: row.get(0)?,
            user_id: row.get(1)?,
            lessons_total: row.get(2)?,
            lessons_used: row.get(3)?,
            created_at: row.get(4)?,
        }))
    } else {
        Ok(None)
    }
}

/// Count tickets belonging to a user.
pub fn count_tickets(conn: &DbConnection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM tickets WHERE user_id = ?",
        &[&user_id as &dyn rusqlite::ToSql],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // The TempDir guard must outlive the pool, so both are handed back.
    fn test_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let pool = create_pool(path.to_str().unwrap()).unwrap();
        (dir, pool)
    }

    #[test]
    fn test_create_and_get_user() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        assert!(get_user(&conn, 42).unwrap().is_none());

        create_user(&conn, 42, Some("alice".to_string())).unwrap();
        let user = get_user(&conn, 42).unwrap().unwrap();
        assert_eq!(user.telegram_id, 42);
        assert_eq!(user.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_duplicate_user_is_constraint_violation() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        create_user(&conn, 7, None).unwrap();
        let err = create_user(&conn, 7, None).unwrap_err();
        match err {
            rusqlite::Error::SqliteFailure(e, _) => {
                assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_latest_ticket_ordering() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        create_user(&conn, 1, None).unwrap();
        create_ticket(&conn, 1, 4).unwrap();
        create_ticket(&conn, 1, 8).unwrap();

        // Both rows share a CURRENT_TIMESTAMP second; the id tie-breaker
        // must pick the second insert.
        let latest = get_latest_ticket(&conn, 1).unwrap().unwrap();
        assert_eq!(latest.lessons_total, 8);

        // An older timestamp never wins, whatever its id.
        conn.execute(
            "UPDATE tickets SET created_at = '2000-01-01 00:00:00' WHERE lessons_total = 8",
            [],
        )
        .unwrap();
        let latest = get_latest_ticket(&conn, 1).unwrap().unwrap();
        assert_eq!(latest.lessons_total, 4);
    }

    #[test]
    fn test_lessons_left() {
        let ticket = Ticket {
            id: 1,
            user_id: 1,
            lessons_total: 4,
            lessons_used: 1,
            created_at: "2024-01-01 00:00:00".to_string(),
        };
        assert_eq!(ticket.lessons_left(), 3);
        assert!(ticket.is_active());

        let spent = Ticket { lessons_used: 4, ..ticket };
        assert_eq!(spent.lessons_left(), 0);
        assert!(!spent.is_active());
    }

    #[test]
    fn test_used_cannot_exceed_total() {
        let (_dir, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        create_user(&conn, 1, None).unwrap();
        let result = conn.execute(
            "INSERT INTO tickets (user_id, lessons_total, lessons_used) VALUES (1, 4, 5)",
            [],
        );
        assert!(result.is_err());
    }
}
