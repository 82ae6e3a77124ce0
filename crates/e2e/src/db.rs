//! Storefront login-attempt records
//!
//! The storefront rate-limits logins per email. Login scenarios clear the
//! records for their account first so earlier failed attempts do not lock
//! it out.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::DbError;

/// Access to the login-attempt table
pub struct LoginAttemptStore {
    conn: Mutex<Connection>,
    table: String,
}

impl LoginAttemptStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path.as_ref())?;
        let store = Self::with_connection(conn, table)?;
        info!("Opened login-attempt store at {:?}", path.as_ref());
        Ok(store)
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self, DbError> {
        Self::open(&config.path, &config.login_table)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory(table: &str) -> Result<Self, DbError> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self, DbError> {
        validate_table_name(table)?;
        let store = Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), DbError> {
        let conn = self.conn.lock();
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                customer_login_id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                ip TEXT NOT NULL DEFAULT '',
                total INTEGER NOT NULL DEFAULT 1,
                date_added TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                date_modified TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_email ON {table}(email);
            "#,
            table = self.table
        ))?;
        Ok(())
    }

    /// Delete every login-attempt record for `email`; returns rows removed.
    pub fn reset_login_attempts(&self, email: &str) -> Result<usize, DbError> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE email = ?1", self.table),
            params![email],
        )?;
        info!("Reset {} login attempt record(s) for {}", removed, email);
        Ok(removed)
    }

    /// Record a failed login, as the storefront would.
    pub fn record_attempt(&self, email: &str, ip: &str) -> Result<(), DbError> {
        let conn = self.conn.lock();
        conn.execute(
            &format!("INSERT INTO {} (email, ip) VALUES (?1, ?2)", self.table),
            params![email, ip],
        )?;
        debug!("Recorded login attempt for {}", email);
        Ok(())
    }

    /// Number of attempt records for `email`.
    pub fn attempts(&self, email: &str) -> Result<usize, DbError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE email = ?1", self.table),
            params![email],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

// Table names cannot be bound as parameters, so only plain identifiers are accepted.
fn validate_table_name(table: &str) -> Result<(), DbError> {
    let valid = !table.is_empty()
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(DbError::InvalidTable(table.to_string()))
    }
}
