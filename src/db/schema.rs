//! SQLite schema for the user/car/group graph.
//!
//! `users`, `cars` and `groups` hold the entities. Car ownership is a
//! non-null foreign key on `cars`; group membership lives only in the
//! `group_users` join table, so both directions of the edge read the same
//! rows.

use std::time::Duration;

use rusqlite::Connection;

use crate::config::DatabaseConfig;

// ---------------------------------------------------------------------------
// DDL constants
// ---------------------------------------------------------------------------

const CREATE_USERS: &str = "\
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  age INTEGER NOT NULL
)";

const CREATE_CARS: &str = "\
CREATE TABLE IF NOT EXISTS cars (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  model TEXT NOT NULL,
  registered_at TEXT NOT NULL,
  owner_id INTEGER NOT NULL,
  FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
)";

const CREATE_GROUPS: &str = "\
CREATE TABLE IF NOT EXISTS \"groups\" (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL
)";

const CREATE_GROUP_USERS: &str = "\
CREATE TABLE IF NOT EXISTS group_users (
  group_id INTEGER NOT NULL,
  user_id INTEGER NOT NULL,
  PRIMARY KEY (group_id, user_id),
  FOREIGN KEY (group_id) REFERENCES \"groups\"(id) ON DELETE CASCADE,
  FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
)";

// Indexes ----------------------------------------------------------------

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_users_name ON users(name)",
    "CREATE INDEX IF NOT EXISTS idx_cars_owner ON cars(owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_cars_model ON cars(model)",
    "CREATE INDEX IF NOT EXISTS idx_groups_name ON \"groups\"(name)",
    "CREATE INDEX IF NOT EXISTS idx_group_users_user ON group_users(user_id)",
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open the database described by `config` and apply its connection
/// pragmas. Does not touch the schema.
///
/// # Errors
///
/// Returns a `rusqlite::Error` if the file cannot be opened or a pragma is
/// rejected.
pub fn open_connection(config: &DatabaseConfig) -> rusqlite::Result<Connection> {
    let conn = if config.is_in_memory() {
        Connection::open_in_memory()?
    } else {
        Connection::open(&config.path)?
    };

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    // journal_mode answers with the mode actually in effect; in-memory
    // databases report "memory" whatever was asked for.
    let _mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.as_str(),
        |row| row.get(0),
    )?;
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;

    Ok(conn)
}

/// Create every table and index that does not exist yet. Idempotent.
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_USERS)?;
    conn.execute_batch(CREATE_CARS)?;
    conn.execute_batch(CREATE_GROUPS)?;
    conn.execute_batch(CREATE_GROUP_USERS)?;

    for ddl in CREATE_INDEXES {
        conn.execute_batch(ddl)?;
    }

    Ok(())
}

/// Open the database and apply the schema in one step.
pub fn initialize_database(config: &DatabaseConfig) -> rusqlite::Result<Connection> {
    let conn = open_connection(config)?;
    apply_schema(&conn)?;
    Ok(conn)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
