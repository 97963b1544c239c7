use rusqlite::{Connection, OptionalExtension, params};
use teloxide::types::UserId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_seen: String,
    pub is_blocked: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub blocked: i64,
}

/// Telegram sends user ids as u64; the table stores them as INTEGER.
pub fn user_key(user_id: UserId) -> Option<i64> {
    i64::try_from(user_id.0).ok()
}

pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    username TEXT,
    first_name TEXT,
    last_seen TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    is_blocked INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_users_is_blocked ON users (is_blocked);
"#,
    )
}

/// Inserts or fully replaces the record and marks the user reachable again.
pub fn upsert_user(
    conn: &Connection,
    user_id: i64,
    username: Option<&str>,
    first_name: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO users (user_id, username, first_name, last_seen, is_blocked)
         VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP, 0)",
        params![user_id, username, first_name],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT user_id, username, first_name, last_seen, is_blocked FROM users WHERE user_id = ?1",
        [user_id],
        |row| {
            Ok(UserRecord {
                user_id: row.get(0)?,
                username: row.get(1)?,
                first_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                last_seen: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                is_blocked: row.get::<_, i64>(4)? != 0,
            })
        },
    )
    .optional()
}

pub fn list_active(conn: &Connection) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT user_id FROM users WHERE is_blocked = 0")?;
    let users_iter = stmt.query_map([], |row| row.get::<_, i64>(0))?;
    let mut users = Vec::new();
    for user_result in users_iter {
        users.push(user_result?);
    }
    Ok(users)
}

/// Returns whether a row was touched; absent ids are a no-op.
pub fn mark_blocked(conn: &Connection, user_id: i64) -> rusqlite::Result<bool> {
    let updated = conn.execute("UPDATE users SET is_blocked = 1 WHERE user_id = ?1", [user_id])?;
    Ok(updated > 0)
}

pub fn purge_blocked(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM users WHERE is_blocked = 1", [])
}

pub fn stats(conn: &Connection) -> rusqlite::Result<UserStats> {
    let (total, active): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_blocked = 0 THEN 1 ELSE 0 END), 0) FROM users",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(UserStats {
        total,
        active,
        blocked: total - active,
    })
}
