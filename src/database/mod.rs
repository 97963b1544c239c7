pub mod users;

use anyhow::{Context, anyhow};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tokio::sync::Semaphore;
use tokio::time::{Duration, timeout};

pub use users::UserStats;

const DB_TIMEOUT: Duration = Duration::from_secs(10);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    Ok(conn)
}

pub fn init_database(path: &Path) -> anyhow::Result<()> {
    let conn = open_connection(path)
        .with_context(|| format!("Failed to open database at {:?}", path))?;
    users::create_schema(&conn)?;
    Ok(())
}

/// Runs blocking SQLite work on tokio's blocking pool.
///
/// Every call opens its own connection, so a statement commits as soon as the
/// closure returns. The semaphore caps how many connections are open at once.
pub struct DatabasePool {
    path: PathBuf,
    permits: Semaphore,
    timeout: Duration,
}

impl DatabasePool {
    pub fn new(path: PathBuf, max_connections: usize) -> Self {
        Self {
            path,
            permits: Semaphore::new(max_connections.max(1)),
            timeout: DB_TIMEOUT,
        }
    }

    pub async fn execute_with_timeout<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .context("Database pool is closed")?;

        let path = self.path.clone();
        let task = tokio::task::spawn_blocking(move || {
            let conn = open_connection(&path)?;
            f(&conn)
        });

        match timeout(self.timeout, task).await {
            Ok(Ok(result)) => result.map_err(Into::into),
            Ok(Err(join_err)) => Err(anyhow!("Database task failed: {}", join_err)),
            Err(_) => Err(anyhow!("Database operation timed out after {:?}", self.timeout)),
        }
    }
}
