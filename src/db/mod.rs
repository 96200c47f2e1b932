//! SQLite access. One connection behind a mutex; handlers hop onto the
//! blocking pool (`tokio::task::spawn_blocking`) for every query.

pub mod migrations;
pub mod models;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;

pub type DbPool = Arc<Mutex<Connection>>;

const DB_FILE: &str = "glory.db";

/// Open (or create) the database under `data_dir` and bring the schema up to
/// date.
pub fn init_db(data_dir: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = Path::new(data_dir).join(DB_FILE);

    let mut conn = Connection::open(&db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // The schema relies on ON DELETE CASCADE; sqlite only honors it with
    // foreign_keys on
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    migrations::migrations().to_latest(&mut conn)?;
    tracing::info!(path = %db_path.display(), "Database ready");

    Ok(Arc::new(Mutex::new(conn)))
}
