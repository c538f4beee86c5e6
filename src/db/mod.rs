// Database module

pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::constants::{DB_FILENAME, HIDDEN_FOLDER};
use crate::error::Result;

/// Open or create a catalog database at the given path
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(db_path)?;

    // Enable foreign keys (must be done per connection)
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    // WAL so readers don't block the indexer
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// In-memory catalog with the schema applied
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

/// Catalog path kept inside the originals folder
pub fn get_db_path(originals: &Path) -> PathBuf {
    originals.join(HIDDEN_FOLDER).join(DB_FILENAME)
}
