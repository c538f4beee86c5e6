// Catalog schema steps, applied in order and tracked in PRAGMA user_version.
// A shipped step is never edited; changes go in a new one.

use rusqlite::Connection;

use crate::error::{CatalogError, Result};

const MIGRATIONS: &[&str] = &[
    // 1: photos, files, folders
    r#"
    -- Photos table (one row per asset group)
    CREATE TABLE photos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uid TEXT NOT NULL UNIQUE,
        taken_at TEXT NOT NULL,
        taken_at_local TEXT NOT NULL,
        taken_src TEXT NOT NULL DEFAULT 'auto'
            CHECK (taken_src IN ('manual', 'meta', 'name', 'auto', 'estimate')),
        time_zone TEXT NOT NULL DEFAULT '',
        photo_path TEXT NOT NULL DEFAULT '',
        photo_name TEXT NOT NULL DEFAULT '',
        original_name TEXT NOT NULL DEFAULT '',
        media_type TEXT NOT NULL DEFAULT 'photo',
        title TEXT NOT NULL DEFAULT '',
        title_src TEXT NOT NULL DEFAULT 'auto',
        description TEXT NOT NULL DEFAULT '',
        lat REAL NOT NULL DEFAULT 0,
        lng REAL NOT NULL DEFAULT 0,
        altitude REAL NOT NULL DEFAULT 0,
        cell_id TEXT NOT NULL DEFAULT '',
        place_id TEXT NOT NULL DEFAULT 'zz',
        country TEXT NOT NULL DEFAULT 'zz',
        place_src TEXT NOT NULL DEFAULT 'auto'
            CHECK (place_src IN ('auto', 'meta', 'estimate', 'manual')),
        year INTEGER NOT NULL DEFAULT 0,
        month INTEGER NOT NULL DEFAULT 0,
        camera_make TEXT NOT NULL DEFAULT '',
        camera_model TEXT NOT NULL DEFAULT '',
        lens_model TEXT NOT NULL DEFAULT '',
        iso INTEGER NOT NULL DEFAULT 0,
        f_number REAL NOT NULL DEFAULT 0,
        exposure TEXT NOT NULL DEFAULT '',
        focal_length INTEGER NOT NULL DEFAULT 0,
        width INTEGER NOT NULL DEFAULT 0,
        height INTEGER NOT NULL DEFAULT 0,
        keywords TEXT NOT NULL DEFAULT '',
        labels TEXT NOT NULL DEFAULT '[]',
        quality INTEGER NOT NULL DEFAULT 0,
        document_id TEXT NOT NULL DEFAULT '',
        stack_uid TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
        updated_at TEXT,
        maintained_at TEXT,
        checked_at TEXT
    );

    -- Files table (one row per indexed file)
    CREATE TABLE files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        photo_id INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
        root TEXT NOT NULL,
        path TEXT NOT NULL,
        size INTEGER NOT NULL,
        mod_time INTEGER NOT NULL,
        hash TEXT NOT NULL DEFAULT '',
        checksum TEXT NOT NULL DEFAULT '',
        file_type TEXT NOT NULL,
        media_kind TEXT NOT NULL,
        mime TEXT NOT NULL DEFAULT '',
        is_primary INTEGER NOT NULL DEFAULT 0,
        width INTEGER NOT NULL DEFAULT 0,
        height INTEGER NOT NULL DEFAULT 0,
        metadata_error TEXT,
        indexed_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
        UNIQUE(root, path)
    );

    -- Folders seen while indexing
    CREATE TABLE folders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        root TEXT NOT NULL,
        path TEXT NOT NULL,
        mod_time INTEGER NOT NULL DEFAULT 0,
        photo_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
        UNIQUE(root, path)
    );

    -- Indexes
    CREATE INDEX idx_photos_taken_at ON photos(taken_at);
    CREATE INDEX idx_photos_place ON photos(place_id, place_src);
    CREATE INDEX idx_photos_document ON photos(document_id);
    CREATE INDEX idx_files_photo ON files(photo_id);
    "#,
    // 2: stack lookups by capture time and cell
    r#"
    CREATE INDEX idx_photos_stack_meta ON photos(taken_at, cell_id, camera_model);
    CREATE INDEX idx_photos_checked ON photos(checked_at);
    "#,
];

pub fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings the schema up to date; each step commits together with its version
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let have = schema_version(conn)? as usize;
    if have > MIGRATIONS.len() {
        return Err(CatalogError::Config(format!(
            "catalog schema version {} is newer than this build supports (max {})",
            have,
            MIGRATIONS.len()
        )));
    }

    for (step, sql) in MIGRATIONS.iter().enumerate().skip(have) {
        let version = step + 1;
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version as u32)?;
        tx.commit()?;
        log::info!("Catalog: schema at version {}", version);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_apply_once() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), MIGRATIONS.len() as u32);

        run_migrations(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_resumes_from_partial_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0]).unwrap();
        conn.pragma_update(None, "user_version", 1u32).unwrap();

        run_migrations(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 99").unwrap();
        let err = run_migrations(&conn).unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
    }
}
