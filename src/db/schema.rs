// Database schema query helpers

use rusqlite::types::{Null, ToSqlOutput};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use crate::catalog::record::{
    format_time, parse_local_time, parse_time, Label, PlaceSource, TitleSource,
};
use crate::catalog::{ColumnValue, FileRecord, FolderRecord, NearestFilter, PhotoRecord};
use crate::config::DistanceExpr;
use crate::constants::UNKNOWN_ID;
use crate::error::{CatalogError, Result};
use crate::media::{MediaKind, TimeSource};

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ColumnValue::Text(s) => ToSqlOutput::from(s.as_str()),
            ColumnValue::Int(i) => ToSqlOutput::from(*i),
            ColumnValue::Real(f) => ToSqlOutput::from(*f),
            ColumnValue::Null => ToSqlOutput::from(Null),
        })
    }
}

// ----- Photo -----

const PHOTO_COLUMNS: &str = "id, uid, taken_at, taken_at_local, taken_src, time_zone,
    photo_path, photo_name, original_name, media_type, title, title_src, description,
    lat, lng, altitude, cell_id, place_id, country, place_src, year, month,
    camera_make, camera_model, lens_model, iso, f_number, exposure, focal_length,
    width, height, keywords, labels, quality, document_id, stack_uid,
    updated_at, maintained_at, checked_at";

/// Columns a caller may set through `update_photo_columns`
const UPDATABLE_COLUMNS: &[&str] = &[
    "taken_at", "taken_at_local", "taken_src", "time_zone", "photo_path", "photo_name",
    "original_name", "media_type", "title", "title_src", "description", "lat", "lng",
    "altitude", "cell_id", "place_id", "country", "place_src", "year", "month",
    "camera_make", "camera_model", "lens_model", "iso", "f_number", "exposure",
    "focal_length", "width", "height", "keywords", "labels", "quality", "document_id",
    "stack_uid", "updated_at", "maintained_at", "checked_at",
];

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<PhotoRecord> {
    let taken_at: String = row.get(2)?;
    let taken_at_local: String = row.get(3)?;
    let keywords: String = row.get(31)?;
    let labels: String = row.get(32)?;
    let updated_at: Option<String> = row.get(36)?;
    let maintained_at: Option<String> = row.get(37)?;
    let checked_at: Option<String> = row.get(38)?;

    let taken_at = parse_time(&taken_at).unwrap_or_default();
    let taken_at_local = parse_local_time(&taken_at_local).unwrap_or_else(|| taken_at.naive_utc());

    Ok(PhotoRecord {
        id: row.get(0)?,
        uid: row.get(1)?,
        taken_at,
        taken_at_local,
        taken_src: TimeSource::parse(&row.get::<_, String>(4)?),
        time_zone: row.get(5)?,
        photo_path: row.get(6)?,
        photo_name: row.get(7)?,
        original_name: row.get(8)?,
        media_type: MediaKind::parse(&row.get::<_, String>(9)?),
        title: row.get(10)?,
        title_src: TitleSource::parse(&row.get::<_, String>(11)?),
        description: row.get(12)?,
        lat: row.get(13)?,
        lng: row.get(14)?,
        altitude: row.get(15)?,
        cell_id: row.get(16)?,
        place_id: row.get(17)?,
        country: row.get(18)?,
        place_src: PlaceSource::parse(&row.get::<_, String>(19)?),
        year: row.get(20)?,
        month: row.get(21)?,
        camera_make: row.get(22)?,
        camera_model: row.get(23)?,
        lens_model: row.get(24)?,
        iso: row.get(25)?,
        f_number: row.get(26)?,
        exposure: row.get(27)?,
        focal_length: row.get(28)?,
        width: row.get(29)?,
        height: row.get(30)?,
        keywords: split_keywords(&keywords),
        labels: serde_json::from_str::<Vec<Label>>(&labels).unwrap_or_default(),
        quality: row.get(33)?,
        document_id: row.get(34)?,
        stack_uid: row.get(35)?,
        updated_at: updated_at.as_deref().and_then(parse_time),
        maintained_at: maintained_at.as_deref().and_then(parse_time),
        checked_at: checked_at.as_deref().and_then(parse_time),
    })
}

fn split_keywords(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

pub fn insert_photo(conn: &Connection, photo: &PhotoRecord) -> Result<i64> {
    let columns = photo.columns();
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (2..=columns.len() + 1).map(|i| format!("?{}", i)).collect();

    let sql = format!(
        "INSERT INTO photos (uid, {}) VALUES (?1, {})",
        names.join(", "),
        placeholders.join(", ")
    );

    let mut params_vec: Vec<&dyn ToSql> = Vec::with_capacity(columns.len() + 1);
    params_vec.push(&photo.uid);
    params_vec.extend(columns.iter().map(|(_, value)| value as &dyn ToSql));
    conn.execute(&sql, params_vec.as_slice())?;
    Ok(conn.last_insert_rowid())
}

pub fn get_photo(conn: &Connection, id: i64) -> Result<Option<PhotoRecord>> {
    let sql = format!("SELECT {} FROM photos WHERE id = ?1", PHOTO_COLUMNS);
    let result = conn.query_row(&sql, params![id], photo_from_row).optional()?;
    Ok(result)
}

pub fn get_photo_by_uid(conn: &Connection, uid: &str) -> Result<Option<PhotoRecord>> {
    let sql = format!("SELECT {} FROM photos WHERE uid = ?1", PHOTO_COLUMNS);
    let result = conn.query_row(&sql, params![uid], photo_from_row).optional()?;
    Ok(result)
}

/// Set the given columns; returns the number of rows touched
pub fn update_photo_columns(
    conn: &Connection,
    id: i64,
    fields: &[(&str, ColumnValue)],
) -> Result<usize> {
    if fields.is_empty() {
        return Ok(0);
    }

    let mut set_clauses = Vec::with_capacity(fields.len());
    let mut params_vec: Vec<&dyn ToSql> = Vec::with_capacity(fields.len() + 1);

    for (name, value) in fields {
        if !UPDATABLE_COLUMNS.contains(name) {
            return Err(CatalogError::Other(format!("unknown photo column {}", name)));
        }
        set_clauses.push(format!("{} = ?{}", name, params_vec.len() + 1));
        params_vec.push(value);
    }

    params_vec.push(&id);
    let id_param = params_vec.len();

    let sql = format!(
        "UPDATE photos SET {} WHERE id = ?{}",
        set_clauses.join(", "),
        id_param
    );

    let changed = conn.execute(&sql, params_vec.as_slice())?;
    Ok(changed)
}

/// Nearest record in time with a known, non-estimated place
pub fn find_nearest_in_time(
    conn: &Connection,
    filter: &NearestFilter,
    distance: DistanceExpr,
) -> Result<Option<PhotoRecord>> {
    let order = match distance {
        DistanceExpr::JulianDay => "ABS(julianday(taken_at) - julianday(?2))",
        DistanceExpr::DayDiff => "ABS(julianday(date(taken_at)) - julianday(date(?2)))",
    };

    let mut conditions = vec!["id <> ?1".to_string()];
    if filter.require_place {
        conditions.push(format!("place_id <> '' AND place_id <> '{}'", UNKNOWN_ID));
    }
    if filter.exclude_estimated {
        conditions.push("place_src <> 'estimate'".to_string());
    }

    let sql = format!(
        "SELECT {} FROM photos WHERE {} ORDER BY {} ASC, id ASC LIMIT 1",
        PHOTO_COLUMNS,
        conditions.join(" AND "),
        order
    );

    let result = conn
        .query_row(
            &sql,
            params![filter.exclude_id, format_time(filter.taken_at)],
            photo_from_row,
        )
        .optional()?;
    Ok(result)
}

/// Other records that look like the same moment or document
pub fn find_stack_candidates(
    conn: &Connection,
    photo: &PhotoRecord,
    by_meta: bool,
    by_uuid: bool,
) -> Result<Vec<PhotoRecord>> {
    let taken_at = format_time(photo.taken_at);
    let mut alternatives = Vec::new();
    let mut params_vec: Vec<&dyn ToSql> = Vec::with_capacity(5);
    params_vec.push(&photo.id);

    if by_meta && photo.has_location() && !photo.camera_model.is_empty() {
        let n = params_vec.len();
        alternatives.push(format!(
            "(taken_at = ?{} AND cell_id = ?{} AND camera_model = ?{})",
            n + 1,
            n + 2,
            n + 3
        ));
        params_vec.push(&taken_at);
        params_vec.push(&photo.cell_id);
        params_vec.push(&photo.camera_model);
    }
    if by_uuid && !photo.document_id.is_empty() {
        alternatives.push(format!("(document_id = ?{})", params_vec.len() + 1));
        params_vec.push(&photo.document_id);
    }
    if alternatives.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {} FROM photos WHERE id <> ?1 AND ({}) ORDER BY id ASC",
        PHOTO_COLUMNS,
        alternatives.join(" OR ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let photos = stmt
        .query_map(params_vec.as_slice(), photo_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(photos)
}

/// Record ids for an enrichment run; `stale_only` skips checked records
pub fn list_photo_ids(conn: &Connection, stale_only: bool, limit: i64) -> Result<Vec<i64>> {
    let sql = if stale_only {
        "SELECT id FROM photos
         WHERE checked_at IS NULL OR (updated_at IS NOT NULL AND checked_at < updated_at)
         ORDER BY id ASC LIMIT ?1"
    } else {
        "SELECT id FROM photos ORDER BY id ASC LIMIT ?1"
    };

    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params![limit], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

pub fn count_photos(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
    Ok(count)
}

// ----- File -----

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        photo_id: row.get(1)?,
        root: row.get(2)?,
        path: row.get(3)?,
        size: row.get(4)?,
        mod_time: row.get(5)?,
        hash: row.get(6)?,
        checksum: row.get(7)?,
        file_type: row.get(8)?,
        media_kind: row.get(9)?,
        mime: row.get(10)?,
        is_primary: row.get(11)?,
        width: row.get(12)?,
        height: row.get(13)?,
        metadata_error: row.get(14)?,
    })
}

const FILE_COLUMNS: &str = "id, photo_id, root, path, size, mod_time, hash, checksum,
    file_type, media_kind, mime, is_primary, width, height, metadata_error";

pub fn get_file_by_path(conn: &Connection, root: &str, path: &str) -> Result<Option<FileRecord>> {
    let sql = format!("SELECT {} FROM files WHERE root = ?1 AND path = ?2", FILE_COLUMNS);
    let result = conn.query_row(&sql, params![root, path], file_from_row).optional()?;
    Ok(result)
}

pub fn list_files_for_photo(conn: &Connection, photo_id: i64) -> Result<Vec<FileRecord>> {
    let sql = format!(
        "SELECT {} FROM files WHERE photo_id = ?1 ORDER BY is_primary DESC, path ASC",
        FILE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let files = stmt
        .query_map(params![photo_id], file_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(files)
}

/// Insert or refresh a file row keyed by (root, path)
pub fn upsert_file(conn: &Connection, file: &FileRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO files (photo_id, root, path, size, mod_time, hash, checksum,
                            file_type, media_kind, mime, is_primary, width, height, metadata_error)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(root, path) DO UPDATE SET
            photo_id = excluded.photo_id,
            size = excluded.size,
            mod_time = excluded.mod_time,
            hash = excluded.hash,
            checksum = excluded.checksum,
            file_type = excluded.file_type,
            media_kind = excluded.media_kind,
            mime = excluded.mime,
            is_primary = excluded.is_primary,
            width = excluded.width,
            height = excluded.height,
            metadata_error = excluded.metadata_error,
            indexed_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
        params![
            file.photo_id,
            file.root,
            file.path,
            file.size,
            file.mod_time,
            file.hash,
            file.checksum,
            file.file_type,
            file.media_kind,
            file.mime,
            file.is_primary,
            file.width,
            file.height,
            file.metadata_error,
        ],
    )?;

    let id = conn.query_row(
        "SELECT id FROM files WHERE root = ?1 AND path = ?2",
        params![file.root, file.path],
        |row| row.get(0),
    )?;
    Ok(id)
}

// ----- Folder -----

/// Insert a folder if it is new; returns true when a row was created
pub fn insert_folder(conn: &Connection, root: &str, path: &str, mod_time: i64) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO folders (root, path, mod_time) VALUES (?1, ?2, ?3)",
        params![root, path, mod_time],
    )?;
    Ok(changed > 0)
}

pub fn get_folder(conn: &Connection, root: &str, path: &str) -> Result<Option<FolderRecord>> {
    let result = conn
        .query_row(
            "SELECT id, root, path, mod_time, photo_count FROM folders WHERE root = ?1 AND path = ?2",
            params![root, path],
            |row| {
                Ok(FolderRecord {
                    id: row.get(0)?,
                    root: row.get(1)?,
                    path: row.get(2)?,
                    mod_time: row.get(3)?,
                    photo_count: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(result)
}

/// Recount distinct photos whose primary file sits directly in each folder
pub fn update_folder_counts(conn: &Connection) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE folders SET photo_count = (
            SELECT COUNT(DISTINCT f.photo_id) FROM files f
            WHERE f.root = folders.root AND f.is_primary = 1 AND (
                (folders.path = '' AND instr(f.path, '/') = 0)
                OR (folders.path <> ''
                    AND substr(f.path, 1, length(folders.path) + 1) = folders.path || '/'
                    AND instr(substr(f.path, length(folders.path) + 2), '/') = 0)
            )
        )",
        [],
    )?;
    Ok(changed)
}
